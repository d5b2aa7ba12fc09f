// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Professional-network channel adapter over the provider's HTTP API.
//!
//! Initial-contact steps go out as connection invitations; later steps as
//! direct messages to an accepted connection. The provider is untrusted I/O:
//! bounded timeout, typed failure classification, no retries here (the
//! dispatcher owns retry policy).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use cadence_config::model::NetworkConfig;
use cadence_core::types::{
    AccountRef, AdapterType, ChannelKind, DeliveryTarget, HealthStatus, ProviderRef,
    RenderedMessage, StepType,
};
use cadence_core::{CadenceError, ChannelAdapter, PluginAdapter, SendError};

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// HTTP-API-backed professional-network channel.
#[derive(Debug)]
pub struct NetworkChannel {
    client: reqwest::Client,
    api_base: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl NetworkChannel {
    /// Build the channel from provider configuration.
    pub fn from_config(config: &NetworkConfig) -> Result<Self, CadenceError> {
        let api_base = config.api_base.clone().ok_or_else(|| {
            CadenceError::Config("network.api_base is required for the network channel".to_string())
        })?;
        let api_token = config.api_token.clone().ok_or_else(|| {
            CadenceError::Config(
                "network.api_token is required for the network channel".to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CadenceError::Channel {
                message: format!("cannot build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn endpoint_for(&self, step_type: StepType) -> String {
        match step_type {
            StepType::InitialContact => format!("{}/v1/invitations", self.api_base),
            StepType::FollowUp | StepType::Final => format!("{}/v1/messages", self.api_base),
        }
    }
}

#[async_trait]
impl PluginAdapter for NetworkChannel {
    fn name(&self) -> &str {
        "network-api"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        let url = format!("{}/v1/health", self.api_base);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "provider health endpoint returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for NetworkChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Network
    }

    async fn send(
        &self,
        account: &AccountRef,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<ProviderRef, SendError> {
        let DeliveryTarget::Profile(profile) = target else {
            return Err(SendError::Permanent {
                reason: "network channel requires a profile target".to_string(),
            });
        };

        let url = self.endpoint_for(message.step_type);
        let result = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "account": account.0,
                "profile": profile,
                "message": message.body,
            }))
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            // Timeouts and connection resets are worth retrying; the claim
            // already happened, so an at-least-once send is possible here
            // and accepted.
            Err(e) => {
                return Err(SendError::Transient {
                    reason: e.to_string(),
                })
            }
        };

        let status = resp.status();
        if status.is_success() {
            let body: SendResponse = resp.json().await.map_err(|e| SendError::Transient {
                reason: format!("unreadable provider response: {e}"),
            })?;
            debug!(account = %account.0, profile = %profile, provider_ref = %body.id, "network send accepted");
            return Ok(ProviderRef(body.id));
        }

        let reason = format!("provider returned {status} for {url}");
        if status.as_u16() == 429 || status.is_server_error() {
            Err(SendError::Transient { reason })
        } else {
            Err(SendError::Permanent { reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> NetworkConfig {
        NetworkConfig {
            api_base: Some(server.uri()),
            api_token: Some("token-1".to_string()),
        }
    }

    fn rendered(step_type: StepType) -> RenderedMessage {
        RenderedMessage {
            subject: None,
            body: "Hi Jane, great to connect".to_string(),
            step_type,
        }
    }

    #[tokio::test]
    async fn initial_contact_posts_an_invitation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/invitations"))
            .and(bearer_token("token-1"))
            .and(body_partial_json(serde_json::json!({
                "profile": "in/jane-doe"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "inv-42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NetworkChannel::from_config(&config_for(&server)).unwrap();
        let provider_ref = channel
            .send(
                &AccountRef("acct-1".to_string()),
                &DeliveryTarget::Profile("in/jane-doe".to_string()),
                &rendered(StepType::InitialContact),
            )
            .await
            .unwrap();
        assert_eq!(provider_ref, ProviderRef("inv-42".to_string()));
    }

    #[tokio::test]
    async fn follow_up_posts_a_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NetworkChannel::from_config(&config_for(&server)).unwrap();
        let provider_ref = channel
            .send(
                &AccountRef("acct-1".to_string()),
                &DeliveryTarget::Profile("in/jane-doe".to_string()),
                &rendered(StepType::FollowUp),
            )
            .await
            .unwrap();
        assert_eq!(provider_ref, ProviderRef("msg-7".to_string()));
    }

    #[tokio::test]
    async fn rate_limit_classifies_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let channel = NetworkChannel::from_config(&config_for(&server)).unwrap();
        let err = channel
            .send(
                &AccountRef("acct-1".to_string()),
                &DeliveryTarget::Profile("in/jane-doe".to_string()),
                &rendered(StepType::FollowUp),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Transient { .. }));
    }

    #[tokio::test]
    async fn invalid_target_classifies_as_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/invitations"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let channel = NetworkChannel::from_config(&config_for(&server)).unwrap();
        let err = channel
            .send(
                &AccountRef("acct-1".to_string()),
                &DeliveryTarget::Profile("in/gone".to_string()),
                &rendered(StepType::InitialContact),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Permanent { .. }));
    }

    #[tokio::test]
    async fn email_target_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        let channel = NetworkChannel::from_config(&config_for(&server)).unwrap();
        let err = channel
            .send(
                &AccountRef("acct-1".to_string()),
                &DeliveryTarget::Email("jane@example.com".to_string()),
                &rendered(StepType::FollowUp),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Permanent { .. }));
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let err = NetworkChannel::from_config(&NetworkConfig {
            api_base: Some("https://api.example.com".to_string()),
            api_token: None,
        })
        .unwrap_err();
        assert!(matches!(err, CadenceError::Config(_)));
    }
}
