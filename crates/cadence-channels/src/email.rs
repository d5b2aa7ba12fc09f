// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email channel adapter over async SMTP.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use cadence_config::model::SmtpConfig;
use cadence_core::types::{
    AccountRef, AdapterType, ChannelKind, DeliveryTarget, HealthStatus, ProviderRef,
    RenderedMessage,
};
use cadence_core::{CadenceError, ChannelAdapter, PluginAdapter, SendError};

/// SMTP-backed email channel.
#[derive(Debug)]
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailChannel {
    /// Build the channel from SMTP configuration.
    ///
    /// Fails when the config is incomplete (no relay host or from address)
    /// or the relay name cannot be resolved into a transport.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, CadenceError> {
        let host = config.host.as_deref().ok_or_else(|| {
            CadenceError::Config("smtp.host is required for the email channel".to_string())
        })?;
        let from_address = config.from_address.clone().ok_or_else(|| {
            CadenceError::Config("smtp.from_address is required for the email channel".to_string())
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| CadenceError::Channel {
                message: format!("cannot build SMTP transport for {host}: {e}"),
                source: Some(Box::new(e)),
            })?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from_address,
        })
    }
}

#[async_trait]
impl PluginAdapter for EmailChannel {
    fn name(&self) -> &str {
        "smtp-email"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy("SMTP NOOP failed".to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        account: &AccountRef,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<ProviderRef, SendError> {
        let DeliveryTarget::Email(to_address) = target else {
            return Err(SendError::Permanent {
                reason: "email channel requires an email target".to_string(),
            });
        };

        let from: Mailbox = self.from_address.parse().map_err(|e| SendError::Permanent {
            reason: format!("invalid from address `{}`: {e}", self.from_address),
        })?;
        let to: Mailbox = to_address.parse().map_err(|e| SendError::Permanent {
            reason: format!("invalid recipient `{to_address}`: {e}"),
        })?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_deref().unwrap_or_default())
            .body(message.body.clone())
            .map_err(|e| SendError::Permanent {
                reason: format!("cannot build message: {e}"),
            })?;

        match self.transport.send(email).await {
            Ok(response) => {
                let provider_ref = response
                    .message()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("smtp:{to_address}"));
                debug!(account = %account.0, to = %to_address, "email accepted by relay");
                Ok(ProviderRef(provider_ref))
            }
            Err(e) if e.is_permanent() => Err(SendError::Permanent {
                reason: e.to_string(),
            }),
            Err(e) => Err(SendError::Transient {
                reason: e.to_string(),
            }),
        }
    }
}
