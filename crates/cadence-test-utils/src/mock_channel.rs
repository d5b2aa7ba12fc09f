// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with captured outbound sends
//! for assertion and a scriptable failure queue for exercising the
//! dispatcher's retry and failure paths.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::types::{
    AccountRef, AdapterType, ChannelKind, DeliveryTarget, HealthStatus, ProviderRef,
    RenderedMessage,
};
use cadence_core::{CadenceError, ChannelAdapter, PluginAdapter, SendError};

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct CapturedSend {
    pub account: AccountRef,
    pub target: DeliveryTarget,
    pub message: RenderedMessage,
}

/// A mock delivery channel for testing.
///
/// Every `send()` first consumes the next scripted failure, if any;
/// otherwise it succeeds and the send is captured for later assertion.
pub struct MockChannel {
    kind: ChannelKind,
    sent: Arc<Mutex<Vec<CapturedSend>>>,
    failures: Arc<Mutex<VecDeque<SendError>>>,
}

impl MockChannel {
    /// Create a mock channel serving the given kind.
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            sent: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Script the next send to fail with `error`. Failures are consumed in
    /// FIFO order before any send succeeds.
    pub async fn push_failure(&self, error: SendError) {
        self.failures.lock().await.push_back(error);
    }

    /// All sends that went through successfully.
    pub async fn sent(&self) -> Vec<CapturedSend> {
        self.sent.lock().await.clone()
    }

    /// Count of successful sends.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear captured sends.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(
        &self,
        account: &AccountRef,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<ProviderRef, SendError> {
        if let Some(failure) = self.failures.lock().await.pop_front() {
            return Err(failure);
        }
        let id = format!("mock-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(CapturedSend {
            account: account.clone(),
            target: target.clone(),
            message: message.clone(),
        });
        Ok(ProviderRef(id))
    }
}
