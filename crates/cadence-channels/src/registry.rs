// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter registry keyed by channel kind.

use std::collections::HashMap;
use std::sync::Arc;

use cadence_core::{CadenceError, ChannelAdapter, ChannelKind};

/// Registry mapping each [`ChannelKind`] to its adapter.
///
/// Built once at startup from configuration; lookups on the dispatch path
/// are cheap map reads.
#[derive(Default)]
pub struct ChannelRegistry {
    adapters: HashMap<ChannelKind, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind. Re-registering a kind
    /// replaces the previous adapter.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Look up the adapter for a channel kind.
    pub fn get(&self, kind: ChannelKind) -> Result<Arc<dyn ChannelAdapter>, CadenceError> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| CadenceError::AdapterNotFound {
                adapter_type: "Channel".to_string(),
                name: kind.to_string(),
            })
    }

    /// Kinds with a registered adapter.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.adapters.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_core::types::{
        AccountRef, AdapterType, DeliveryTarget, HealthStatus, ProviderRef, RenderedMessage,
    };
    use cadence_core::{PluginAdapter, SendError};

    struct StubChannel(ChannelKind);

    #[async_trait]
    impl PluginAdapter for StubChannel {
        fn name(&self) -> &str {
            "stub"
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
    impl ChannelAdapter for StubChannel {
        fn kind(&self) -> ChannelKind {
            self.0
        }
        async fn send(
            &self,
            _account: &AccountRef,
            _target: &DeliveryTarget,
            _message: &RenderedMessage,
        ) -> Result<ProviderRef, SendError> {
            Ok(ProviderRef("stub-ref".to_string()))
        }
    }

    #[test]
    fn lookup_by_kind_finds_registered_adapter() {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(StubChannel(ChannelKind::Email)));

        assert!(registry.get(ChannelKind::Email).is_ok());
        let missing = registry.get(ChannelKind::Network).err().unwrap();
        assert!(matches!(missing, CadenceError::AdapterNotFound { .. }));
    }

    #[test]
    fn re_registering_replaces() {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(StubChannel(ChannelKind::Email)));
        registry.register(Arc::new(StubChannel(ChannelKind::Email)));
        assert_eq!(registry.kinds().len(), 1);
    }
}
