// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for outbound delivery integrations (email, network).

use async_trait::async_trait;

use crate::error::SendError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AccountRef, ChannelKind, DeliveryTarget, ProviderRef, RenderedMessage};

/// Adapter for one outbound delivery channel.
///
/// Implementations are swappable per [`ChannelKind`]; the dispatcher selects
/// the adapter from the registry by the campaign's configured channel and
/// stays channel-agnostic.
///
/// Adapters make no idempotency promise. Exactly-once dispatch is the
/// caller's responsibility via the queue's atomic claim; an adapter invoked
/// twice for the same item may deliver twice.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// The channel kind this adapter serves.
    fn kind(&self) -> ChannelKind;

    /// Deliver one rendered message from `account` to `target`.
    ///
    /// Returns the provider's reference for the send, or a typed failure the
    /// dispatcher classifies into retry vs. permanent failure.
    async fn send(
        &self,
        account: &AccountRef,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<ProviderRef, SendError>;
}
