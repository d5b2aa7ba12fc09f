// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter implementations for the Cadence outreach engine.
//!
//! One adapter per [`ChannelKind`], plus the registry the dispatcher selects
//! from. The dispatcher never branches on channel names; it looks the
//! adapter up by the campaign's configured kind.

pub mod email;
pub mod network;
pub mod registry;

pub use email::EmailChannel;
pub use network::NetworkChannel;
pub use registry::ChannelRegistry;
