// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Cadence outreach engine.
//!
//! Exposes the idempotent tick trigger, the replay-safe event webhook, and a
//! liveness endpoint, with optional bearer-token auth on the API routes.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
