// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatcher for the Cadence outreach engine.
//!
//! Claims due queue items up to each account's daily cap, applies
//! randomized inter-send pacing, renders templates, and pushes messages
//! through the channel registry. `tick(now)` is a pure function of clock
//! and store state, triggered externally.

pub mod dispatcher;
pub mod pacing;
pub mod render;

pub use dispatcher::{Dispatcher, TickSummary};
pub use pacing::PacingPolicy;
pub use render::{prospect_vars, render, render_step};
