// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cadence integration tests.

pub mod harness;
pub mod mock_channel;

pub use harness::{
    campaign_fixture, enrollment_fixture, prospect_fixture, seed_enrollment, seeded_rng,
    steps_fixture, temp_storage,
};
pub use mock_channel::{CapturedSend, MockChannel};
