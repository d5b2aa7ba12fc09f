// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence templates and schedule computation for the Cadence outreach engine.
//!
//! Day offsets count weekdays only; send times land inside each campaign's
//! working window in its configured timezone. A/B variants are assigned once
//! per enrollment via a cumulative-sum draw over traffic allocations.

pub mod schedule;
pub mod scheduler;
pub mod template;
pub mod variant;

pub use schedule::{add_weekdays, place_in_window, plan_schedule, PlannedSend, SchedulePlan};
pub use scheduler::SequenceScheduler;
pub use template::validate_steps;
pub use variant::{assign_variant, select_variant};
