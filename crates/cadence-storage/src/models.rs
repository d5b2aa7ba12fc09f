// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `cadence-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use cadence_core::types::{
    Campaign, CampaignStatus, DeliveryEvent, Enrollment, EnrollmentStatus, Prospect,
    ProspectStatus, QueueItem, QueueStatus, SequenceStep, StepVariant,
};
