// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity family.

pub mod campaigns;
pub mod counters;
pub mod enrollments;
pub mod events;
pub mod prospects;
pub mod queue;
