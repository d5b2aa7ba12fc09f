// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event reconciliation for the Cadence outreach engine.
//!
//! Ingests asynchronous provider signals (acceptance, reply, bounce) and
//! folds them back into enrollment and queue state, idempotently by event id.

pub mod reconciler;

pub use reconciler::{EventReconciler, ReconcileOutcome};
