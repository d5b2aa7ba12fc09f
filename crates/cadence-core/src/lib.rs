// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence outreach engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Cadence workspace: prospects, campaigns,
//! enrollments, queue items, and delivery events, plus the adapter seams the
//! dispatcher and reconciler are wired through.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CadenceError, SendError};
pub use types::{
    AccountRef, AdapterType, ChannelKind, EnrollmentStatus, EventType, HealthStatus, ProviderRef,
    QueueStatus, StepType,
};

// Re-export adapter traits at crate root.
pub use traits::{ChannelAdapter, PluginAdapter, StorageAdapter};
