// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadence outreach engine.

use thiserror::Error;

/// The primary error type used across all Cadence adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two distinct raw contacts normalized to the same identity key with
    /// materially different required fields. Surfaced to the caller, never
    /// auto-resolved.
    #[error("identity conflict on `{identity_key}`: {field} is `{existing}` but import carries `{incoming}`")]
    IdentityConflict {
        identity_key: String,
        field: String,
        existing: String,
        incoming: String,
    },

    /// A prospect already has an active enrollment in another campaign.
    #[error("prospect {prospect_id} already has an active enrollment (campaign {campaign_id})")]
    EnrollmentConflict {
        prospect_id: String,
        campaign_id: String,
    },

    /// A message template referenced a placeholder with no value. Fatal for
    /// the item -- a literal placeholder token is never shipped.
    #[error("unresolved template placeholder `{{{placeholder}}}`")]
    TemplateRender { placeholder: String },

    /// Channel adapter errors (connection failure, provider rejection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Schedule computation failed (bad timezone, empty working window).
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Requested adapter was not found in the registry.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller-supplied data that cannot be processed (e.g. an import row
    /// with no usable identifier).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Typed failure returned by channel adapters.
///
/// The dispatcher maps `Transient` into retry-with-backoff up to the attempt
/// cap and `Permanent` into an immediate `failed` state.
#[derive(Debug, Error)]
pub enum SendError {
    /// Provider timeout, rate limiting, or 5xx -- worth retrying.
    #[error("transient channel failure: {reason}")]
    Transient { reason: String },

    /// Invalid target, revoked account, or other provider rejection that a
    /// retry cannot fix.
    #[error("permanent channel failure: {reason}")]
    Permanent { reason: String },
}

impl SendError {
    /// Whether the dispatcher should put the item back on the schedule.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::Transient { .. })
    }

    /// Short machine-readable class name recorded on failed queue items.
    pub fn class(&self) -> &'static str {
        match self {
            SendError::Transient { .. } => "transient",
            SendError::Permanent { .. } => "permanent",
        }
    }
}
