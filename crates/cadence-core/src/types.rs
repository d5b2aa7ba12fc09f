// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types used across adapter traits and the Cadence workspace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Reference to an external sending account (SMTP identity, network profile).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef(pub String);

/// Reference returned by a channel provider for a dispatched send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Channel,
    Storage,
}

/// Delivery channel for a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Email outreach via SMTP.
    Email,
    /// Professional-network connection requests and messages.
    Network,
}

/// Prospect lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProspectStatus {
    #[default]
    Pending,
    Approved,
    Archived,
}

/// Campaign lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

/// Enrollment status of a prospect within one campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Queued,
    Contacted,
    Connected,
    Replied,
    Completed,
    Failed,
}

impl EnrollmentStatus {
    /// An active enrollment blocks admission into any other campaign.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EnrollmentStatus::Pending
                | EnrollmentStatus::Queued
                | EnrollmentStatus::Contacted
                | EnrollmentStatus::Connected
        )
    }

    /// Terminal enrollments receive no further automated sends.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnrollmentStatus::Replied | EnrollmentStatus::Completed | EnrollmentStatus::Failed
        )
    }
}

/// Queue item lifecycle state.
///
/// `scheduled → claimed → sent → acknowledged`, with `failed` reachable from
/// `claimed` and `cancelled` reachable from `scheduled` or `claimed` only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[default]
    Scheduled,
    Claimed,
    Sent,
    Acknowledged,
    Failed,
    Cancelled,
}

impl QueueStatus {
    /// Terminal states are immutable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Acknowledged | QueueStatus::Failed | QueueStatus::Cancelled
        )
    }
}

/// Kind of a sequence step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    InitialContact,
    FollowUp,
    Final,
}

/// Inbound delivery event type from a channel provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Accepted,
    Replied,
    Bounced,
    MessageReceived,
}

// --- Entity records ---

/// A deduplicated contact record, workspace-scoped.
///
/// `identity_key` is immutable once assigned; re-imports merge non-empty
/// fields without overwriting populated ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    pub workspace_id: String,
    pub identity_key: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub status: ProspectStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// One outreach sequence definition plus its delivery constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub channel: ChannelKind,
    /// Sending account this campaign dispatches through.
    pub account_ref: String,
    /// IANA timezone name the working window is evaluated in.
    pub timezone: String,
    /// Working window start, minutes from local midnight.
    pub work_start_min: u32,
    /// Working window end, minutes from local midnight (exclusive).
    pub work_end_min: u32,
    /// Hard daily send cap for the campaign's account.
    pub daily_cap: u32,
    /// Inclusive bounds of the randomized inter-send delay.
    pub jitter_min_secs: u32,
    pub jitter_max_secs: u32,
    /// Campaign start date (local to `timezone`).
    pub start_date: NaiveDate,
    /// When set, follow-up steps unlock only on an `accepted` event.
    pub gate_follow_ups: bool,
    pub status: CampaignStatus,
    /// Deferral marker: the dispatcher skips this campaign until the
    /// instant passes. Set when a working-hour check fails.
    pub next_check_at: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

/// One step in a campaign's sequence template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    pub campaign_id: String,
    /// 0-based position in the sequence.
    pub step_number: u32,
    /// Weekday-counted offset from campaign start (not calendar days).
    pub day_offset: u32,
    pub step_type: StepType,
    /// Message body template with `{placeholder}` substitutions.
    pub message_template: String,
    /// Subject template (email channel only).
    pub subject_template: Option<String>,
    /// Weighted A/B variants; empty means the base template always sends.
    pub variants: Vec<StepVariant>,
}

/// One weighted message alternative within a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepVariant {
    pub id: String,
    pub template: String,
    /// Fraction of traffic in [0, 1]; allocations across a step sum to 1.
    pub traffic_allocation: f64,
}

/// A prospect's participation state within one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub campaign_id: String,
    pub prospect_id: String,
    pub status: EnrollmentStatus,
    /// Variant assigned once at schedule time, reused by every step that
    /// declares variants.
    pub variant_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A concrete, time-stamped instance of a step for one prospect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub campaign_id: String,
    pub prospect_id: String,
    pub step_number: u32,
    pub scheduled_for: DateTime<Utc>,
    pub status: QueueStatus,
    /// Rendered message text, persisted at claim time. `None` until claimed.
    pub message: Option<String>,
    pub variant_id: Option<String>,
    pub provider_ref: Option<String>,
    pub error_class: Option<String>,
    pub error: Option<String>,
    pub attempt_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// An immutable inbound signal from a channel provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    /// Provider-supplied idempotency key. Processing the same id twice is a no-op.
    pub event_id: String,
    pub event_type: EventType,
    pub account_ref: String,
    pub provider_ref: Option<String>,
    pub prospect_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

// --- Channel call types ---

/// Where a send is delivered, per channel kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryTarget {
    /// Recipient email address.
    Email(String),
    /// Recipient profile slug on the professional network.
    Profile(String),
}

/// A fully rendered message ready for a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedMessage {
    /// Subject line (email channel only).
    pub subject: Option<String>,
    pub body: String,
    pub step_type: StepType,
}
