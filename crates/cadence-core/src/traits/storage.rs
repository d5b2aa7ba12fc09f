// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Campaign, CampaignStatus, DeliveryEvent, Enrollment, EnrollmentStatus, Prospect, QueueItem,
    SequenceStep,
};

/// Adapter for storage and persistence backends.
///
/// Storage adapters own the durable state of the engine: prospects,
/// campaigns, enrollments, the send queue, delivery events, and per-account
/// send counters. The queue's `scheduled → claimed` transition is the
/// system's sole mutual-exclusion primitive and must be implemented as an
/// atomic conditional write.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection pool, etc.).
    async fn initialize(&self) -> Result<(), CadenceError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), CadenceError>;

    // --- Prospect operations ---

    async fn insert_prospect(&self, prospect: &Prospect) -> Result<(), CadenceError>;

    async fn get_prospect(&self, id: &str) -> Result<Option<Prospect>, CadenceError>;

    /// Look up a prospect by its normalized identity key within a workspace.
    async fn get_prospect_by_key(
        &self,
        workspace_id: &str,
        identity_key: &str,
    ) -> Result<Option<Prospect>, CadenceError>;

    /// Persist merged display fields. The identity key is immutable and is
    /// never touched by this call.
    async fn update_prospect(&self, prospect: &Prospect) -> Result<(), CadenceError>;

    // --- Campaign operations ---

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), CadenceError>;

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, CadenceError>;

    async fn update_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), CadenceError>;

    /// Set or clear the deferral marker consulted by the dispatcher.
    async fn set_campaign_next_check(
        &self,
        id: &str,
        next_check_at: Option<DateTime<Utc>>,
    ) -> Result<(), CadenceError>;

    /// Persist a campaign's ordered sequence steps (with variants).
    async fn insert_steps(&self, steps: &[SequenceStep]) -> Result<(), CadenceError>;

    /// Load a campaign's steps ordered by step number, variants included.
    async fn steps_for_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<SequenceStep>, CadenceError>;

    /// Active campaigns with at least one `scheduled` item due at `now`,
    /// excluding campaigns deferred past `now`, oldest due work first.
    async fn due_campaigns(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Campaign>, CadenceError>;

    // --- Enrollment operations ---

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), CadenceError>;

    async fn get_enrollment(
        &self,
        campaign_id: &str,
        prospect_id: &str,
    ) -> Result<Option<Enrollment>, CadenceError>;

    /// The prospect's active enrollment, if any. At most one exists.
    async fn active_enrollment_for(
        &self,
        prospect_id: &str,
    ) -> Result<Option<Enrollment>, CadenceError>;

    async fn update_enrollment_status(
        &self,
        id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), CadenceError>;

    /// Record the variant assigned at schedule time. Set once, reused after.
    async fn set_enrollment_variant(
        &self,
        id: &str,
        variant_id: &str,
    ) -> Result<(), CadenceError>;

    // --- Queue operations ---

    /// Bulk-insert queue items. An item whose (campaign, prospect, step) slot
    /// is already occupied is skipped, keeping at most one live item per slot.
    async fn insert_queue_items(&self, items: &[QueueItem]) -> Result<u64, CadenceError>;

    /// Atomically claim the oldest due `scheduled` item for a campaign.
    ///
    /// The `scheduled → claimed` flip succeeds only while the row is still
    /// `scheduled` and `scheduled_for <= now`; concurrent claimants observe
    /// `None`. This is the system's only concurrency-safety mechanism.
    async fn claim_due_item(
        &self,
        campaign_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueItem>, CadenceError>;

    /// Persist the rendered message on a claimed item for audit.
    async fn record_rendered(&self, id: &str, message: &str) -> Result<(), CadenceError>;

    /// `claimed → sent`, recording the provider reference.
    async fn mark_sent(&self, id: &str, provider_ref: &str) -> Result<(), CadenceError>;

    /// `claimed → failed`, recording the error class and message.
    async fn mark_failed(
        &self,
        id: &str,
        error_class: &str,
        error: &str,
    ) -> Result<(), CadenceError>;

    /// `claimed → scheduled` with a bumped attempt count and a new due time.
    /// The one sanctioned backward transition (transient-failure retry).
    async fn release_for_retry(
        &self,
        id: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), CadenceError>;

    /// `sent → acknowledged` for the item matching a provider reference.
    /// Returns false when no sent item matches.
    async fn acknowledge_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<bool, CadenceError>;

    /// Release items stuck in `claimed` past a cutoff back to `scheduled`
    /// (dispatcher died mid-send). Returns the number released.
    async fn release_stale_claims(&self, cutoff: DateTime<Utc>) -> Result<u64, CadenceError>;

    /// Cancel every `scheduled` or `claimed` item for a prospect. Returns the
    /// number of items cancelled. Items already `sent` are untouched.
    async fn cancel_pending_for_prospect(&self, prospect_id: &str) -> Result<u64, CadenceError>;

    async fn get_queue_item(&self, id: &str) -> Result<Option<QueueItem>, CadenceError>;

    /// All items for one prospect in one campaign, ordered by step number.
    async fn queue_items_for_prospect(
        &self,
        campaign_id: &str,
        prospect_id: &str,
    ) -> Result<Vec<QueueItem>, CadenceError>;

    /// Resolve the prospect owning a sent item by provider reference.
    async fn prospect_for_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<String>, CadenceError>;

    // --- Delivery event operations ---

    /// Append a delivery event. Returns false when the event id was already
    /// recorded (duplicate delivery; processing must short-circuit).
    async fn record_event(&self, event: &DeliveryEvent) -> Result<bool, CadenceError>;

    // --- Send counter operations ---

    /// Sends recorded for an account on a given (UTC) date.
    async fn sent_today(&self, account_ref: &str, day: NaiveDate) -> Result<u32, CadenceError>;

    /// Increment the per-(account, date) counter. Rollover is the date key
    /// changing, never process restart.
    async fn increment_sent(&self, account_ref: &str, day: NaiveDate) -> Result<(), CadenceError>;
}
