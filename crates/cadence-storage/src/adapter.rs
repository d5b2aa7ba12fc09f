// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cadence_config::model::StorageConfig;
use cadence_core::types::{
    Campaign, CampaignStatus, DeliveryEvent, Enrollment, EnrollmentStatus, Prospect, QueueItem,
    SequenceStep,
};
use cadence_core::{AdapterType, CadenceError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, CadenceError> {
        self.db.get().ok_or_else(|| CadenceError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        // Shutdown delegates to close if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CadenceError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path).await?;
        self.db.set(db).map_err(|_| CadenceError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CadenceError> {
        let db = self.db()?;
        // Checkpoint WAL before close.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Prospect operations ---

    async fn insert_prospect(&self, prospect: &Prospect) -> Result<(), CadenceError> {
        queries::prospects::insert_prospect(self.db()?, prospect).await
    }

    async fn get_prospect(&self, id: &str) -> Result<Option<Prospect>, CadenceError> {
        queries::prospects::get_prospect(self.db()?, id).await
    }

    async fn get_prospect_by_key(
        &self,
        workspace_id: &str,
        identity_key: &str,
    ) -> Result<Option<Prospect>, CadenceError> {
        queries::prospects::get_prospect_by_key(self.db()?, workspace_id, identity_key).await
    }

    async fn update_prospect(&self, prospect: &Prospect) -> Result<(), CadenceError> {
        queries::prospects::update_prospect(self.db()?, prospect).await
    }

    // --- Campaign operations ---

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), CadenceError> {
        queries::campaigns::insert_campaign(self.db()?, campaign).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, CadenceError> {
        queries::campaigns::get_campaign(self.db()?, id).await
    }

    async fn update_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
    ) -> Result<(), CadenceError> {
        queries::campaigns::update_campaign_status(self.db()?, id, status).await
    }

    async fn set_campaign_next_check(
        &self,
        id: &str,
        next_check_at: Option<DateTime<Utc>>,
    ) -> Result<(), CadenceError> {
        queries::campaigns::set_next_check(self.db()?, id, next_check_at).await
    }

    async fn insert_steps(&self, steps: &[SequenceStep]) -> Result<(), CadenceError> {
        queries::campaigns::insert_steps(self.db()?, steps).await
    }

    async fn steps_for_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<SequenceStep>, CadenceError> {
        queries::campaigns::steps_for_campaign(self.db()?, campaign_id).await
    }

    async fn due_campaigns(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Campaign>, CadenceError> {
        queries::campaigns::due_campaigns(self.db()?, now, limit).await
    }

    // --- Enrollment operations ---

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), CadenceError> {
        queries::enrollments::insert_enrollment(self.db()?, enrollment).await
    }

    async fn get_enrollment(
        &self,
        campaign_id: &str,
        prospect_id: &str,
    ) -> Result<Option<Enrollment>, CadenceError> {
        queries::enrollments::get_enrollment(self.db()?, campaign_id, prospect_id).await
    }

    async fn active_enrollment_for(
        &self,
        prospect_id: &str,
    ) -> Result<Option<Enrollment>, CadenceError> {
        queries::enrollments::active_enrollment_for(self.db()?, prospect_id).await
    }

    async fn update_enrollment_status(
        &self,
        id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), CadenceError> {
        queries::enrollments::update_status(self.db()?, id, status).await
    }

    async fn set_enrollment_variant(
        &self,
        id: &str,
        variant_id: &str,
    ) -> Result<(), CadenceError> {
        queries::enrollments::set_variant(self.db()?, id, variant_id).await
    }

    // --- Queue operations ---

    async fn insert_queue_items(&self, items: &[QueueItem]) -> Result<u64, CadenceError> {
        queries::queue::insert_items(self.db()?, items).await
    }

    async fn claim_due_item(
        &self,
        campaign_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueItem>, CadenceError> {
        queries::queue::claim_due_item(self.db()?, campaign_id, now).await
    }

    async fn record_rendered(&self, id: &str, message: &str) -> Result<(), CadenceError> {
        queries::queue::record_rendered(self.db()?, id, message).await
    }

    async fn mark_sent(&self, id: &str, provider_ref: &str) -> Result<(), CadenceError> {
        queries::queue::mark_sent(self.db()?, id, provider_ref).await
    }

    async fn mark_failed(
        &self,
        id: &str,
        error_class: &str,
        error: &str,
    ) -> Result<(), CadenceError> {
        queries::queue::mark_failed(self.db()?, id, error_class, error).await
    }

    async fn release_for_retry(
        &self,
        id: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        queries::queue::release_for_retry(self.db()?, id, next_attempt_at).await
    }

    async fn acknowledge_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<bool, CadenceError> {
        queries::queue::acknowledge_by_provider_ref(self.db()?, provider_ref).await
    }

    async fn release_stale_claims(&self, cutoff: DateTime<Utc>) -> Result<u64, CadenceError> {
        queries::queue::release_stale_claims(self.db()?, cutoff).await
    }

    async fn cancel_pending_for_prospect(&self, prospect_id: &str) -> Result<u64, CadenceError> {
        queries::queue::cancel_pending_for_prospect(self.db()?, prospect_id).await
    }

    async fn get_queue_item(&self, id: &str) -> Result<Option<QueueItem>, CadenceError> {
        queries::queue::get_item(self.db()?, id).await
    }

    async fn queue_items_for_prospect(
        &self,
        campaign_id: &str,
        prospect_id: &str,
    ) -> Result<Vec<QueueItem>, CadenceError> {
        queries::queue::items_for_prospect(self.db()?, campaign_id, prospect_id).await
    }

    async fn prospect_for_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<String>, CadenceError> {
        queries::queue::prospect_for_provider_ref(self.db()?, provider_ref).await
    }

    // --- Delivery event operations ---

    async fn record_event(&self, event: &DeliveryEvent) -> Result<bool, CadenceError> {
        queries::events::record_event(self.db()?, event).await
    }

    // --- Send counter operations ---

    async fn sent_today(&self, account_ref: &str, day: NaiveDate) -> Result<u32, CadenceError> {
        queries::counters::sent_today(self.db()?, account_ref, day).await
    }

    async fn increment_sent(&self, account_ref: &str, day: NaiveDate) -> Result<(), CadenceError> {
        queries::counters::increment_sent(self.db()?, account_ref, day).await
    }
}
