// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrollment scheduling against the store.
//!
//! Bridges the pure planner in [`crate::schedule`] to durable state: loads
//! the campaign and template, plans the sends, persists the queue items, and
//! records the variant assignment. Called once at enrollment and again by
//! the reconciler when a gated campaign's contact accepts.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tracing::info;

use cadence_core::types::{EnrollmentStatus, QueueItem, QueueStatus};
use cadence_core::{CadenceError, StorageAdapter};

use crate::schedule::plan_schedule;
use crate::template::validate_steps;

/// Computes and persists send schedules for enrollments.
pub struct SequenceScheduler {
    storage: Arc<dyn StorageAdapter>,
}

impl SequenceScheduler {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Plan and persist the sends for one enrollment from `anchor`.
    ///
    /// `from_step` is 0 at enrollment; acceptance-driven re-planning passes
    /// the first gated step. Queue slots already occupied are skipped by the
    /// store, so replays are idempotent. Returns the number of queue items
    /// actually created.
    pub async fn schedule_enrollment<R: Rng + Send>(
        &self,
        campaign_id: &str,
        prospect_id: &str,
        anchor: NaiveDate,
        from_step: u32,
        rng: &mut R,
    ) -> Result<u64, CadenceError> {
        let campaign = self
            .storage
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound {
                entity: "campaign",
                id: campaign_id.to_string(),
            })?;
        let enrollment = self
            .storage
            .get_enrollment(campaign_id, prospect_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound {
                entity: "enrollment",
                id: format!("{campaign_id}/{prospect_id}"),
            })?;
        let steps = self.storage.steps_for_campaign(campaign_id).await?;
        validate_steps(&steps)?;

        let plan = plan_schedule(
            &campaign,
            &steps,
            anchor,
            from_step,
            enrollment.variant_id.is_some(),
            rng,
        )?;

        let variant_id = match plan.variant_id {
            Some(chosen) => {
                self.storage
                    .set_enrollment_variant(&enrollment.id, &chosen)
                    .await?;
                Some(chosen)
            }
            None => enrollment.variant_id.clone(),
        };

        let items: Vec<QueueItem> = plan
            .sends
            .iter()
            .map(|send| QueueItem {
                id: uuid::Uuid::new_v4().to_string(),
                campaign_id: campaign_id.to_string(),
                prospect_id: prospect_id.to_string(),
                step_number: send.step_number,
                scheduled_for: send.scheduled_for,
                status: QueueStatus::Scheduled,
                message: None,
                variant_id: variant_id.clone(),
                provider_ref: None,
                error_class: None,
                error: None,
                attempt_count: 0,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .collect();

        let inserted = self.storage.insert_queue_items(&items).await?;

        if enrollment.status == EnrollmentStatus::Pending {
            self.storage
                .update_enrollment_status(&enrollment.id, EnrollmentStatus::Queued)
                .await?;
        }

        info!(
            campaign_id,
            prospect_id,
            from_step,
            planned = items.len(),
            inserted,
            "enrollment scheduled"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_config::model::StorageConfig;
    use cadence_core::types::{
        Campaign, CampaignStatus, ChannelKind, Enrollment, Prospect, ProspectStatus, SequenceStep,
        StepType, StepVariant,
    };
    use cadence_storage::SqliteStorage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    async fn setup() -> (SequenceScheduler, Arc<SqliteStorage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("sched.db");
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        let scheduler = SequenceScheduler::new(storage.clone());
        (scheduler, storage, dir)
    }

    async fn seed(storage: &SqliteStorage, gate: bool, with_variants: bool) {
        storage
            .insert_campaign(&Campaign {
                id: "c-1".to_string(),
                workspace_id: "ws-1".to_string(),
                name: "Q1".to_string(),
                channel: ChannelKind::Email,
                account_ref: "acct-1".to_string(),
                timezone: "America/Los_Angeles".to_string(),
                work_start_min: 540,
                work_end_min: 1020,
                daily_cap: 20,
                jitter_min_secs: 0,
                jitter_max_secs: 0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                gate_follow_ups: gate,
                status: CampaignStatus::Active,
                next_check_at: None,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();
        storage
            .insert_prospect(&Prospect {
                id: "p-1".to_string(),
                workspace_id: "ws-1".to_string(),
                identity_key: "in/jane-doe".to_string(),
                display_name: Some("Jane Doe".to_string()),
                email: Some("jane@example.com".to_string()),
                profile_url: Some("in/jane-doe".to_string()),
                title: None,
                company: None,
                status: ProspectStatus::Pending,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();
        storage
            .insert_enrollment(&Enrollment {
                id: "e-1".to_string(),
                campaign_id: "c-1".to_string(),
                prospect_id: "p-1".to_string(),
                status: EnrollmentStatus::Pending,
                variant_id: None,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();

        let variants = if with_variants {
            vec![
                StepVariant {
                    id: "a".to_string(),
                    template: "Hi {first_name}, option A".to_string(),
                    traffic_allocation: 0.7,
                },
                StepVariant {
                    id: "b".to_string(),
                    template: "Hi {first_name}, option B".to_string(),
                    traffic_allocation: 0.3,
                },
            ]
        } else {
            vec![]
        };
        storage
            .insert_steps(&[
                SequenceStep {
                    campaign_id: "c-1".to_string(),
                    step_number: 0,
                    day_offset: 0,
                    step_type: StepType::InitialContact,
                    message_template: "Hi {first_name}".to_string(),
                    subject_template: Some("Hello".to_string()),
                    variants,
                },
                SequenceStep {
                    campaign_id: "c-1".to_string(),
                    step_number: 1,
                    day_offset: 2,
                    step_type: StepType::FollowUp,
                    message_template: "Bumping this, {first_name}".to_string(),
                    subject_template: None,
                    variants: vec![],
                },
                SequenceStep {
                    campaign_id: "c-1".to_string(),
                    step_number: 2,
                    day_offset: 5,
                    step_type: StepType::Final,
                    message_template: "Last try, {first_name}".to_string(),
                    subject_template: None,
                    variants: vec![],
                },
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enrollment_creates_one_item_per_step() {
        let (scheduler, storage, _dir) = setup().await;
        seed(&storage, false, false).await;
        let mut rng = StdRng::seed_from_u64(1);

        let inserted = scheduler
            .schedule_enrollment(
                "c-1",
                "p-1",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                0,
                &mut rng,
            )
            .await
            .unwrap();
        assert_eq!(inserted, 3);

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.status == QueueStatus::Scheduled));

        // Enrollment advanced to queued.
        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Queued);
    }

    #[tokio::test]
    async fn rescheduling_is_idempotent() {
        let (scheduler, storage, _dir) = setup().await;
        seed(&storage, false, false).await;
        let mut rng = StdRng::seed_from_u64(1);
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        scheduler
            .schedule_enrollment("c-1", "p-1", anchor, 0, &mut rng)
            .await
            .unwrap();
        let second = scheduler
            .schedule_enrollment("c-1", "p-1", anchor, 0, &mut rng)
            .await
            .unwrap();
        assert_eq!(second, 0, "occupied slots must not be re-inserted");

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn gated_campaign_schedules_initial_step_only() {
        let (scheduler, storage, _dir) = setup().await;
        seed(&storage, true, false).await;
        let mut rng = StdRng::seed_from_u64(1);

        let inserted = scheduler
            .schedule_enrollment(
                "c-1",
                "p-1",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                0,
                &mut rng,
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        // Acceptance unlocks the rest, re-anchored.
        let unlocked = scheduler
            .schedule_enrollment(
                "c-1",
                "p-1",
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                1,
                &mut rng,
            )
            .await
            .unwrap();
        assert_eq!(unlocked, 2);

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn variant_assignment_lands_on_enrollment_and_items() {
        let (scheduler, storage, _dir) = setup().await;
        seed(&storage, false, true).await;
        let mut rng = StdRng::seed_from_u64(4);

        scheduler
            .schedule_enrollment(
                "c-1",
                "p-1",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                0,
                &mut rng,
            )
            .await
            .unwrap();

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        let assigned = enrollment.variant_id.expect("variant must be assigned");
        assert!(assigned == "a" || assigned == "b");

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert!(items
            .iter()
            .all(|i| i.variant_id.as_deref() == Some(assigned.as_str())));
    }

    #[tokio::test]
    async fn missing_campaign_is_not_found() {
        let (scheduler, _storage, _dir) = setup().await;
        let mut rng = StdRng::seed_from_u64(1);
        let err = scheduler
            .schedule_enrollment(
                "ghost",
                "p-1",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                0,
                &mut rng,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::NotFound { .. }));
    }
}
