// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event reconciler: folds asynchronous provider signals back into
//! enrollment and queue state.
//!
//! Idempotent under duplicate delivery: the event id is recorded before any
//! mutation and a repeat short-circuits. Runs concurrently with the
//! dispatcher; a cancellation that loses the race against an in-flight
//! claim is tolerated (the dispatcher yields the item as cancelled on its
//! side).

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rand::Rng;
use tracing::{debug, info, warn};

use cadence_core::types::{Campaign, DeliveryEvent, EnrollmentStatus, EventType};
use cadence_core::{CadenceError, StorageAdapter};
use cadence_sequence::SequenceScheduler;

/// What processing one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// State was mutated.
    Applied,
    /// The event id was seen before; nothing changed.
    Duplicate,
    /// The event matched no known prospect; recorded for audit only.
    Unmatched,
}

/// Reconciles inbound delivery events against engine state.
pub struct EventReconciler {
    storage: Arc<dyn StorageAdapter>,
    scheduler: SequenceScheduler,
}

impl EventReconciler {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        let scheduler = SequenceScheduler::new(storage.clone());
        Self { storage, scheduler }
    }

    /// Process one delivery event.
    ///
    /// The random source only matters for `accepted` events on gated
    /// campaigns, where the unlocked follow-ups get fresh in-window send
    /// times.
    pub async fn on_event<R: Rng + Send>(
        &self,
        event: &DeliveryEvent,
        rng: &mut R,
    ) -> Result<ReconcileOutcome, CadenceError> {
        if !self.storage.record_event(event).await? {
            debug!(event_id = %event.event_id, "duplicate event delivery; no-op");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let Some(prospect_id) = self.correlate(event).await? else {
            warn!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "event matched no prospect; recorded for audit"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        let Some(enrollment) = self.storage.active_enrollment_for(&prospect_id).await? else {
            debug!(
                event_id = %event.event_id,
                prospect_id = %prospect_id,
                "no active enrollment for event; nothing to reconcile"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        match event.event_type {
            EventType::Accepted => {
                self.storage
                    .update_enrollment_status(&enrollment.id, EnrollmentStatus::Connected)
                    .await?;
                if let Some(provider_ref) = event.provider_ref.as_deref() {
                    self.storage.acknowledge_by_provider_ref(provider_ref).await?;
                }

                let campaign = self
                    .storage
                    .get_campaign(&enrollment.campaign_id)
                    .await?
                    .ok_or_else(|| CadenceError::NotFound {
                        entity: "campaign",
                        id: enrollment.campaign_id.clone(),
                    })?;
                if campaign.gate_follow_ups {
                    let anchor = acceptance_day(&campaign, event);
                    let unlocked = self
                        .scheduler
                        .schedule_enrollment(
                            &campaign.id,
                            &prospect_id,
                            anchor,
                            1,
                            rng,
                        )
                        .await?;
                    info!(
                        prospect_id = %prospect_id,
                        campaign_id = %campaign.id,
                        unlocked,
                        "acceptance unlocked gated follow-ups"
                    );
                } else {
                    info!(prospect_id = %prospect_id, "connection accepted");
                }
            }
            // A human answered: automation stops. This is a hard invariant,
            // not a configurable option.
            EventType::Replied | EventType::MessageReceived => {
                self.storage
                    .update_enrollment_status(&enrollment.id, EnrollmentStatus::Replied)
                    .await?;
                let cancelled = self
                    .storage
                    .cancel_pending_for_prospect(&prospect_id)
                    .await?;
                info!(
                    prospect_id = %prospect_id,
                    cancelled,
                    "reply received; pending follow-ups cancelled"
                );
            }
            EventType::Bounced => {
                self.storage
                    .update_enrollment_status(&enrollment.id, EnrollmentStatus::Failed)
                    .await?;
                let cancelled = self
                    .storage
                    .cancel_pending_for_prospect(&prospect_id)
                    .await?;
                info!(
                    prospect_id = %prospect_id,
                    cancelled,
                    "permanent delivery failure; enrollment failed"
                );
            }
        }

        Ok(ReconcileOutcome::Applied)
    }

    /// Resolve the prospect an event refers to: an explicit prospect id
    /// wins, otherwise the provider reference is traced through sent items.
    async fn correlate(&self, event: &DeliveryEvent) -> Result<Option<String>, CadenceError> {
        if let Some(prospect_id) = event.prospect_id.as_deref() {
            return Ok(Some(prospect_id.to_string()));
        }
        if let Some(provider_ref) = event.provider_ref.as_deref() {
            return self.storage.prospect_for_provider_ref(provider_ref).await;
        }
        Ok(None)
    }
}

/// The local date acceptance happened on, in the campaign's timezone.
///
/// Unlocked follow-ups anchor here, so "2 weekdays after acceptance" means
/// the contact's working days, not UTC's.
fn acceptance_day(campaign: &Campaign, event: &DeliveryEvent) -> NaiveDate {
    match campaign.timezone.parse::<Tz>() {
        Ok(tz) => event.occurred_at.with_timezone(&tz).date_naive(),
        Err(_) => event.occurred_at.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::QueueStatus;
    use cadence_test_utils::{
        campaign_fixture, prospect_fixture, seed_enrollment, seeded_rng, temp_storage,
    };
    use chrono::{DateTime, Utc};

    fn event(id: &str, event_type: EventType, prospect_id: Option<&str>) -> DeliveryEvent {
        DeliveryEvent {
            event_id: id.to_string(),
            event_type,
            account_ref: "acct-1".to_string(),
            provider_ref: None,
            prospect_id: prospect_id.map(str::to_string),
            payload: None,
            occurred_at: DateTime::parse_from_rfc3339("2024-01-03T18:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn queue_item(id: &str, prospect: &str, step: u32) -> cadence_core::types::QueueItem {
        cadence_core::types::QueueItem {
            id: id.to_string(),
            campaign_id: "c-1".to_string(),
            prospect_id: prospect.to_string(),
            step_number: step,
            scheduled_for: DateTime::parse_from_rfc3339("2024-01-08T17:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            status: QueueStatus::Scheduled,
            message: None,
            variant_id: None,
            provider_ref: None,
            error_class: None,
            error: None,
            attempt_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn reply_cancels_every_pending_step() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[
                queue_item("q-0", "p-1", 0),
                queue_item("q-1", "p-1", 1),
                queue_item("q-2", "p-1", 2),
            ])
            .await
            .unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);

        let outcome = reconciler
            .on_event(&event("evt-1", EventType::Replied, Some("p-1")), &mut rng)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(
            items.iter().all(|i| i.status == QueueStatus::Cancelled),
            "all pending steps must be cancelled"
        );

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Replied);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_a_noop() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[queue_item("q-0", "p-1", 0)])
            .await
            .unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);

        let first = reconciler
            .on_event(&event("evt-1", EventType::Replied, Some("p-1")), &mut rng)
            .await
            .unwrap();
        assert_eq!(first, ReconcileOutcome::Applied);

        let second = reconciler
            .on_event(&event("evt-1", EventType::Replied, Some("p-1")), &mut rng)
            .await
            .unwrap();
        assert_eq!(second, ReconcileOutcome::Duplicate);
    }

    #[tokio::test]
    async fn message_received_counts_as_a_reply() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[queue_item("q-1", "p-1", 1)])
            .await
            .unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);
        reconciler
            .on_event(
                &event("evt-1", EventType::MessageReceived, Some("p-1")),
                &mut rng,
            )
            .await
            .unwrap();

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Replied);
    }

    #[tokio::test]
    async fn bounce_fails_enrollment_and_cancels() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[queue_item("q-1", "p-1", 1), queue_item("q-2", "p-1", 2)])
            .await
            .unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);
        reconciler
            .on_event(&event("evt-1", EventType::Bounced, Some("p-1")), &mut rng)
            .await
            .unwrap();

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Failed);

        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert!(items.iter().all(|i| i.status == QueueStatus::Cancelled));
    }

    #[tokio::test]
    async fn acceptance_connects_and_unlocks_gated_follow_ups() {
        let (storage, _dir) = temp_storage().await;
        let mut campaign = campaign_fixture("c-1");
        campaign.gate_follow_ups = true;
        campaign.channel = cadence_core::types::ChannelKind::Network;
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        // Only the initial contact was queued; it already went out.
        storage
            .insert_queue_items(&[queue_item("q-0", "p-1", 0)])
            .await
            .unwrap();
        let claimed = storage
            .claim_due_item(
                "c-1",
                DateTime::parse_from_rfc3339("2024-01-08T18:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            )
            .await
            .unwrap()
            .unwrap();
        storage.mark_sent(&claimed.id, "inv-42").await.unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);

        let mut accept = event("evt-1", EventType::Accepted, Some("p-1"));
        accept.provider_ref = Some("inv-42".to_string());
        let outcome = reconciler.on_event(&accept, &mut rng).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Connected);

        // Steps 1 and 2 were unlocked and queued; the sent invitation was
        // acknowledged.
        let items = storage.queue_items_for_prospect("c-1", "p-1").await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].status, QueueStatus::Acknowledged);
        assert_eq!(items[1].status, QueueStatus::Scheduled);
        assert_eq!(items[2].status, QueueStatus::Scheduled);
    }

    #[tokio::test]
    async fn provider_ref_correlates_when_prospect_id_is_absent() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[queue_item("q-0", "p-1", 0), queue_item("q-1", "p-1", 1)])
            .await
            .unwrap();
        let claimed = storage
            .claim_due_item(
                "c-1",
                DateTime::parse_from_rfc3339("2024-01-08T18:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            )
            .await
            .unwrap()
            .unwrap();
        storage.mark_sent(&claimed.id, "msg-77").await.unwrap();

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);

        let mut reply = event("evt-1", EventType::Replied, None);
        reply.provider_ref = Some("msg-77".to_string());
        let outcome = reconciler.on_event(&reply, &mut rng).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Replied);
    }

    #[tokio::test]
    async fn uncorrelatable_event_is_recorded_but_mutates_nothing() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;

        let reconciler = EventReconciler::new(storage.clone());
        let mut rng = seeded_rng(1);

        let mut stray = event("evt-ghost", EventType::Replied, None);
        stray.provider_ref = Some("never-sent".to_string());
        let outcome = reconciler.on_event(&stray, &mut rng).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unmatched);

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Pending);

        // Recorded: the same id now short-circuits.
        let again = reconciler.on_event(&stray, &mut rng).await.unwrap();
        assert_eq!(again, ReconcileOutcome::Duplicate);
    }
}
