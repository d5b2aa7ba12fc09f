// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher: claims due queue items and pushes them through channel
//! adapters.
//!
//! `tick(now)` is a pure function of the clock value and store state -- no
//! internal timer, no ambient clock -- so it is testable without a scheduler
//! and safe to trigger concurrently from multiple instances. The atomic
//! claim in storage is the only mutual exclusion; everything else tolerates
//! races.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use cadence_channels::ChannelRegistry;
use cadence_config::model::DispatchConfig;
use cadence_core::types::{
    AccountRef, Campaign, ChannelKind, DeliveryTarget, EnrollmentStatus, QueueItem, SequenceStep,
    StepType,
};
use cadence_core::{CadenceError, SendError, StorageAdapter};

use crate::pacing::PacingPolicy;
use crate::render::render_step;

/// Claims left behind by a dispatcher that died mid-send are swept back to
/// `scheduled` after this long.
const STALE_CLAIM_MINUTES: i64 = 15;

/// Counts of actions taken by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Items claimed this tick.
    pub attempted: u32,
    /// Items delivered and marked `sent`.
    pub sent: u32,
    /// Campaigns pushed to a later check (outside working hours).
    pub deferred: u32,
    /// Items marked `failed`.
    pub failed: u32,
}

/// Per-item delivery outcome, folded into the tick summary.
enum DeliveryOutcome {
    Sent,
    Failed,
    Retried,
    CancelledRace,
}

/// The dispatcher. One instance per process; multiple processes may run
/// concurrently against the same store.
pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    channels: Arc<ChannelRegistry>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        channels: Arc<ChannelRegistry>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            storage,
            channels,
            config,
        }
    }

    /// Run one dispatch pass at `now`.
    ///
    /// Tolerates an empty queue (no-op) and concurrent invocation (the
    /// atomic claim arbitrates). The random source drives jitter only.
    pub async fn tick<R: Rng + Send>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TickSummary, CadenceError> {
        let mut summary = TickSummary::default();

        let swept = self
            .storage
            .release_stale_claims(now - Duration::minutes(STALE_CLAIM_MINUTES))
            .await?;
        if swept > 0 {
            warn!(count = swept, "released stale claims from a dead dispatcher");
        }

        let campaigns = self
            .storage
            .due_campaigns(now, self.config.campaign_batch)
            .await?;
        if campaigns.is_empty() {
            debug!("tick: no due work");
            return Ok(summary);
        }

        for campaign in &campaigns {
            if let Err(e) = self
                .process_campaign(campaign, now, rng, &mut summary)
                .await
            {
                // One broken campaign must not starve the rest of the batch.
                warn!(campaign_id = %campaign.id, error = %e, "campaign pass aborted");
            }
        }

        info!(
            attempted = summary.attempted,
            sent = summary.sent,
            deferred = summary.deferred,
            failed = summary.failed,
            "tick complete"
        );
        Ok(summary)
    }

    async fn process_campaign<R: Rng + Send>(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
        rng: &mut R,
        summary: &mut TickSummary,
    ) -> Result<(), CadenceError> {
        let local_day = match sending_window_check(campaign, now) {
            WindowCheck::Open { local_day } => local_day,
            WindowCheck::Closed { reason } => {
                // Reschedule the next look instead of dropping the work, so
                // a perpetually-paused campaign cannot silently stall.
                let next = now + Duration::minutes(i64::from(self.config.defer_minutes));
                self.storage
                    .set_campaign_next_check(&campaign.id, Some(next))
                    .await?;
                info!(campaign_id = %campaign.id, %reason, next_check_at = %next, "campaign deferred");
                summary.deferred += 1;
                return Ok(());
            }
        };

        let steps = self.storage.steps_for_campaign(&campaign.id).await?;
        let pacing = PacingPolicy::for_campaign(campaign);
        let account = AccountRef(campaign.account_ref.clone());
        let mut sent_this_pass = false;

        loop {
            let sent_today = self
                .storage
                .sent_today(&campaign.account_ref, local_day)
                .await?;
            if sent_today >= campaign.daily_cap {
                info!(
                    campaign_id = %campaign.id,
                    account = %campaign.account_ref,
                    cap = campaign.daily_cap,
                    "daily cap reached; remaining items stay scheduled"
                );
                break;
            }

            let Some(item) = self.storage.claim_due_item(&campaign.id, now).await? else {
                break;
            };
            summary.attempted += 1;

            // Human pacing between successive sends for the same account.
            if sent_this_pass {
                tokio::time::sleep(pacing.delay(rng)).await;
            }

            match self
                .deliver(campaign, &account, &steps, &item, now, local_day)
                .await?
            {
                DeliveryOutcome::Sent => {
                    summary.sent += 1;
                    sent_this_pass = true;
                }
                DeliveryOutcome::Failed => summary.failed += 1,
                DeliveryOutcome::Retried | DeliveryOutcome::CancelledRace => {}
            }
        }

        Ok(())
    }

    /// Deliver one claimed item end to end.
    async fn deliver(
        &self,
        campaign: &Campaign,
        account: &AccountRef,
        steps: &[SequenceStep],
        item: &QueueItem,
        now: DateTime<Utc>,
        local_day: NaiveDate,
    ) -> Result<DeliveryOutcome, CadenceError> {
        let enrollment = self
            .storage
            .get_enrollment(&campaign.id, &item.prospect_id)
            .await?;
        let Some(enrollment) = enrollment else {
            self.storage
                .mark_failed(&item.id, "internal", "enrollment record missing")
                .await?;
            return Ok(DeliveryOutcome::Failed);
        };

        if enrollment.status.is_terminal() {
            // A reply/bounce landed between scheduling and this claim. The
            // cancellation lost the race to our claim; yield the item back
            // as cancelled rather than sending into a closed conversation.
            self.storage
                .cancel_pending_for_prospect(&item.prospect_id)
                .await?;
            info!(
                item_id = %item.id,
                prospect_id = %item.prospect_id,
                status = %enrollment.status,
                "claim raced a terminal enrollment; item cancelled"
            );
            return Ok(DeliveryOutcome::CancelledRace);
        }

        let Some(step) = steps.iter().find(|s| s.step_number == item.step_number) else {
            self.storage
                .mark_failed(&item.id, "internal", "step missing from template")
                .await?;
            return Ok(DeliveryOutcome::Failed);
        };

        let Some(prospect) = self.storage.get_prospect(&item.prospect_id).await? else {
            self.storage
                .mark_failed(&item.id, "internal", "prospect record missing")
                .await?;
            return Ok(DeliveryOutcome::Failed);
        };

        let target = match campaign.channel {
            ChannelKind::Email => prospect.email.clone().map(DeliveryTarget::Email),
            ChannelKind::Network => prospect.profile_url.clone().map(DeliveryTarget::Profile),
        };
        let Some(target) = target else {
            self.storage
                .mark_failed(
                    &item.id,
                    "permanent",
                    "prospect has no address for the campaign channel",
                )
                .await?;
            return Ok(DeliveryOutcome::Failed);
        };

        let rendered = match render_step(step, item.variant_id.as_deref(), &prospect) {
            Ok(rendered) => rendered,
            Err(e @ CadenceError::TemplateRender { .. }) => {
                self.storage
                    .mark_failed(&item.id, "template", &e.to_string())
                    .await?;
                warn!(item_id = %item.id, error = %e, "render failed; item will not ship");
                return Ok(DeliveryOutcome::Failed);
            }
            Err(e) => return Err(e),
        };
        self.storage.record_rendered(&item.id, &rendered.body).await?;

        let adapter = self.channels.get(campaign.channel)?;
        let timeout = std::time::Duration::from_secs(self.config.send_timeout_secs);
        let send_result =
            match tokio::time::timeout(timeout, adapter.send(account, &target, &rendered)).await {
                Ok(result) => result,
                // The provider may still have delivered after our deadline;
                // at-least-once on timeout is the documented trade.
                Err(_) => Err(SendError::Transient {
                    reason: format!(
                        "send timed out after {}s (provider-side success unknown)",
                        self.config.send_timeout_secs
                    ),
                }),
            };

        match send_result {
            Ok(provider_ref) => {
                self.storage.mark_sent(&item.id, &provider_ref.0).await?;
                self.storage
                    .increment_sent(&campaign.account_ref, local_day)
                    .await?;

                if step.step_type == StepType::Final {
                    self.storage
                        .update_enrollment_status(&enrollment.id, EnrollmentStatus::Completed)
                        .await?;
                } else if enrollment.status == EnrollmentStatus::Queued {
                    self.storage
                        .update_enrollment_status(&enrollment.id, EnrollmentStatus::Contacted)
                        .await?;
                }

                debug!(
                    item_id = %item.id,
                    provider_ref = %provider_ref.0,
                    step = item.step_number,
                    "item sent"
                );
                Ok(DeliveryOutcome::Sent)
            }
            Err(e) if e.is_retryable() && item.attempt_count < self.config.max_attempts => {
                let backoff = Duration::seconds(
                    (self.config.retry_backoff_secs * u64::from(item.attempt_count)) as i64,
                );
                let next_attempt = now + backoff;
                self.storage
                    .release_for_retry(&item.id, next_attempt)
                    .await?;
                warn!(
                    item_id = %item.id,
                    attempt = item.attempt_count,
                    next_attempt_at = %next_attempt,
                    error = %e,
                    "transient failure; released for retry"
                );
                Ok(DeliveryOutcome::Retried)
            }
            Err(e) => {
                self.storage
                    .mark_failed(&item.id, e.class(), &e.to_string())
                    .await?;
                warn!(item_id = %item.id, class = e.class(), error = %e, "item failed");
                Ok(DeliveryOutcome::Failed)
            }
        }
    }
}

enum WindowCheck {
    Open { local_day: NaiveDate },
    Closed { reason: String },
}

/// Evaluate the campaign's working window at `now` in its timezone.
///
/// The returned local day keys the account's daily counter, so "20 a day"
/// means the account's day, not UTC's.
fn sending_window_check(campaign: &Campaign, now: DateTime<Utc>) -> WindowCheck {
    let Ok(tz) = campaign.timezone.parse::<Tz>() else {
        return WindowCheck::Closed {
            reason: format!("unknown timezone `{}`", campaign.timezone),
        };
    };
    let local = now.with_timezone(&tz);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return WindowCheck::Closed {
            reason: format!("{} is not a sending day", local.weekday()),
        };
    }

    let minute_of_day = local.hour() * 60 + local.minute();
    if minute_of_day < campaign.work_start_min || minute_of_day >= campaign.work_end_min {
        return WindowCheck::Closed {
            reason: format!(
                "local time {} outside window {}..{}",
                local.time(),
                campaign.work_start_min,
                campaign.work_end_min
            ),
        };
    }

    WindowCheck::Open {
        local_day: local.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_test_utils::{
        campaign_fixture, enrollment_fixture, prospect_fixture, seed_enrollment, seeded_rng,
        steps_fixture, temp_storage, MockChannel,
    };
    use cadence_core::types::QueueStatus;

    fn dispatch_config() -> DispatchConfig {
        DispatchConfig {
            campaign_batch: 25,
            max_attempts: 3,
            retry_backoff_secs: 900,
            defer_minutes: 30,
            send_timeout_secs: 30,
        }
    }

    fn registry_with(channel: Arc<MockChannel>) -> Arc<ChannelRegistry> {
        let mut registry = ChannelRegistry::new();
        registry.register(channel);
        Arc::new(registry)
    }

    fn item(id: &str, campaign: &str, prospect: &str, step: u32, when: DateTime<Utc>) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            campaign_id: campaign.to_string(),
            prospect_id: prospect.to_string(),
            step_number: step,
            scheduled_for: when,
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

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    // Tuesday 2024-01-02 15:00 UTC: inside any all-day UTC window.
    fn tuesday_afternoon() -> DateTime<Utc> {
        ts("2024-01-02T15:00:00Z")
    }

    #[tokio::test]
    async fn empty_queue_tick_is_a_noop() {
        let (storage, _dir) = temp_storage().await;
        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(storage, registry_with(channel), dispatch_config());
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary, TickSummary::default());
    }

    #[tokio::test]
    async fn due_item_is_rendered_and_sent() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 0);

        let sends = channel.sent().await;
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].message.body, "Hi Jane, quick question about Acme");
        assert_eq!(
            sends[0].target,
            DeliveryTarget::Email("p-1@example.com".to_string())
        );

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Sent);
        assert!(stored.provider_ref.is_some());
        assert_eq!(
            stored.message.as_deref(),
            Some("Hi Jane, quick question about Acme")
        );

        // First successful send advances the enrollment.
        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Contacted);
    }

    #[tokio::test]
    async fn daily_cap_leaves_excess_items_scheduled() {
        let (storage, _dir) = temp_storage().await;
        let mut campaign = campaign_fixture("c-1");
        campaign.daily_cap = 2;
        storage.insert_campaign(&campaign).await.unwrap();
        storage.insert_steps(&steps_fixture("c-1")).await.unwrap();

        for i in 0..5 {
            let prospect = prospect_fixture(&format!("p-{i}"));
            storage.insert_prospect(&prospect).await.unwrap();
            storage
                .insert_enrollment(&enrollment_fixture(
                    &format!("e-{i}"),
                    "c-1",
                    &prospect.id,
                ))
                .await
                .unwrap();
            storage
                .insert_queue_items(&[item(
                    &format!("q-{i}"),
                    "c-1",
                    &prospect.id,
                    0,
                    ts("2024-01-02T09:00:00Z"),
                )])
                .await
                .unwrap();
        }

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(channel.sent_count().await, 2);

        let mut scheduled = 0;
        for i in 0..5 {
            let stored = storage
                .get_queue_item(&format!("q-{i}"))
                .await
                .unwrap()
                .unwrap();
            if stored.status == QueueStatus::Scheduled {
                scheduled += 1;
            }
        }
        assert_eq!(scheduled, 3, "items past the cap stay scheduled");
    }

    #[tokio::test]
    async fn outside_working_hours_defers_instead_of_sending() {
        let (storage, _dir) = temp_storage().await;
        let mut campaign = campaign_fixture("c-1");
        campaign.work_start_min = 9 * 60;
        campaign.work_end_min = 17 * 60;
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T01:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        // 02:00 UTC is outside the 09:00..17:00 window.
        let night = ts("2024-01-02T02:00:00Z");
        let summary = dispatcher.tick(night, &mut rng).await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(summary.sent, 0);
        assert_eq!(channel.sent_count().await, 0);

        // The item is untouched; the campaign carries the deferral marker.
        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Scheduled);
        let reloaded = storage.get_campaign("c-1").await.unwrap().unwrap();
        assert_eq!(
            reloaded.next_check_at,
            Some(night + Duration::minutes(30))
        );
    }

    #[tokio::test]
    async fn weekend_is_not_a_sending_day() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-05T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        // Saturday 2024-01-06, inside the (all-day) window but not a weekday.
        let saturday = ts("2024-01-06T12:00:00Z");
        let summary = dispatcher.tick(saturday, &mut rng).await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn transient_failure_releases_for_retry_with_backoff() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        channel
            .push_failure(SendError::Transient {
                reason: "relay rate limited".to_string(),
            })
            .await;
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let now = tuesday_afternoon();
        let summary = dispatcher.tick(now, &mut rng).await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.failed, 0, "transient failure is not terminal");

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Scheduled);
        assert_eq!(stored.attempt_count, 1);
        // First retry backs off by retry_backoff_secs * 1.
        assert_eq!(stored.scheduled_for, now + Duration::seconds(900));
    }

    #[tokio::test]
    async fn transient_failures_exhaust_into_failed() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let mut config = dispatch_config();
        config.max_attempts = 2;
        config.retry_backoff_secs = 0;
        let dispatcher = Dispatcher::new(storage.clone(), registry_with(channel.clone()), config);
        let mut rng = seeded_rng(1);

        // Zero backoff keeps the released item due, so a single tick walks
        // the item through both attempts before giving up.
        for _ in 0..2 {
            channel
                .push_failure(SendError::Transient {
                    reason: "relay rate limited".to_string(),
                })
                .await;
        }
        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 1);

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(stored.error_class.as_deref(), Some("transient"));
    }

    #[tokio::test]
    async fn permanent_failure_never_retries() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        channel
            .push_failure(SendError::Permanent {
                reason: "mailbox does not exist".to_string(),
            })
            .await;
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.failed, 1);

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(stored.error_class.as_deref(), Some("permanent"));
        assert_eq!(stored.attempt_count, 1);
    }

    #[tokio::test]
    async fn unresolved_placeholder_fails_without_shipping() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let mut prospect = prospect_fixture("p-1");
        // The template needs {first_name}; this prospect has no name at all.
        prospect.display_name = None;
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(channel.sent_count().await, 0, "nothing may ship");

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(stored.error_class.as_deref(), Some("template"));
    }

    #[tokio::test]
    async fn claim_racing_terminal_enrollment_cancels_item() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        let enrollment_id = seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        // The prospect replied before this tick got to the item.
        storage
            .update_enrollment_status(&enrollment_id, EnrollmentStatus::Replied)
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.sent, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(channel.sent_count().await, 0);

        let stored = storage.get_queue_item("q-1").await.unwrap().unwrap();
        assert_eq!(stored.status, QueueStatus::Cancelled);
    }

    #[tokio::test]
    async fn final_step_send_completes_the_enrollment() {
        let (storage, _dir) = temp_storage().await;
        let campaign = campaign_fixture("c-1");
        let prospect = prospect_fixture("p-1");
        let enrollment_id = seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .update_enrollment_status(&enrollment_id, EnrollmentStatus::Contacted)
            .await
            .unwrap();
        storage
            .insert_queue_items(&[item("q-2", "c-1", "p-1", 2, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Email));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.sent, 1);

        let enrollment = storage.get_enrollment("c-1", "p-1").await.unwrap().unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Completed);
    }

    #[tokio::test]
    async fn network_campaign_targets_the_profile() {
        let (storage, _dir) = temp_storage().await;
        let mut campaign = campaign_fixture("c-1");
        campaign.channel = ChannelKind::Network;
        let prospect = prospect_fixture("p-1");
        seed_enrollment(&storage, &campaign, &prospect).await;
        storage
            .insert_queue_items(&[item("q-1", "c-1", "p-1", 0, ts("2024-01-02T09:00:00Z"))])
            .await
            .unwrap();

        let channel = Arc::new(MockChannel::new(ChannelKind::Network));
        let dispatcher = Dispatcher::new(
            storage.clone(),
            registry_with(channel.clone()),
            dispatch_config(),
        );
        let mut rng = seeded_rng(1);

        let summary = dispatcher.tick(tuesday_afternoon(), &mut rng).await.unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(
            channel.sent().await[0].target,
            DeliveryTarget::Profile("in/prospect-p-1".to_string())
        );
    }
}
