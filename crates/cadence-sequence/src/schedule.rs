// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedule computation.
//!
//! Turns a sequence template plus an anchor date into concrete UTC send
//! instants: day offsets count weekdays only, and the time of day is drawn
//! inside the campaign's working window in its configured timezone. The
//! calculator runs once per anchor; drift handling at dispatch time belongs
//! to the dispatcher.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rand::Rng;

use cadence_core::types::{Campaign, SequenceStep};
use cadence_core::CadenceError;

/// One planned send instant for a step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSend {
    pub step_number: u32,
    pub scheduled_for: DateTime<Utc>,
}

/// The full plan for one enrollment from one anchor date.
#[derive(Debug, Clone, Default)]
pub struct SchedulePlan {
    pub sends: Vec<PlannedSend>,
    /// Variant chosen at plan time, when any planned step declares variants
    /// and none was assigned before.
    pub variant_id: Option<String>,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advance `start` by `offset` weekdays.
///
/// Saturdays and Sundays are skipped entirely: an offset of 3 lands on the
/// 3rd weekday after start, not the 3rd calendar day. A weekend start first
/// rolls forward to Monday, so offset 0 from Saturday is Monday.
pub fn add_weekdays(start: NaiveDate, offset: u32) -> NaiveDate {
    let mut date = start;
    while is_weekend(date) {
        date += Duration::days(1);
    }
    for _ in 0..offset {
        date += Duration::days(1);
        while is_weekend(date) {
            date += Duration::days(1);
        }
    }
    date
}

/// Place a send inside the campaign's working window on `date`, in the
/// campaign's timezone, returning the UTC instant.
///
/// The second-of-day is drawn uniformly from the window so enrollments do
/// not fire in synchronized bursts. DST ambiguity resolves to the earliest
/// instant; a nonexistent local time (spring-forward gap) shifts one hour
/// later.
pub fn place_in_window<R: Rng>(
    campaign: &Campaign,
    date: NaiveDate,
    rng: &mut R,
) -> Result<DateTime<Utc>, CadenceError> {
    if campaign.work_end_min <= campaign.work_start_min || campaign.work_end_min > 24 * 60 {
        return Err(CadenceError::Schedule(format!(
            "campaign {} has an empty working window ({}..{})",
            campaign.id, campaign.work_start_min, campaign.work_end_min
        )));
    }
    let tz: Tz = campaign.timezone.parse().map_err(|_| {
        CadenceError::Schedule(format!(
            "campaign {} has unknown timezone `{}`",
            campaign.id, campaign.timezone
        ))
    })?;

    let start_sec = i64::from(campaign.work_start_min) * 60;
    let end_sec = i64::from(campaign.work_end_min) * 60;
    let offset_sec = rng.gen_range(start_sec..end_sec);

    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CadenceError::Schedule(format!("invalid date {date}")))?
        + Duration::seconds(offset_sec);

    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| {
                CadenceError::Schedule(format!(
                    "no valid local time near {naive} in {}",
                    campaign.timezone
                ))
            })?,
    };
    Ok(local.with_timezone(&Utc))
}

/// Compute the schedule for the steps at or past `from_step`, anchored at
/// `anchor`.
///
/// When `campaign.gate_follow_ups` is set and the plan starts from the top of
/// the sequence, only the `initial_contact` step is planned; the remainder is
/// planned again from the acceptance date once the contact accepts.
///
/// `has_variant` suppresses a fresh variant draw for enrollments that were
/// already assigned one (acceptance-time re-planning).
pub fn plan_schedule<R: Rng>(
    campaign: &Campaign,
    steps: &[SequenceStep],
    anchor: NaiveDate,
    from_step: u32,
    has_variant: bool,
    rng: &mut R,
) -> Result<SchedulePlan, CadenceError> {
    let mut plan = SchedulePlan::default();

    // Offsets are relative to the sequence start. Plans re-anchored mid-
    // sequence (post-acceptance follow-ups) subtract the first planned
    // step's offset so the earliest remaining step lands on the anchor day.
    let base_offset = if from_step == 0 {
        0
    } else {
        steps
            .iter()
            .filter(|s| s.step_number >= from_step)
            .map(|s| s.day_offset)
            .min()
            .unwrap_or(0)
    };

    for step in steps {
        if step.step_number < from_step {
            continue;
        }
        if campaign.gate_follow_ups && from_step == 0 && step.step_number > 0 {
            continue;
        }

        let relative = step.day_offset - base_offset;
        let date = add_weekdays(anchor, relative);
        let scheduled_for = place_in_window(campaign, date, rng)?;
        plan.sends.push(PlannedSend {
            step_number: step.step_number,
            scheduled_for,
        });

        if !has_variant && plan.variant_id.is_none() && !step.variants.is_empty() {
            plan.variant_id = crate::variant::assign_variant(&step.variants, rng)
                .map(|v| v.id.clone());
        }
    }

    Ok(plan)
}
