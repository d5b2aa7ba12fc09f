// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign and sequence-step operations.
//!
//! Steps (with their variants) are written in one transaction at campaign
//! setup; once a campaign is `active` its template rows are never edited.

use cadence_core::CadenceError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use crate::database::{format_ts, parse_col, parse_ts, Database};
use crate::models::{Campaign, CampaignStatus, SequenceStep, StepVariant};

const CAMPAIGN_COLUMNS: &str = "id, workspace_id, name, channel, account_ref, timezone, \
     work_start_min, work_end_min, daily_cap, jitter_min_secs, jitter_max_secs, start_date, \
     gate_follow_ups, status, next_check_at, created_at, updated_at";

fn campaign_from_row(row: &rusqlite::Row<'_>) -> Result<Campaign, rusqlite::Error> {
    let start_date: String = row.get(11)?;
    let next_check_at: Option<String> = row.get(14)?;
    Ok(Campaign {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        channel: parse_col(3, &row.get::<_, String>(3)?)?,
        account_ref: row.get(4)?,
        timezone: row.get(5)?,
        work_start_min: row.get(6)?,
        work_end_min: row.get(7)?,
        daily_cap: row.get(8)?,
        jitter_min_secs: row.get(9)?,
        jitter_max_secs: row.get(10)?,
        start_date: NaiveDate::parse_from_str(&start_date, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?,
        gate_follow_ups: row.get::<_, i64>(12)? != 0,
        status: parse_col(13, &row.get::<_, String>(13)?)?,
        next_check_at: next_check_at.as_deref().map(|s| parse_ts(14, s)).transpose()?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Insert a new campaign.
pub async fn insert_campaign(db: &Database, campaign: &Campaign) -> Result<(), CadenceError> {
    let c = campaign.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns
                     (id, workspace_id, name, channel, account_ref, timezone, work_start_min,
                      work_end_min, daily_cap, jitter_min_secs, jitter_max_secs, start_date,
                      gate_follow_ups, status, next_check_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    c.id,
                    c.workspace_id,
                    c.name,
                    c.channel.to_string(),
                    c.account_ref,
                    c.timezone,
                    c.work_start_min,
                    c.work_end_min,
                    c.daily_cap,
                    c.jitter_min_secs,
                    c.jitter_max_secs,
                    c.start_date.format("%Y-%m-%d").to_string(),
                    c.gate_follow_ups as i64,
                    c.status.to_string(),
                    c.next_check_at.map(format_ts),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], campaign_from_row);
            match result {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a campaign's lifecycle status.
pub async fn update_campaign_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, status.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set or clear the deferral marker consulted by the dispatcher.
pub async fn set_next_check(
    db: &Database,
    id: &str,
    next_check_at: Option<DateTime<Utc>>,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET next_check_at = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, next_check_at.map(format_ts)],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist a campaign's sequence steps and their variants in one transaction.
pub async fn insert_steps(db: &Database, steps: &[SequenceStep]) -> Result<(), CadenceError> {
    let steps = steps.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for step in &steps {
                tx.execute(
                    "INSERT INTO sequence_steps
                         (campaign_id, step_number, day_offset, step_type, message_template,
                          subject_template)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        step.campaign_id,
                        step.step_number,
                        step.day_offset,
                        step.step_type.to_string(),
                        step.message_template,
                        step.subject_template,
                    ],
                )?;
                for variant in &step.variants {
                    tx.execute(
                        "INSERT INTO step_variants
                             (campaign_id, step_number, variant_id, template, traffic_allocation)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            step.campaign_id,
                            step.step_number,
                            variant.id,
                            variant.template,
                            variant.traffic_allocation,
                        ],
                    )?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a campaign's steps ordered by step number, variants included.
pub async fn steps_for_campaign(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<SequenceStep>, CadenceError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT campaign_id, step_number, day_offset, step_type, message_template,
                        subject_template
                 FROM sequence_steps WHERE campaign_id = ?1 ORDER BY step_number ASC",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| {
                Ok(SequenceStep {
                    campaign_id: row.get(0)?,
                    step_number: row.get(1)?,
                    day_offset: row.get(2)?,
                    step_type: parse_col(3, &row.get::<_, String>(3)?)?,
                    message_template: row.get(4)?,
                    subject_template: row.get(5)?,
                    variants: Vec::new(),
                })
            })?;
            let mut steps = Vec::new();
            for row in rows {
                steps.push(row?);
            }

            let mut variant_stmt = conn.prepare(
                "SELECT variant_id, template, traffic_allocation
                 FROM step_variants WHERE campaign_id = ?1 AND step_number = ?2
                 ORDER BY variant_id ASC",
            )?;
            for step in &mut steps {
                let rows = variant_stmt.query_map(
                    params![step.campaign_id, step.step_number],
                    |row| {
                        Ok(StepVariant {
                            id: row.get(0)?,
                            template: row.get(1)?,
                            traffic_allocation: row.get(2)?,
                        })
                    },
                )?;
                for row in rows {
                    step.variants.push(row?);
                }
            }
            Ok(steps)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active campaigns with due `scheduled` work at `now`, excluding campaigns
/// deferred past `now`, ordered by their oldest due item.
pub async fn due_campaigns(
    db: &Database,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Campaign>, CadenceError> {
    let now_s = format_ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c
                 WHERE c.status = 'active'
                   AND (c.next_check_at IS NULL OR c.next_check_at <= ?1)
                   AND EXISTS (
                       SELECT 1 FROM queue_items q
                       WHERE q.campaign_id = c.id
                         AND q.status = 'scheduled'
                         AND q.scheduled_for <= ?1)
                 ORDER BY (
                     SELECT MIN(q.scheduled_for) FROM queue_items q
                     WHERE q.campaign_id = c.id
                       AND q.status = 'scheduled'
                       AND q.scheduled_for <= ?1) ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![now_s, limit], campaign_from_row)?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::{ChannelKind, StepType};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_campaign(id: &str) -> Campaign {
        Campaign {
            id: id.to_string(),
            workspace_id: "ws-1".to_string(),
            name: "Q1 outbound".to_string(),
            channel: ChannelKind::Email,
            account_ref: "acct-1".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            work_start_min: 9 * 60,
            work_end_min: 17 * 60,
            daily_cap: 20,
            jitter_min_secs: 30,
            jitter_max_secs: 180,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            gate_follow_ups: false,
            status: CampaignStatus::Active,
            next_check_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn insert_and_reload_campaign() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &make_campaign("c-1")).await.unwrap();

        let loaded = get_campaign(&db, "c-1").await.unwrap().unwrap();
        assert_eq!(loaded.channel, ChannelKind::Email);
        assert_eq!(loaded.timezone, "America/Los_Angeles");
        assert_eq!(loaded.work_start_min, 540);
        assert_eq!(loaded.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(loaded.next_check_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn steps_round_trip_with_variants() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &make_campaign("c-1")).await.unwrap();

        let steps = vec![
            SequenceStep {
                campaign_id: "c-1".to_string(),
                step_number: 0,
                day_offset: 0,
                step_type: StepType::InitialContact,
                message_template: "Hi {first_name}".to_string(),
                subject_template: Some("Quick question".to_string()),
                variants: vec![
                    StepVariant {
                        id: "a".to_string(),
                        template: "Hi {first_name}, loved your talk".to_string(),
                        traffic_allocation: 0.7,
                    },
                    StepVariant {
                        id: "b".to_string(),
                        template: "Hi {first_name}, quick one".to_string(),
                        traffic_allocation: 0.3,
                    },
                ],
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
        ];
        insert_steps(&db, &steps).await.unwrap();

        let loaded = steps_for_campaign(&db, "c-1").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].variants.len(), 2);
        assert_eq!(loaded[0].variants[0].id, "a");
        assert!((loaded[0].variants[0].traffic_allocation - 0.7).abs() < f64::EPSILON);
        assert!(loaded[1].variants.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_next_check_round_trips() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &make_campaign("c-1")).await.unwrap();

        let later = DateTime::parse_from_rfc3339("2024-01-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        set_next_check(&db, "c-1", Some(later)).await.unwrap();

        let loaded = get_campaign(&db, "c-1").await.unwrap().unwrap();
        assert_eq!(loaded.next_check_at, Some(later));

        set_next_check(&db, "c-1", None).await.unwrap();
        let cleared = get_campaign(&db, "c-1").await.unwrap().unwrap();
        assert!(cleared.next_check_at.is_none());

        db.close().await.unwrap();
    }
}
