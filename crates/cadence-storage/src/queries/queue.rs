// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send queue operations.
//!
//! The `scheduled → claimed` transition is the engine's sole mutual-exclusion
//! primitive: a conditional UPDATE guarded by the row's current status and
//! due time. Multiple dispatcher instances may race on the same item; exactly
//! one observes a changed row.

use cadence_core::CadenceError;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{format_ts, parse_col, parse_ts, Database};
use crate::models::QueueItem;

const QUEUE_COLUMNS: &str = "id, campaign_id, prospect_id, step_number, scheduled_for, status, \
     message, variant_id, provider_ref, error_class, error, attempt_count, created_at, updated_at";

fn item_from_row(row: &rusqlite::Row<'_>) -> Result<QueueItem, rusqlite::Error> {
    let scheduled_for: String = row.get(4)?;
    Ok(QueueItem {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        prospect_id: row.get(2)?,
        step_number: row.get(3)?,
        scheduled_for: parse_ts(4, &scheduled_for)?,
        status: parse_col(5, &row.get::<_, String>(5)?)?,
        message: row.get(6)?,
        variant_id: row.get(7)?,
        provider_ref: row.get(8)?,
        error_class: row.get(9)?,
        error: row.get(10)?,
        attempt_count: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Bulk-insert queue items inside one transaction.
///
/// `INSERT OR IGNORE` keeps at most one live item per (campaign, prospect,
/// step) slot, so re-running enrollment scheduling is idempotent. Returns the
/// number of rows actually inserted.
pub async fn insert_items(db: &Database, items: &[QueueItem]) -> Result<u64, CadenceError> {
    let items = items.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0u64;
            for item in &items {
                inserted += tx.execute(
                    "INSERT OR IGNORE INTO queue_items
                         (id, campaign_id, prospect_id, step_number, scheduled_for, status,
                          message, variant_id, attempt_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        item.id,
                        item.campaign_id,
                        item.prospect_id,
                        item.step_number,
                        format_ts(item.scheduled_for),
                        item.status.to_string(),
                        item.message,
                        item.variant_id,
                        item.attempt_count,
                    ],
                )? as u64;
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim the oldest due `scheduled` item for a campaign.
///
/// The flip succeeds only while the row is still `scheduled` and due, which
/// is re-checked inside the UPDATE itself; a claimant that lost the race
/// sees zero rows changed and returns `None`. The attempt counter is bumped
/// on claim: every claim is a delivery attempt.
pub async fn claim_due_item(
    db: &Database,
    campaign_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<QueueItem>, CadenceError> {
    let campaign_id = campaign_id.to_string();
    let now_s = format_ts(now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let candidate: Option<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM queue_items
                     WHERE campaign_id = ?1 AND status = 'scheduled' AND scheduled_for <= ?2
                     ORDER BY scheduled_for ASC, id ASC
                     LIMIT 1",
                )?;
                match stmt.query_row(params![campaign_id, now_s], |row| row.get(0)) {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };

            let Some(id) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            // The guard re-states the selection predicate; a concurrent
            // claimant that got here first leaves nothing to update.
            let updated = tx.execute(
                "UPDATE queue_items
                 SET status = 'claimed', attempt_count = attempt_count + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'scheduled' AND scheduled_for <= ?2",
                params![id, now_s],
            )?;
            if updated != 1 {
                tx.commit()?;
                return Ok(None);
            }

            let item = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {QUEUE_COLUMNS} FROM queue_items WHERE id = ?1"
                ))?;
                stmt.query_row(params![id], item_from_row)?
            };
            tx.commit()?;
            Ok(Some(item))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the rendered message on a claimed item for audit.
pub async fn record_rendered(db: &Database, id: &str, message: &str) -> Result<(), CadenceError> {
    let id = id.to_string();
    let message = message.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items SET message = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'claimed'",
                params![id, message],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `claimed → sent`, recording the provider reference.
pub async fn mark_sent(db: &Database, id: &str, provider_ref: &str) -> Result<(), CadenceError> {
    let id = id.to_string();
    let provider_ref = provider_ref.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items SET status = 'sent', provider_ref = ?2,
                     error_class = NULL, error = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'claimed'",
                params![id, provider_ref],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `claimed → failed`, recording the error class and message.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error_class: &str,
    error: &str,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    let error_class = error_class.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items SET status = 'failed', error_class = ?2, error = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'claimed'",
                params![id, error_class, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `claimed → scheduled` with a new due time.
///
/// The attempt counter was already bumped at claim, so the retry budget
/// carries across releases. The one sanctioned backward transition.
pub async fn release_for_retry(
    db: &Database,
    id: &str,
    next_attempt_at: DateTime<Utc>,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    let next_s = format_ts(next_attempt_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue_items SET status = 'scheduled', scheduled_for = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'claimed'",
                params![id, next_s],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `sent → acknowledged` for the item matching a provider reference.
///
/// Returns false when no sent item matches (unknown or already-terminal ref).
pub async fn acknowledge_by_provider_ref(
    db: &Database,
    provider_ref: &str,
) -> Result<bool, CadenceError> {
    let provider_ref = provider_ref.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE queue_items SET status = 'acknowledged',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE provider_ref = ?1 AND status = 'sent'",
                params![provider_ref],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancel every `scheduled` or `claimed` item for a prospect.
///
/// Items already `sent` are untouched; a cancellation that loses the race
/// against an in-flight claim is tolerated by the dispatcher.
pub async fn cancel_pending_for_prospect(
    db: &Database,
    prospect_id: &str,
) -> Result<u64, CadenceError> {
    let prospect_id = prospect_id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE queue_items SET status = 'cancelled',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE prospect_id = ?1 AND status IN ('scheduled', 'claimed')",
                params![prospect_id],
            )?;
            Ok(updated as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release items stuck in `claimed` past a cutoff back to `scheduled`.
///
/// A dispatcher that died mid-send leaves its claim behind; the next tick
/// sweeps claims older than the cutoff so the work is not lost. Returns the
/// number of items released.
pub async fn release_stale_claims(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, CadenceError> {
    let cutoff_s = format_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE queue_items SET status = 'scheduled',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'claimed' AND updated_at < ?1",
                params![cutoff_s],
            )?;
            Ok(updated as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a queue item by ID.
pub async fn get_item(db: &Database, id: &str) -> Result<Option<QueueItem>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_COLUMNS} FROM queue_items WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], item_from_row);
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All items for one prospect in one campaign, ordered by step number.
pub async fn items_for_prospect(
    db: &Database,
    campaign_id: &str,
    prospect_id: &str,
) -> Result<Vec<QueueItem>, CadenceError> {
    let campaign_id = campaign_id.to_string();
    let prospect_id = prospect_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_COLUMNS} FROM queue_items
                 WHERE campaign_id = ?1 AND prospect_id = ?2
                 ORDER BY step_number ASC"
            ))?;
            let rows = stmt.query_map(params![campaign_id, prospect_id], item_from_row)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve the prospect owning an item by provider reference.
pub async fn prospect_for_provider_ref(
    db: &Database,
    provider_ref: &str,
) -> Result<Option<String>, CadenceError> {
    let provider_ref = provider_ref.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT prospect_id FROM queue_items WHERE provider_ref = ?1 LIMIT 1",
                params![provider_ref],
                |row| row.get(0),
            );
            match result {
                Ok(id) => Ok(Some(id)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
