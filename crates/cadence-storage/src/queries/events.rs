// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery event persistence.
//!
//! Events are append-only. The event id primary key is the idempotency
//! guard: replayed webhooks insert zero rows and the reconciler
//! short-circuits.

use cadence_core::CadenceError;
use rusqlite::params;

use crate::database::{format_ts, Database};
use crate::models::DeliveryEvent;

/// Append a delivery event.
///
/// Returns false when the event id was already recorded (duplicate
/// delivery); the caller must treat that as a no-op.
pub async fn record_event(db: &Database, event: &DeliveryEvent) -> Result<bool, CadenceError> {
    let e = event.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO delivery_events
                     (event_id, event_type, account_ref, provider_ref, prospect_id, payload,
                      occurred_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    e.event_id,
                    e.event_type.to_string(),
                    e.account_ref,
                    e.provider_ref,
                    e.prospect_id,
                    e.payload.as_ref().map(|p| p.to_string()),
                    format_ts(e.occurred_at),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::EventType;
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_event(id: &str) -> DeliveryEvent {
        DeliveryEvent {
            event_id: id.to_string(),
            event_type: EventType::Replied,
            account_ref: "acct-1".to_string(),
            provider_ref: Some("prov-1".to_string()),
            prospect_id: None,
            payload: Some(serde_json::json!({"text": "sounds good"})),
            occurred_at: DateTime::parse_from_rfc3339("2024-01-03T15:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn first_record_inserts_replay_is_noop() {
        let (db, _dir) = setup_db().await;

        assert!(record_event(&db, &make_event("evt-1")).await.unwrap());
        assert!(
            !record_event(&db, &make_event("evt-1")).await.unwrap(),
            "replayed event id must not insert"
        );
        assert!(record_event(&db, &make_event("evt-2")).await.unwrap());

        db.close().await.unwrap();
    }
}
