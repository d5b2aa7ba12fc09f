// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(account, date) send counters.
//!
//! The daily cap reads from here before every claim. Rollover is the day key
//! changing, never process restart, so caps survive crashes and horizontal
//! scaling.

use cadence_core::CadenceError;
use chrono::NaiveDate;
use rusqlite::params;

use crate::database::Database;

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Sends recorded for an account on a given UTC date.
pub async fn sent_today(
    db: &Database,
    account_ref: &str,
    day: NaiveDate,
) -> Result<u32, CadenceError> {
    let account_ref = account_ref.to_string();
    let day = day_key(day);
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT sent_count FROM send_counters WHERE account_ref = ?1 AND day = ?2",
                params![account_ref, day],
                |row| row.get(0),
            );
            match result {
                Ok(count) => Ok(count),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Increment the per-(account, date) counter by one.
pub async fn increment_sent(
    db: &Database,
    account_ref: &str,
    day: NaiveDate,
) -> Result<(), CadenceError> {
    let account_ref = account_ref.to_string();
    let day = day_key(day);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO send_counters (account_ref, day, sent_count)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT (account_ref, day)
                 DO UPDATE SET sent_count = sent_count + 1",
                params![account_ref, day],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
