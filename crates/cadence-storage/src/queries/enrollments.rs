// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrollment operations.
//!
//! A prospect has at most one active enrollment at any time; the admission
//! check in `cadence-identity` consults `active_enrollment_for` before
//! inserting.

use cadence_core::CadenceError;
use rusqlite::params;

use crate::database::{parse_col, Database};
use crate::models::{Enrollment, EnrollmentStatus};

const ENROLLMENT_COLUMNS: &str =
    "id, campaign_id, prospect_id, status, variant_id, created_at, updated_at";

fn enrollment_from_row(row: &rusqlite::Row<'_>) -> Result<Enrollment, rusqlite::Error> {
    Ok(Enrollment {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        prospect_id: row.get(2)?,
        status: parse_col(3, &row.get::<_, String>(3)?)?,
        variant_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert a new enrollment.
pub async fn insert_enrollment(db: &Database, enrollment: &Enrollment) -> Result<(), CadenceError> {
    let e = enrollment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO enrollments (id, campaign_id, prospect_id, status, variant_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    e.id,
                    e.campaign_id,
                    e.prospect_id,
                    e.status.to_string(),
                    e.variant_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the enrollment linking one prospect to one campaign.
pub async fn get_enrollment(
    db: &Database,
    campaign_id: &str,
    prospect_id: &str,
) -> Result<Option<Enrollment>, CadenceError> {
    let campaign_id = campaign_id.to_string();
    let prospect_id = prospect_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                 WHERE campaign_id = ?1 AND prospect_id = ?2"
            ))?;
            let result = stmt.query_row(params![campaign_id, prospect_id], enrollment_from_row);
            match result {
                Ok(enrollment) => Ok(Some(enrollment)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The prospect's active enrollment, if any.
///
/// Active means `pending`, `queued`, `contacted`, or `connected`. The UNIQUE
/// admission invariant means at most one row can match.
pub async fn active_enrollment_for(
    db: &Database,
    prospect_id: &str,
) -> Result<Option<Enrollment>, CadenceError> {
    let prospect_id = prospect_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                 WHERE prospect_id = ?1
                   AND status IN ('pending', 'queued', 'contacted', 'connected')
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![prospect_id], enrollment_from_row);
            match result {
                Ok(enrollment) => Ok(Some(enrollment)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update an enrollment's status.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: EnrollmentStatus,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE enrollments SET status = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, status.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the variant assigned at schedule time.
pub async fn set_variant(db: &Database, id: &str, variant_id: &str) -> Result<(), CadenceError> {
    let id = id.to_string();
    let variant_id = variant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE enrollments SET variant_id = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, variant_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
