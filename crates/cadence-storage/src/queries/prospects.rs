// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prospect CRUD operations.
//!
//! The identity key is written once at insert and never updated; merges from
//! re-imports touch display fields only.

use cadence_core::CadenceError;
use rusqlite::params;

use crate::database::{parse_col, Database};
use crate::models::Prospect;

const PROSPECT_COLUMNS: &str = "id, workspace_id, identity_key, display_name, email, \
     profile_url, title, company, status, created_at, updated_at";

fn prospect_from_row(row: &rusqlite::Row<'_>) -> Result<Prospect, rusqlite::Error> {
    Ok(Prospect {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        identity_key: row.get(2)?,
        display_name: row.get(3)?,
        email: row.get(4)?,
        profile_url: row.get(5)?,
        title: row.get(6)?,
        company: row.get(7)?,
        status: parse_col(8, &row.get::<_, String>(8)?)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Insert a new prospect. Fails if the (workspace, identity_key) pair exists.
pub async fn insert_prospect(db: &Database, prospect: &Prospect) -> Result<(), CadenceError> {
    let p = prospect.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO prospects
                     (id, workspace_id, identity_key, display_name, email, profile_url,
                      title, company, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    p.id,
                    p.workspace_id,
                    p.identity_key,
                    p.display_name,
                    p.email,
                    p.profile_url,
                    p.title,
                    p.company,
                    p.status.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a prospect by ID.
pub async fn get_prospect(db: &Database, id: &str) -> Result<Option<Prospect>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROSPECT_COLUMNS} FROM prospects WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], prospect_from_row);
            match result {
                Ok(prospect) => Ok(Some(prospect)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a prospect by its normalized identity key within a workspace.
pub async fn get_prospect_by_key(
    db: &Database,
    workspace_id: &str,
    identity_key: &str,
) -> Result<Option<Prospect>, CadenceError> {
    let workspace_id = workspace_id.to_string();
    let identity_key = identity_key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROSPECT_COLUMNS} FROM prospects
                 WHERE workspace_id = ?1 AND identity_key = ?2"
            ))?;
            let result = stmt.query_row(params![workspace_id, identity_key], prospect_from_row);
            match result {
                Ok(prospect) => Ok(Some(prospect)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist merged display fields for an existing prospect.
///
/// `identity_key` and `workspace_id` are immutable and deliberately absent
/// from the UPDATE.
pub async fn update_prospect(db: &Database, prospect: &Prospect) -> Result<(), CadenceError> {
    let p = prospect.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE prospects
                 SET display_name = ?2, email = ?3, profile_url = ?4, title = ?5,
                     company = ?6, status = ?7,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    p.id,
                    p.display_name,
                    p.email,
                    p.profile_url,
                    p.title,
                    p.company,
                    p.status.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
