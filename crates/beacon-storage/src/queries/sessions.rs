// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session row operations.

use beacon_core::BeaconError;
use rusqlite::params;

use crate::database::Database;
use crate::models::SessionRecord;

fn record_from(row: &rusqlite::Row<'_>) -> Result<SessionRecord, rusqlite::Error> {
    Ok(SessionRecord {
        id: row.get(0)?,
        origin_surface: row.get(1)?,
        status: row.get(2)?,
        last_activity_at: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, origin_surface, status, last_activity_at, created_at, updated_at";

/// Create a new session row.
pub async fn create_session(db: &Database, record: &SessionRecord) -> Result<(), BeaconError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, origin_surface, status, last_activity_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.origin_surface,
                    record.status,
                    record.last_activity_at,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<SessionRecord>, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], record_from);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List sessions, optionally filtered by status.
pub async fn list_sessions(
    db: &Database,
    status: Option<&str>,
) -> Result<Vec<SessionRecord>, BeaconError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut sessions = Vec::new();
            match &status {
                Some(status_filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM sessions
                         WHERE status = ?1 ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt.query_map(params![status_filter], record_from)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM sessions ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt.query_map([], record_from)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a session's status, last-activity instant, and updated_at timestamp.
pub async fn update_session_status(
    db: &Database,
    id: &str,
    status: &str,
    last_activity_at: Option<&str>,
) -> Result<(), BeaconError> {
    let id = id.to_string();
    let status = status.to_string();
    let last_activity_at = last_activity_at.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET status = ?1, last_activity_at = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, last_activity_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert per-surface metadata for a session.
pub async fn set_surface_metadata(
    db: &Database,
    id: &str,
    surface: &str,
    metadata: &str,
) -> Result<(), BeaconError> {
    let id = id.to_string();
    let surface = surface.to_string();
    let metadata = metadata.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO session_surface_metadata (session_id, surface, metadata)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (session_id, surface) DO UPDATE SET
                   metadata = excluded.metadata,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, surface, metadata],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get per-surface metadata for a session.
pub async fn get_surface_metadata(
    db: &Database,
    id: &str,
    surface: &str,
) -> Result<Option<String>, BeaconError> {
    let id = id.to_string();
    let surface = surface.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT metadata FROM session_surface_metadata
                 WHERE session_id = ?1 AND surface = ?2",
                params![id, surface],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(metadata) => Ok(Some(metadata)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
