// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Last-notified watermarks per unit of work (mailbox flag).
//!
//! All instants are stored as RFC 3339 UTC strings; callers compare in UTC
//! to stay immune to machine-local time settings.

use beacon_core::BeaconError;
use rusqlite::params;

use crate::database::Database;

/// Fetch the last-notified instant for a unit of work, if one is recorded.
pub async fn last_notified_at(
    db: &Database,
    work_name: &str,
) -> Result<Option<String>, BeaconError> {
    let work_name = work_name.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT last_notified_at FROM notify_watermarks WHERE work_name = ?1",
                params![work_name],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(at) => Ok(Some(at)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record (or advance) the last-notified instant for a unit of work.
pub async fn set_last_notified(
    db: &Database,
    work_name: &str,
    at: &str,
) -> Result<(), BeaconError> {
    let work_name = work_name.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notify_watermarks (work_name, last_notified_at)
                 VALUES (?1, ?2)
                 ON CONFLICT (work_name) DO UPDATE SET last_notified_at = excluded.last_notified_at",
                params![work_name, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
