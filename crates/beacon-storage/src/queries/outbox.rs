// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox operations for durable notification delivery.
//!
//! Pure persistence: no routing or delivery logic lives here. Rows are
//! appended by the router and updated by the worker; never deleted.

use beacon_core::BeaconError;
use rusqlite::params;

use crate::database::Database;
use crate::models::OutboxRow;

/// Row statuses used in the `outbox.status` column.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_FAILED: &str = "failed";

/// Fields for a new outbox row; the database fills id, status, and timestamps.
#[derive(Debug, Clone)]
pub struct NewOutboxRow {
    pub source_key: String,
    pub work_name: String,
    pub recipient: String,
    pub recipient_address: String,
    pub delivery_channel: String,
    pub content_ref: Option<String>,
    pub rendered_text: String,
    pub max_attempts: i32,
}

const SELECT_COLUMNS: &str = "id, source_key, work_name, recipient, recipient_address, \
     delivery_channel, content_ref, rendered_text, status, attempts, max_attempts, \
     created_at, updated_at";

fn row_from(row: &rusqlite::Row<'_>) -> Result<OutboxRow, rusqlite::Error> {
    Ok(OutboxRow {
        id: row.get(0)?,
        source_key: row.get(1)?,
        work_name: row.get(2)?,
        recipient: row.get(3)?,
        recipient_address: row.get(4)?,
        delivery_channel: row.get(5)?,
        content_ref: row.get(6)?,
        rendered_text: row.get(7)?,
        status: row.get(8)?,
        attempts: row.get(9)?,
        max_attempts: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Insert a new pending row, idempotently.
///
/// A row with the same `(source_key, recipient_address, delivery_channel)`
/// already present makes this a no-op that leaves the existing row's status
/// and attempts untouched. Returns `Some(id)` for a fresh insert, `None`
/// when the unique key already existed.
pub async fn insert(db: &Database, new_row: NewOutboxRow) -> Result<Option<i64>, BeaconError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO outbox
                 (source_key, work_name, recipient, recipient_address, delivery_channel,
                  content_ref, rendered_text, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new_row.source_key,
                    new_row.work_name,
                    new_row.recipient,
                    new_row.recipient_address,
                    new_row.delivery_channel,
                    new_row.content_ref,
                    new_row.rendered_text,
                    new_row.max_attempts,
                ],
            )?;
            if changed == 0 {
                Ok(None)
            } else {
                Ok(Some(conn.last_insert_rowid()))
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch up to `limit` pending rows, oldest first.
pub async fn fetch_pending(db: &Database, limit: usize) -> Result<Vec<OutboxRow>, BeaconError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM outbox
                 WHERE status = 'pending'
                 ORDER BY id ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], row_from)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one row by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<OutboxRow>, BeaconError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM outbox WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_from);
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a row as delivered.
pub async fn mark_delivered(db: &Database, id: i64) -> Result<(), BeaconError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE outbox SET status = 'delivered',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a delivery attempt as failed.
///
/// Increments attempts. If attempts >= max_attempts, sets status to "failed"
/// permanently. Otherwise the row stays "pending" for a later pass.
pub async fn mark_failed(db: &Database, id: i64) -> Result<(), BeaconError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM outbox WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let new_status = if new_attempts >= max_attempts {
                "failed"
            } else {
                "pending"
            };
            conn.execute(
                "UPDATE outbox SET status = ?1, attempts = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![new_status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a row as permanently failed, regardless of remaining attempts.
///
/// Used when the failure cannot be cured by retrying, e.g. a delivery
/// channel with no registered sender.
pub async fn mark_failed_permanent(db: &Database, id: i64) -> Result<(), BeaconError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE outbox SET status = 'failed', attempts = max_attempts,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-status row counts, for operator surfacing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxCounts {
    pub pending: i64,
    pub delivered: i64,
    pub failed: i64,
}

/// Count rows by status.
pub async fn status_counts(db: &Database) -> Result<OutboxCounts, BeaconError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM outbox GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = OutboxCounts::default();
            for row in rows {
                let (status, n) = row?;
                match status.as_str() {
                    "pending" => counts.pending = n,
                    "delivered" => counts.delivered = n,
                    "failed" => counts.failed = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_row(source_key: &str, address: &str) -> NewOutboxRow {
        NewOutboxRow {
            source_key: source_key.to_string(),
            work_name: "weekly-report".to_string(),
            recipient: "alice".to_string(),
            recipient_address: address.to_string(),
            delivery_channel: "telegram".to_string(),
            content_ref: Some("reports/weekly.md".to_string()),
            rendered_text: "Your weekly report is ready.".to_string(),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_pending() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap();
        assert!(id.is_some());

        let pending = fetch_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, "pending");
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(pending[0].recipient, "alice");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_insert_is_noop() {
        let (db, _dir) = setup_db().await;

        let first = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap();
        assert!(second.is_none());

        let pending = fetch_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_insert_preserves_delivered_status() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap()
            .unwrap();
        mark_delivered(&db, id).await.unwrap();

        // Re-running the same discovery pass must not resurrect the row.
        let second = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap();
        assert!(second.is_none());

        let row = get(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, "delivered");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_work_different_recipients_both_insert() {
        let (db, _dir) = setup_db().await;

        assert!(
            insert(&db, new_row("weekly-report:alice", "100"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            insert(&db, new_row("weekly-report:bob", "200"))
                .await
                .unwrap()
                .is_some()
        );

        let pending = fetch_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_retries_until_max_attempts() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap()
            .unwrap();

        // max_attempts = 3: two failures keep the row pending.
        mark_failed(&db, id).await.unwrap();
        mark_failed(&db, id).await.unwrap();
        let row = get(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.attempts, 2);

        // Third failure is permanent.
        mark_failed(&db, id).await.unwrap();
        let row = get(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, "failed");
        assert_eq!(row.attempts, 3);

        // Permanently failed rows are no longer fetched.
        let pending = fetch_pending(&db, 10).await.unwrap();
        assert!(pending.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_permanent_skips_retries() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, new_row("weekly-report:alice", "100"))
            .await
            .unwrap()
            .unwrap();
        mark_failed_permanent(&db, id).await.unwrap();

        let row = get(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, "failed");
        assert!(fetch_pending(&db, 10).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_pending_respects_limit_and_order() {
        let (db, _dir) = setup_db().await;

        for i in 0..5 {
            insert(&db, new_row(&format!("job:{i}"), &format!("{i}")))
                .await
                .unwrap();
        }

        let batch = fetch_pending(&db, 3).await.unwrap();
        assert_eq!(batch.len(), 3);
        // Oldest first.
        assert!(batch[0].id < batch[1].id && batch[1].id < batch[2].id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_counts_groups_rows() {
        let (db, _dir) = setup_db().await;

        let a = insert(&db, new_row("j:a", "1")).await.unwrap().unwrap();
        let b = insert(&db, new_row("j:b", "2")).await.unwrap().unwrap();
        insert(&db, new_row("j:c", "3")).await.unwrap().unwrap();

        mark_delivered(&db, a).await.unwrap();
        mark_failed_permanent(&db, b).await.unwrap();

        let counts = status_counts(&db).await.unwrap();
        assert_eq!(counts.delivered, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 1);

        db.close().await.unwrap();
    }
}
