// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use beacon_core::BeaconError;
use tracing::debug;

use crate::migrations;

/// A handle to the SQLite database.
///
/// Cheap to clone behind the shared tokio-rusqlite connection; migrations
/// run on open.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled.
    pub async fn open(path: &str) -> Result<Self, BeaconError> {
        Self::open_with_options(path, true).await
    }

    /// Open (or create) the database at `path`.
    ///
    /// Creates parent directories, applies PRAGMAs, and runs all pending
    /// migrations before returning.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, BeaconError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| BeaconError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| BeaconError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(map_rusqlite_err)?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(map_rusqlite_err)?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(map_rusqlite_err)?;
            conn.pragma_update(None, "busy_timeout", 5000)
                .map_err(map_rusqlite_err)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_call_err)?;

        debug!(path = path, wal = wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing the background writer thread.
    pub async fn close(&self) -> Result<(), BeaconError> {
        self.conn.clone().close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the shared storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> BeaconError {
    BeaconError::Storage {
        source: Box::new(e),
    }
}

/// Map a raw rusqlite error into the shared storage error variant.
fn map_rusqlite_err(e: rusqlite::Error) -> BeaconError {
    BeaconError::Storage {
        source: Box::new(e),
    }
}

/// Flatten a `call` error (whose application payload is already a
/// [`BeaconError`]) into the shared storage error variant.
fn map_call_err(e: tokio_rusqlite::Error<BeaconError>) -> BeaconError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => BeaconError::Storage {
            source: Box::new(other),
        },
    }
}
