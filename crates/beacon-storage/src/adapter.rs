// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `SessionStore` implementation backed by SQLite.

use async_trait::async_trait;

use beacon_config::model::StorageConfig;
use beacon_core::BeaconError;
use beacon_core::traits::store::SessionStore;
use beacon_core::types::SessionRecord;

use crate::database::Database;
use crate::queries::sessions;

/// SQLite-backed session store.
///
/// Owns the shared [`Database`] handle; the notification subsystem reuses
/// the same handle via [`database`](SqliteStorage::database).
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Open the database per the storage config and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BeaconError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Close the underlying database.
    pub async fn close(&self) -> Result<(), BeaconError> {
        self.db.close().await
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn create_session(&self, record: &SessionRecord) -> Result<(), BeaconError> {
        sessions::create_session(&self.db, record).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, BeaconError> {
        sessions::get_session(&self.db, id).await
    }

    async fn list_sessions(&self, status: Option<&str>) -> Result<Vec<SessionRecord>, BeaconError> {
        sessions::list_sessions(&self.db, status).await
    }

    async fn update_session_status(
        &self,
        id: &str,
        status: &str,
        last_activity_at: Option<&str>,
    ) -> Result<(), BeaconError> {
        sessions::update_session_status(&self.db, id, status, last_activity_at).await
    }

    async fn set_surface_metadata(
        &self,
        id: &str,
        surface: &str,
        metadata: &str,
    ) -> Result<(), BeaconError> {
        sessions::set_surface_metadata(&self.db, id, surface, metadata).await
    }

    async fn get_surface_metadata(
        &self,
        id: &str,
        surface: &str,
    ) -> Result<Option<String>, BeaconError> {
        sessions::get_surface_metadata(&self.db, id, surface).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn adapter_roundtrips_through_trait() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = SqliteStorage::open(&config).await.unwrap();
        let store: &dyn SessionStore = &storage;

        let record = SessionRecord {
            id: "s1".to_string(),
            origin_surface: "web".to_string(),
            status: "accepted".to_string(),
            last_activity_at: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        store.create_session(&record).await.unwrap();

        let got = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(got.origin_surface, "web");

        store
            .update_session_status("s1", "completed", None)
            .await
            .unwrap();
        let got = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(got.status, "completed");

        storage.close().await.unwrap();
    }
}
