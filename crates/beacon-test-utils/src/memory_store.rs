// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `SessionStore` for tests that need deterministic timing.
//!
//! Unlike the SQLite store there is no background thread, so paused-clock
//! tokio tests never see spurious auto-advance while waiting on storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::BeaconError;
use beacon_core::traits::store::SessionStore;
use beacon_core::types::SessionRecord;

/// HashMap-backed session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    metadata: Mutex<HashMap<(String, String), String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session row directly, bypassing the trait (test seeding).
    pub async fn seed_session(&self, id: &str, origin_surface: &str, status: &str) {
        self.sessions.lock().await.insert(
            id.to_string(),
            SessionRecord {
                id: id.to_string(),
                origin_surface: origin_surface.to_string(),
                status: status.to_string(),
                last_activity_at: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        );
    }

    /// Fetch a raw record for assertions.
    pub async fn get_record(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<(), BeaconError> {
        self.sessions
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, BeaconError> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn list_sessions(&self, status: Option<&str>) -> Result<Vec<SessionRecord>, BeaconError> {
        let sessions = self.sessions.lock().await;
        let mut records: Vec<SessionRecord> = sessions
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update_session_status(
        &self,
        id: &str,
        status: &str,
        last_activity_at: Option<&str>,
    ) -> Result<(), BeaconError> {
        // Like a SQL UPDATE, a missing row is a silent no-op.
        if let Some(record) = self.sessions.lock().await.get_mut(id) {
            record.status = status.to_string();
            record.last_activity_at = last_activity_at.map(String::from);
        }
        Ok(())
    }

    async fn set_surface_metadata(
        &self,
        id: &str,
        surface: &str,
        metadata: &str,
    ) -> Result<(), BeaconError> {
        self.metadata
            .lock()
            .await
            .insert((id.to_string(), surface.to_string()), metadata.to_string());
        Ok(())
    }

    async fn get_surface_metadata(
        &self,
        id: &str,
        surface: &str,
    ) -> Result<Option<String>, BeaconError> {
        Ok(self
            .metadata
            .lock()
            .await
            .get(&(id.to_string(), surface.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_through_trait() {
        let store = MemorySessionStore::new();
        store.seed_session("s1", "web", "accepted").await;

        let record = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(record.origin_surface, "web");

        store
            .update_session_status("s1", "stalled", Some("2026-01-01T00:05:00.000Z"))
            .await
            .unwrap();
        let record = store.get_record("s1").await.unwrap();
        assert_eq!(record.status, "stalled");

        let stalled = store.list_sessions(Some("stalled")).await.unwrap();
        assert_eq!(stalled.len(), 1);

        store
            .set_surface_metadata("s1", "telegram", r#"{"mid":"7"}"#)
            .await
            .unwrap();
        assert!(
            store
                .get_surface_metadata("s1", "telegram")
                .await
                .unwrap()
                .is_some()
        );
    }
}
