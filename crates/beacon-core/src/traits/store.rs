// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence trait.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::types::SessionRecord;

/// Persistence boundary for session rows.
///
/// The coordinator writes through this on every transition; the status
/// relay and the `status` CLI read through it to resolve origin bindings
/// and show operator state.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a newly accepted session.
    async fn create_session(&self, record: &SessionRecord) -> Result<(), BeaconError>;

    /// Fetch one session by id.
    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, BeaconError>;

    /// List sessions, optionally filtered by status.
    async fn list_sessions(&self, status: Option<&str>) -> Result<Vec<SessionRecord>, BeaconError>;

    /// Update a session's status and last-activity instant.
    async fn update_session_status(
        &self,
        id: &str,
        status: &str,
        last_activity_at: Option<&str>,
    ) -> Result<(), BeaconError>;

    /// Store per-surface metadata for a session (e.g. the message id an
    /// edit-in-place surface must keep editing across restarts).
    async fn set_surface_metadata(
        &self,
        id: &str,
        surface: &str,
        metadata: &str,
    ) -> Result<(), BeaconError>;

    /// Fetch per-surface metadata for a session.
    async fn get_surface_metadata(
        &self,
        id: &str,
        surface: &str,
    ) -> Result<Option<String>, BeaconError>;
}
