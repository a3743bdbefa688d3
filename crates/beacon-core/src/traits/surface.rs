// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Surface adapter trait for presentation and transport integrations
//! (web UI, terminal UI, chat bots, message buses).

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::types::{
    DeliveryReceipt, HealthStatus, SurfaceCapabilities, SurfaceKind, SurfaceOperation,
};

/// A surface attached to the daemon.
///
/// Presentation surfaces render sessions to a human and are broadcast
/// targets; transport surfaces are pure message-bus bindings and only ever
/// receive origin-addressed traffic. The distinction is reported once via
/// [`kind`](SurfaceAdapter::kind) and recorded at registration.
#[async_trait]
pub trait SurfaceAdapter: Send + Sync + 'static {
    /// Human-readable name of this surface instance; used as its registry key.
    fn name(&self) -> &str;

    /// Semantic version of this surface implementation.
    fn version(&self) -> semver::Version;

    /// Whether this surface renders to a human or is transport-only.
    fn kind(&self) -> SurfaceKind;

    /// The operations this surface can render.
    ///
    /// A surface must report what the platform can truthfully sustain --
    /// a read-receipt-only platform does not claim status rendering it
    /// would have to fabricate.
    fn capabilities(&self) -> SurfaceCapabilities;

    /// Whether the surface currently holds a live connection.
    ///
    /// Disconnected surfaces are skipped during fan-out, not failed.
    fn is_connected(&self) -> bool;

    /// Deliver one outbound operation to this surface.
    async fn deliver(&self, op: &SurfaceOperation) -> Result<DeliveryReceipt, BeaconError>;

    /// Performs a health check and returns the surface's current status.
    async fn health_check(&self) -> Result<HealthStatus, BeaconError>;

    /// Gracefully shuts down the surface, releasing any held resources.
    async fn shutdown(&self) -> Result<(), BeaconError>;
}
