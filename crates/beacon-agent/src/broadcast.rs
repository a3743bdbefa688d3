// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Surface broadcast multiplexer.
//!
//! Classifies every outbound operation into origin-only or
//! broadcast-to-all-presentation-surfaces. The origin surface is sent
//! first and fully awaited -- its failure is the caller's failure. The
//! remaining presentation surfaces fan out concurrently with per-surface
//! error isolation: one slow or broken observer never delays the origin
//! send nor its sibling observers. Transport-only surfaces are never
//! broadcast targets.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use beacon_core::BeaconError;
use beacon_core::traits::surface::SurfaceAdapter;
use beacon_core::types::{
    DeliveryReceipt, DeliveryScope, SessionRoute, SurfaceKind, SurfaceOperation,
};

use crate::registry::{SurfaceEntry, SurfaceRegistry};

/// Fan-out layer over every attached surface.
pub struct SurfaceMultiplexer {
    registry: RwLock<SurfaceRegistry>,
}

impl SurfaceMultiplexer {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(SurfaceRegistry::new()),
        }
    }

    /// Attach a surface; its presentation/transport flag is captured now.
    pub async fn attach(&self, surface: Arc<dyn SurfaceAdapter>) {
        let name = surface.name().to_string();
        let kind = surface.kind();
        self.registry.write().await.attach(surface);
        info!(surface = name.as_str(), kind = %kind, "surface attached");
    }

    /// Detach a surface by name.
    pub async fn detach(&self, name: &str) -> bool {
        let removed = self.registry.write().await.detach(name);
        if removed {
            info!(surface = name, "surface detached");
        }
        removed
    }

    /// Number of attached surfaces.
    pub async fn surface_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Route an operation per its classification.
    pub async fn dispatch(
        &self,
        route: &SessionRoute,
        op: &SurfaceOperation,
    ) -> Result<DeliveryReceipt, BeaconError> {
        match op.scope() {
            DeliveryScope::Broadcast => self.broadcast(route, op).await,
            DeliveryScope::OriginOnly => self.send_to_origin(route, op).await,
        }
    }

    /// Send to the origin surface, then fan out to every other attached
    /// *presentation* surface concurrently.
    ///
    /// Returns the origin's receipt; an origin failure propagates to the
    /// caller. Observer failures are warn-logged and isolated. The origin
    /// is skipped in the observer loop (it already received the
    /// operation), as are disconnected surfaces, surfaces that cannot
    /// render the operation, and transport-only surfaces.
    pub async fn broadcast(
        &self,
        route: &SessionRoute,
        op: &SurfaceOperation,
    ) -> Result<DeliveryReceipt, BeaconError> {
        let snapshot = { self.registry.read().await.snapshot() };

        let receipt = self.deliver_to_origin(&snapshot, route, op).await?;

        let observers: Vec<&SurfaceEntry> = snapshot
            .iter()
            .filter(|entry| {
                entry.name != route.origin_surface
                    && entry.kind == SurfaceKind::Presentation
                    && entry.surface.is_connected()
                    && entry.surface.capabilities().can_render(op)
            })
            .collect();

        let results = join_all(observers.iter().map(|entry| async move {
            (entry.name.as_str(), entry.surface.deliver(op).await)
        }))
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                warn!(
                    surface = name,
                    session_id = route.session_id.as_str(),
                    error = %e,
                    "observer broadcast failed"
                );
            }
        }

        Ok(receipt)
    }

    /// Send to the origin surface only; observers never see the operation.
    pub async fn send_to_origin(
        &self,
        route: &SessionRoute,
        op: &SurfaceOperation,
    ) -> Result<DeliveryReceipt, BeaconError> {
        let snapshot = { self.registry.read().await.snapshot() };
        self.deliver_to_origin(&snapshot, route, op).await
    }

    async fn deliver_to_origin(
        &self,
        snapshot: &[SurfaceEntry],
        route: &SessionRoute,
        op: &SurfaceOperation,
    ) -> Result<DeliveryReceipt, BeaconError> {
        let origin = snapshot
            .iter()
            .find(|entry| entry.name == route.origin_surface)
            .ok_or_else(|| BeaconError::SurfaceNotAttached {
                name: route.origin_surface.clone(),
            })?;

        if !origin.surface.capabilities().can_render(op) {
            // The origin platform cannot express this operation; skipping is
            // truthful where fabricating a rendering would not be.
            debug!(
                surface = origin.name.as_str(),
                session_id = route.session_id.as_str(),
                "origin surface cannot render operation, skipped"
            );
            return Ok(DeliveryReceipt {
                surface: origin.name.clone(),
                message_id: None,
            });
        }

        origin.surface.deliver(op).await
    }
}

impl Default for SurfaceMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}
