// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock surface adapter for deterministic testing.
//!
//! `MockSurface` implements `SurfaceAdapter` with captured deliveries for
//! assertion, injectable failures, and a toggleable connection flag.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use beacon_core::BeaconError;
use beacon_core::traits::surface::SurfaceAdapter;
use beacon_core::types::{
    DeliveryReceipt, HealthStatus, MessageId, SurfaceCapabilities, SurfaceKind, SurfaceOperation,
};

/// A mock presentation or transport surface.
///
/// Deliveries are captured in order and retrievable via
/// [`delivered_ops`](MockSurface::delivered_ops); failures can be injected
/// with [`fail_next_deliveries`](MockSurface::fail_next_deliveries).
pub struct MockSurface {
    name: String,
    kind: SurfaceKind,
    capabilities: SurfaceCapabilities,
    connected: AtomicBool,
    delivered: Mutex<Vec<SurfaceOperation>>,
    fail_remaining: Mutex<u32>,
    notify: Notify,
}

impl MockSurface {
    /// A connected presentation surface with full capabilities.
    pub fn presentation(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SurfaceKind::Presentation,
            capabilities: SurfaceCapabilities {
                renders_status: true,
                supports_edit: true,
                supports_files: true,
                supports_channel_lifecycle: true,
                max_message_length: None,
            },
            connected: AtomicBool::new(true),
            delivered: Mutex::new(Vec::new()),
            fail_remaining: Mutex::new(0),
            notify: Notify::new(),
        }
    }

    /// A connected transport-only surface (never a broadcast target).
    pub fn transport(name: &str) -> Self {
        Self {
            kind: SurfaceKind::Transport,
            ..Self::presentation(name)
        }
    }

    /// Drop status-rendering capability (read-receipt-style platform).
    pub fn without_status_rendering(mut self) -> Self {
        self.capabilities.renders_status = false;
        self
    }

    /// Make the next `n` deliveries fail.
    pub async fn fail_next_deliveries(&self, n: u32) {
        *self.fail_remaining.lock().await = n;
    }

    /// Toggle the connection flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of successful deliveries so far.
    pub async fn delivered_count(&self) -> usize {
        self.delivered.lock().await.len()
    }

    /// All successfully delivered operations, in order.
    pub async fn delivered_ops(&self) -> Vec<SurfaceOperation> {
        self.delivered.lock().await.clone()
    }

    /// Wait until at least `n` deliveries have been captured.
    pub async fn wait_for_deliveries(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.delivered.lock().await.len() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl SurfaceAdapter for MockSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn deliver(&self, op: &SurfaceOperation) -> Result<DeliveryReceipt, BeaconError> {
        {
            let mut fail_remaining = self.fail_remaining.lock().await;
            if *fail_remaining > 0 {
                *fail_remaining -= 1;
                return Err(BeaconError::Surface {
                    message: format!("injected delivery failure on {}", self.name),
                    source: None,
                });
            }
        }

        self.delivered.lock().await.push(op.clone());
        self.notify.notify_waiters();
        Ok(DeliveryReceipt {
            surface: self.name.clone(),
            message_id: Some(MessageId(format!("mock-{}", uuid::Uuid::new_v4()))),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        if self.is_connected() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("disconnected".to_string()))
        }
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        self.set_connected(false);
        Ok(())
    }
}
