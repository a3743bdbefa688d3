// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process status event bus.
//!
//! One broadcast channel carries every [`CanonicalStatusEvent`] the
//! coordinator emits. Subscribers (the surface relay, the terminal UI,
//! tests) each get their own receiver; a slow subscriber lags and drops
//! old events rather than blocking the coordinator.

use beacon_core::status::CanonicalStatusEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Default buffered capacity per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Publish side of the status event stream.
#[derive(Clone)]
pub struct StatusBus {
    tx: broadcast::Sender<CanonicalStatusEvent>,
}

impl StatusBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with an explicit per-subscriber capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future status events.
    pub fn subscribe(&self) -> broadcast::Receiver<CanonicalStatusEvent> {
        self.tx.subscribe()
    }

    /// Publish one event; returns the number of subscribers that saw it.
    ///
    /// Publishing with no subscribers is not an error -- the daemon may run
    /// headless.
    pub fn publish(&self, event: CanonicalStatusEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("status event published with no subscribers");
                0
            }
        }
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
