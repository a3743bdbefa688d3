// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification sender for deterministic testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::BeaconError;
use beacon_core::traits::sender::NotificationSender;
use beacon_core::types::DeliveryChannel;

/// A mock channel sender that captures sends and can inject failures.
pub struct MockSender {
    channel: DeliveryChannel,
    sent: Mutex<Vec<(String, String)>>,
    fail_remaining: Mutex<u32>,
    fail_always: AtomicBool,
}

impl MockSender {
    pub fn new(channel: DeliveryChannel) -> Self {
        Self {
            channel,
            sent: Mutex::new(Vec::new()),
            fail_remaining: Mutex::new(0),
            fail_always: AtomicBool::new(false),
        }
    }

    /// Make the next `n` sends fail.
    pub async fn fail_next_sends(&self, n: u32) {
        *self.fail_remaining.lock().await = n;
    }

    /// Make every send fail (unreachable channel).
    pub fn fail_always(&self) {
        self.fail_always.store(true, Ordering::SeqCst);
    }

    /// All `(address, rendered_text)` pairs sent so far.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl NotificationSender for MockSender {
    fn channel(&self) -> DeliveryChannel {
        self.channel
    }

    async fn send(&self, address: &str, rendered_text: &str) -> Result<(), BeaconError> {
        if self.fail_always.load(Ordering::SeqCst) {
            return Err(BeaconError::Delivery {
                message: format!("injected permanent failure on {}", self.channel),
                source: None,
            });
        }
        {
            let mut fail_remaining = self.fail_remaining.lock().await;
            if *fail_remaining > 0 {
                *fail_remaining -= 1;
                return Err(BeaconError::Delivery {
                    message: format!("injected transient failure on {}", self.channel),
                    source: None,
                });
            }
        }
        self.sent
            .lock()
            .await
            .push((address.to_string(), rendered_text.to_string()));
        Ok(())
    }
}
