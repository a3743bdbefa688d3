// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sender trait, one implementation per delivery channel.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::types::DeliveryChannel;

/// Sends rendered notification text to one address on one channel.
///
/// Implementations wrap the concrete bot/SMTP clients; the worker only
/// sees this boundary.
#[async_trait]
pub trait NotificationSender: Send + Sync + 'static {
    /// The delivery channel this sender serves.
    fn channel(&self) -> DeliveryChannel;

    /// Deliver rendered text to the given address.
    async fn send(&self, address: &str, rendered_text: &str) -> Result<(), BeaconError>;
}
