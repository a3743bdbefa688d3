// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across trait boundaries in the Beacon daemon.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::status::CanonicalStatusEvent;

/// Unique identifier for a message delivered to a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by surface health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Surface is fully operational.
    Healthy,
    /// Surface is operational but experiencing issues.
    Degraded(String),
    /// Surface is not operational.
    Unhealthy(String),
}

/// Capability flag separating broadcast targets from pure message buses.
///
/// Captured once at registration time; the multiplexer never infers it
/// from the surface name at call time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Renders to a human; eligible for broadcast fan-out.
    Presentation,
    /// Pure message-bus binding; never a broadcast target.
    Transport,
}

/// Delivery channel for outbox notifications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Telegram,
    Discord,
    Email,
}

/// Capabilities reported by a presentation surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCapabilities {
    /// Can render canonical status events (status line, footer, banner...).
    pub renders_status: bool,
    /// Can edit an already-sent message in place.
    pub supports_edit: bool,
    /// Can receive file payloads.
    pub supports_files: bool,
    /// Can reflect channel create/rename/edit/delete operations.
    pub supports_channel_lifecycle: bool,
    /// Maximum rendered message length, if the platform imposes one.
    pub max_message_length: Option<usize>,
}

impl SurfaceCapabilities {
    /// Whether a surface with these capabilities can render the operation.
    ///
    /// An incapable surface is skipped during fan-out, not failed.
    pub fn can_render(&self, op: &SurfaceOperation) -> bool {
        match op {
            SurfaceOperation::Message { .. } | SurfaceOperation::Ephemeral { .. } => true,
            SurfaceOperation::Status(_) => self.renders_status,
            SurfaceOperation::ChannelLifecycle { .. } => self.supports_channel_lifecycle,
            SurfaceOperation::FileDelivery { .. } => self.supports_files,
        }
    }
}

/// A channel lifecycle change propagated to presentation surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelChange {
    Created { title: String },
    Renamed { title: String },
    Edited { title: String },
    Deleted,
}

/// Who an outbound operation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryScope {
    /// Origin surface first, then every other presentation surface.
    Broadcast,
    /// Origin surface only; observers never see it.
    OriginOnly,
}

/// An outbound operation dispatched through the surface multiplexer.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOperation {
    /// New message content for a session.
    Message { session_id: String, text: String },
    /// A canonical status update.
    Status(CanonicalStatusEvent),
    /// A session channel was created/renamed/edited/deleted.
    ChannelLifecycle {
        session_id: String,
        change: ChannelChange,
    },
    /// Ambient feedback meant only for the requester.
    Ephemeral { session_id: String, text: String },
    /// A file produced for the requester.
    FileDelivery {
        session_id: String,
        path: String,
        caption: Option<String>,
    },
}

impl SurfaceOperation {
    /// The delivery mode this operation is classified into.
    pub fn scope(&self) -> DeliveryScope {
        match self {
            SurfaceOperation::Message { .. }
            | SurfaceOperation::Status(_)
            | SurfaceOperation::ChannelLifecycle { .. } => DeliveryScope::Broadcast,
            SurfaceOperation::Ephemeral { .. } | SurfaceOperation::FileDelivery { .. } => {
                DeliveryScope::OriginOnly
            }
        }
    }

    /// The session this operation belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SurfaceOperation::Message { session_id, .. }
            | SurfaceOperation::ChannelLifecycle { session_id, .. }
            | SurfaceOperation::Ephemeral { session_id, .. }
            | SurfaceOperation::FileDelivery { session_id, .. } => session_id,
            SurfaceOperation::Status(event) => &event.session_id,
        }
    }
}

/// Result of delivering an operation to one surface.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Name of the surface that accepted the operation.
    pub surface: String,
    /// Platform message id, when the surface produced one.
    pub message_id: Option<MessageId>,
}

/// Routing metadata for one session: identity plus its origin binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRoute {
    pub session_id: String,
    pub origin_surface: String,
}

/// A persisted session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub origin_surface: String,
    pub status: String,
    pub last_activity_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A durable notification outbox row.
///
/// Created by the router, mutated only by the worker, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRow {
    pub id: i64,
    pub source_key: String,
    pub work_name: String,
    pub recipient: String,
    pub recipient_address: String,
    pub delivery_channel: String,
    pub content_ref: Option<String>,
    pub rendered_text: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// A resolved notification recipient: one person, one concrete address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub person: String,
    pub channel: DeliveryChannel,
    pub address: String,
}
