// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Beacon session daemon.
//!
//! This crate provides the foundational trait definitions, error types,
//! common types, and the canonical status contract used throughout the
//! Beacon workspace. Every status emission in the daemon flows through
//! [`status::validate_and_build`].

pub mod error;
pub mod status;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BeaconError;
pub use status::{CanonicalStatusEvent, SessionStatus, StatusCandidate};
pub use types::{DeliveryChannel, HealthStatus, MessageId, SurfaceKind};

// Re-export all traits at crate root.
pub use traits::{NotificationSender, SessionStore, SurfaceAdapter};
