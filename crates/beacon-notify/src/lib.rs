// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification pipeline for the Beacon daemon.
//!
//! Three pieces: the [`SubscriptionDirectory`] (read-only view over who
//! wants what, where), the [`NotificationRouter`] (recipient discovery and
//! idempotent durable enqueue), and the [`NotificationWorker`] (background
//! drain loop with bounded per-row retry).

pub mod directory;
pub mod router;
pub mod worker;

pub use directory::SubscriptionDirectory;
pub use router::{NotificationRouter, RenderedPayload, WorkCategory};
pub use worker::{BatchStats, NotificationWorker};
