// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `beacon-core::types` for use across
//! trait boundaries. This module re-exports them for convenience within
//! the storage crate.

pub use beacon_core::types::{OutboxRow, SessionRecord};
