// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Beacon session daemon.

use thiserror::Error;

/// The primary error type used across all Beacon traits and core operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Status contract violations (unknown status value, missing required field).
    ///
    /// Always a bug in the caller: the event is dropped, never partially emitted.
    #[error("status contract violation: {reason}")]
    Contract { reason: String },

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Presentation surface errors (send failure, render failure, disconnect).
    #[error("surface error: {message}")]
    Surface {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested surface is not attached to the registry.
    #[error("surface not attached: {name}")]
    SurfaceNotAttached { name: String },

    /// Notification delivery errors (unreachable channel, invalid address).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
