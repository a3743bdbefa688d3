// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Beacon session daemon.
//!
//! Sessions, per-surface session metadata, the notification outbox, and
//! notification watermarks all live in one SQLite database. Writes are
//! serialized through tokio-rusqlite's background thread; schema changes
//! are embedded refinery migrations run on open.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
