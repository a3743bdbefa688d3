// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Beacon session daemon.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use beacon_core::types::DeliveryChannel;

/// Top-level Beacon configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    /// Daemon identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Stall-detection thresholds.
    #[serde(default)]
    pub stall: StallConfig,

    /// Notification outbox and delivery worker settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// People known to the daemon, with roles and subscriptions.
    #[serde(default)]
    pub persons: Vec<PersonConfig>,
}

/// Daemon identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the daemon instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "beacon".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("beacon").join("beacon.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "beacon.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Stall-detection thresholds.
///
/// Both values are operator-tunable. A session with no observed output for
/// `awaiting_threshold_secs` (T1) is reclassified as awaiting output; after
/// `stalled_threshold_secs` (T2) total elapsed it is marked stalled.
/// Validation enforces T1 < T2.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StallConfig {
    /// Seconds of silence before a session is considered awaiting output (T1).
    #[serde(default = "default_awaiting_threshold_secs")]
    pub awaiting_threshold_secs: u64,

    /// Total seconds of silence before a session is considered stalled (T2).
    #[serde(default = "default_stalled_threshold_secs")]
    pub stalled_threshold_secs: u64,
}

impl StallConfig {
    /// T1 as a `Duration`.
    pub fn awaiting_threshold(&self) -> Duration {
        Duration::from_secs(self.awaiting_threshold_secs)
    }

    /// T2 as a `Duration`.
    pub fn stalled_threshold(&self) -> Duration {
        Duration::from_secs(self.stalled_threshold_secs)
    }
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            awaiting_threshold_secs: default_awaiting_threshold_secs(),
            stalled_threshold_secs: default_stalled_threshold_secs(),
        }
    }
}

fn default_awaiting_threshold_secs() -> u64 {
    300
}

fn default_stalled_threshold_secs() -> u64 {
    900
}

/// Notification outbox and delivery worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Seconds between worker drain passes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum outbox rows fetched per drain pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delivery attempts before a row is left permanently failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl NotifyConfig {
    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_batch_size() -> usize {
    25
}

fn default_max_attempts() -> u32 {
    3
}

/// Role of a person, used for system-category notification routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Admin,
    Member,
}

/// One person known to the daemon.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersonConfig {
    /// Unique person name.
    pub name: String,

    /// Role flag; admins are always included in system-category work.
    #[serde(default = "default_role")]
    pub role: PersonRole,

    /// Default notification preference, used when a subscription omits one.
    #[serde(default)]
    pub notification: Option<NotificationPrefConfig>,

    /// Subscriptions owned by this person.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
}

fn default_role() -> PersonRole {
    PersonRole::Member
}

/// Discriminated subscription kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    /// Results of one named unit of work.
    Job,
    /// A recurring content feed.
    Feed,
    /// Explicit opt-in to system-category notifications.
    System,
}

/// One subscription entry.
///
/// Disabled subscriptions stay in the config but are invisible to both
/// execution-triggering and delivery logic; they are filtered at read time,
/// never deleted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionConfig {
    /// What this subscription is for.
    pub kind: SubscriptionKind,

    /// Unit-of-work name, required for `job` subscriptions.
    #[serde(default)]
    pub job: Option<String>,

    /// Whether this subscription is active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Where to deliver results; falls back to the person's default.
    #[serde(default)]
    pub notification: Option<NotificationPrefConfig>,
}

fn default_enabled() -> bool {
    true
}

/// A concrete delivery preference: channel plus address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationPrefConfig {
    /// Preferred delivery channel.
    pub channel: DeliveryChannel,

    /// Channel-specific address (chat id, e-mail address, ...).
    pub address: String,
}
