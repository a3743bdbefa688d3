// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./beacon.toml` > `~/.config/beacon/beacon.toml` > `/etc/beacon/beacon.toml`
//! with environment variable overrides via `BEACON_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BeaconConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/beacon/beacon.toml` (system-wide)
/// 3. `~/.config/beacon/beacon.toml` (user XDG config)
/// 4. `./beacon.toml` (local directory)
/// 5. `BEACON_*` environment variables
pub fn load_config() -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file("/etc/beacon/beacon.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("beacon/beacon.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("beacon.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BEACON_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("BEACON_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BEACON_STALL_AWAITING_THRESHOLD_SECS -> "stall_awaiting_threshold_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("stall_", "stall.", 1)
            .replacen("notify_", "notify.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_config_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[agent]
name = "relay-1"

[stall]
awaiting_threshold_secs = 60
stalled_threshold_secs = 120
"#,
        )
        .unwrap();
        assert_eq!(config.agent.name, "relay-1");
        assert_eq!(config.stall.awaiting_threshold_secs, 60);
        // Unspecified sections keep defaults.
        assert_eq!(config.notify.max_attempts, 3);
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "beacon");
    }
}
