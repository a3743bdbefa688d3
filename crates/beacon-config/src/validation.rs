// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as threshold ordering and resolvable notification
//! addresses.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{BeaconConfig, SubscriptionKind};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BeaconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate stall thresholds: both positive, T1 strictly before T2
    if config.stall.awaiting_threshold_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "stall.awaiting_threshold_secs must be positive".to_string(),
        });
    }
    if config.stall.stalled_threshold_secs <= config.stall.awaiting_threshold_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "stall.stalled_threshold_secs ({}) must be greater than stall.awaiting_threshold_secs ({})",
                config.stall.stalled_threshold_secs, config.stall.awaiting_threshold_secs
            ),
        });
    }

    // Validate worker settings
    if config.notify.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "notify.max_attempts must be at least 1".to_string(),
        });
    }
    if config.notify.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "notify.batch_size must be at least 1".to_string(),
        });
    }

    // Validate person names: non-empty and unique
    let mut seen_names = HashSet::new();
    for (i, person) in config.persons.iter().enumerate() {
        if person.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("persons[{i}].name must not be empty"),
            });
        } else if !seen_names.insert(&person.name) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate person name `{}` in [[persons]] array", person.name),
            });
        }

        if let Some(ref pref) = person.notification
            && pref.address.trim().is_empty()
        {
            errors.push(ConfigError::Validation {
                message: format!("persons[{i}].notification.address must not be empty"),
            });
        }

        for (j, sub) in person.subscriptions.iter().enumerate() {
            // A job subscription without a job name is meaningless.
            if sub.kind == SubscriptionKind::Job
                && sub.job.as_deref().unwrap_or("").trim().is_empty()
            {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "persons[{i}].subscriptions[{j}] has kind `job` but no job name"
                    ),
                });
            }

            // An enabled subscription must resolve a delivery address,
            // either its own or the person's default.
            if sub.enabled {
                let resolved = sub
                    .notification
                    .as_ref()
                    .or(person.notification.as_ref())
                    .map(|p| !p.address.trim().is_empty())
                    .unwrap_or(false);
                if !resolved {
                    errors.push(ConfigError::Validation {
                        message: format!(
                            "persons[{i}].subscriptions[{j}] is enabled but resolves no delivery address"
                        ),
                    });
                }
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
