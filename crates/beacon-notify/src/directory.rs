// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only view over recipient preferences.
//!
//! Built once from the validated config. Disabled subscriptions are
//! invisible to every query here -- they are filtered at read time, before
//! any routing logic runs, and never deleted from the config.

use std::collections::HashSet;

use tracing::warn;

use beacon_config::model::{PersonConfig, PersonRole, SubscriptionConfig, SubscriptionKind};
use beacon_core::types::Recipient;

/// Directory of persons, roles, and their subscriptions.
pub struct SubscriptionDirectory {
    persons: Vec<PersonConfig>,
}

impl SubscriptionDirectory {
    pub fn new(persons: &[PersonConfig]) -> Self {
        Self {
            persons: persons.to_vec(),
        }
    }

    /// Every enabled job subscriber of the named unit of work, one entry
    /// per person.
    pub fn job_subscribers(&self, work_name: &str) -> Vec<Recipient> {
        let mut seen = HashSet::new();
        let mut recipients = Vec::new();

        for person in &self.persons {
            for sub in enabled_subscriptions(person) {
                let matches = sub.kind == SubscriptionKind::Job
                    && sub.job.as_deref() == Some(work_name);
                if !matches {
                    continue;
                }
                if let Some(recipient) = resolve_recipient(person, Some(sub))
                    && seen.insert(recipient.person.clone())
                {
                    recipients.push(recipient);
                }
            }
        }

        recipients
    }

    /// System-category recipients: the union of all administrators plus
    /// every enabled opt-in subscriber, deduplicated per person. An admin
    /// who also opts in is notified once.
    pub fn system_recipients(&self) -> Vec<Recipient> {
        let mut seen = HashSet::new();
        let mut recipients = Vec::new();

        for person in &self.persons {
            if person.role == PersonRole::Admin
                && let Some(recipient) = resolve_recipient(person, None)
                && seen.insert(recipient.person.clone())
            {
                recipients.push(recipient);
            }
        }

        for person in &self.persons {
            for sub in enabled_subscriptions(person) {
                if sub.kind != SubscriptionKind::System {
                    continue;
                }
                if let Some(recipient) = resolve_recipient(person, Some(sub))
                    && seen.insert(recipient.person.clone())
                {
                    recipients.push(recipient);
                }
            }
        }

        recipients
    }

    /// Names of all administrators.
    pub fn admins(&self) -> Vec<&str> {
        self.persons
            .iter()
            .filter(|p| p.role == PersonRole::Admin)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Only enabled subscriptions are visible past this point.
fn enabled_subscriptions(person: &PersonConfig) -> impl Iterator<Item = &SubscriptionConfig> {
    person.subscriptions.iter().filter(|s| s.enabled)
}

/// Resolve a concrete `(channel, address)` for a person, preferring the
/// subscription's own preference over the person's default.
fn resolve_recipient(
    person: &PersonConfig,
    subscription: Option<&SubscriptionConfig>,
) -> Option<Recipient> {
    let pref = subscription
        .and_then(|s| s.notification.as_ref())
        .or(person.notification.as_ref());
    match pref {
        Some(pref) if !pref.address.trim().is_empty() => Some(Recipient {
            person: person.name.clone(),
            channel: pref.channel,
            address: pref.address.clone(),
        }),
        _ => {
            warn!(
                person = person.name.as_str(),
                "no resolvable delivery address, recipient skipped"
            );
            None
        }
    }
}
