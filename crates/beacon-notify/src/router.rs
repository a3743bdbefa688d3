// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification routing: recipient discovery and idempotent outbox enqueue.
//!
//! The router never delivers anything itself. It resolves who should hear
//! about a completed unit of work, writes one durable outbox row per
//! recipient, and leaves delivery to the worker. Re-running the same
//! discovery + enqueue pass is safe: the outbox unique key makes duplicate
//! inserts no-ops.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use beacon_core::BeaconError;
use beacon_core::types::Recipient;
use beacon_storage::Database;
use beacon_storage::queries::{outbox, watermarks};

use crate::directory::SubscriptionDirectory;

/// Category of a completed unit of work, for recipient discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkCategory {
    /// Work someone subscribed to: notify its enabled subscribers.
    Subscription,
    /// System-level work: notify all admins plus enabled opt-ins.
    System,
}

/// Rendered notification content: human text plus an opaque reference to
/// the underlying artifact.
#[derive(Debug, Clone)]
pub struct RenderedPayload {
    pub content_ref: Option<String>,
    pub text: String,
}

/// Resolves recipients and appends durable outbox rows.
pub struct NotificationRouter {
    directory: SubscriptionDirectory,
    db: Arc<Database>,
    max_attempts: u32,
}

impl NotificationRouter {
    pub fn new(directory: SubscriptionDirectory, db: Arc<Database>, max_attempts: u32) -> Self {
        Self {
            directory,
            db,
            max_attempts,
        }
    }

    /// Resolve the recipient list for a unit of work.
    ///
    /// Disabled subscriptions were already filtered by the directory;
    /// results are deduplicated per person.
    pub fn discover_recipients(&self, work_name: &str, category: WorkCategory) -> Vec<Recipient> {
        let recipients = match category {
            WorkCategory::Subscription => self.directory.job_subscribers(work_name),
            WorkCategory::System => self.directory.system_recipients(),
        };
        debug!(
            work_name,
            ?category,
            count = recipients.len(),
            "recipients discovered"
        );
        recipients
    }

    /// Insert one pending outbox row per recipient.
    ///
    /// Idempotent under `(source_key, recipient_address, delivery_channel)`
    /// where the source key is work name + person: a second pass over the
    /// same recipients inserts nothing and leaves existing rows' status and
    /// attempt counts untouched. Returns the ids of rows actually inserted.
    pub async fn enqueue(
        &self,
        work_name: &str,
        payload: &RenderedPayload,
        recipients: &[Recipient],
    ) -> Result<Vec<i64>, BeaconError> {
        let mut inserted = Vec::new();

        for recipient in recipients {
            let source_key = format!("{work_name}:{}", recipient.person);
            let new_row = outbox::NewOutboxRow {
                source_key,
                work_name: work_name.to_string(),
                recipient: recipient.person.clone(),
                recipient_address: recipient.address.clone(),
                delivery_channel: recipient.channel.to_string(),
                content_ref: payload.content_ref.clone(),
                rendered_text: payload.text.clone(),
                max_attempts: self.max_attempts as i32,
            };
            match outbox::insert(&self.db, new_row).await? {
                Some(id) => inserted.push(id),
                None => {
                    debug!(
                        work_name,
                        recipient = recipient.person.as_str(),
                        "outbox row already present, skipped"
                    );
                }
            }
        }

        if !inserted.is_empty() {
            info!(work_name, count = inserted.len(), "notifications enqueued");
        }
        Ok(inserted)
    }

    /// Whether a unit of work has results newer than its last-notified
    /// watermark (mailbox flag).
    ///
    /// Both instants are compared in UTC; an absent watermark means the
    /// results have never been notified and are unseen by definition.
    pub async fn has_unseen_results(
        &self,
        work_name: &str,
        artifact_modified_at: DateTime<Utc>,
    ) -> Result<bool, BeaconError> {
        let watermark = watermarks::last_notified_at(&self.db, work_name).await?;
        let Some(raw) = watermark else {
            return Ok(true);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(last) => Ok(artifact_modified_at > last.with_timezone(&Utc)),
            Err(e) => {
                warn!(work_name, watermark = raw.as_str(), error = %e,
                    "unparseable watermark, treating results as unseen");
                Ok(true)
            }
        }
    }

    /// Advance the last-notified watermark for a unit of work.
    pub async fn mark_notified(
        &self,
        work_name: &str,
        at: DateTime<Utc>,
    ) -> Result<(), BeaconError> {
        watermarks::set_last_notified(
            &self.db,
            work_name,
            &at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::model::{
        NotificationPrefConfig, PersonConfig, PersonRole, SubscriptionConfig, SubscriptionKind,
    };
    use beacon_core::types::DeliveryChannel;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn persons() -> Vec<PersonConfig> {
        vec![
            PersonConfig {
                name: "alice".to_string(),
                role: PersonRole::Admin,
                notification: Some(NotificationPrefConfig {
                    channel: DeliveryChannel::Telegram,
                    address: "100".to_string(),
                }),
                subscriptions: vec![SubscriptionConfig {
                    kind: SubscriptionKind::Job,
                    job: Some("weekly-report".to_string()),
                    enabled: true,
                    notification: None,
                }],
            },
            PersonConfig {
                name: "bob".to_string(),
                role: PersonRole::Member,
                notification: None,
                subscriptions: vec![SubscriptionConfig {
                    kind: SubscriptionKind::Job,
                    job: Some("weekly-report".to_string()),
                    enabled: true,
                    notification: Some(NotificationPrefConfig {
                        channel: DeliveryChannel::Email,
                        address: "bob@example.com".to_string(),
                    }),
                }],
            },
            PersonConfig {
                name: "carol".to_string(),
                role: PersonRole::Member,
                notification: None,
                subscriptions: vec![SubscriptionConfig {
                    kind: SubscriptionKind::Job,
                    job: Some("weekly-report".to_string()),
                    enabled: false,
                    notification: Some(NotificationPrefConfig {
                        channel: DeliveryChannel::Discord,
                        address: "300".to_string(),
                    }),
                }],
            },
        ]
    }

    async fn router() -> (NotificationRouter, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let directory = SubscriptionDirectory::new(&persons());
        (NotificationRouter::new(directory, db, 3), dir)
    }

    fn payload() -> RenderedPayload {
        RenderedPayload {
            content_ref: Some("reports/weekly.md".to_string()),
            text: "Your weekly report is ready.".to_string(),
        }
    }

    #[tokio::test]
    async fn two_enabled_one_disabled_yields_two_recipients() {
        let (router, _dir) = router().await;
        let recipients = router.discover_recipients("weekly-report", WorkCategory::Subscription);
        assert_eq!(recipients.len(), 2);
    }

    #[tokio::test]
    async fn discovery_plus_enqueue_is_idempotent() {
        let (router, _dir) = router().await;

        let recipients = router.discover_recipients("weekly-report", WorkCategory::Subscription);
        let first = router
            .enqueue("weekly-report", &payload(), &recipients)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        // Re-running the same pass inserts zero new rows.
        let recipients = router.discover_recipients("weekly-report", WorkCategory::Subscription);
        let second = router
            .enqueue("weekly-report", &payload(), &recipients)
            .await
            .unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn system_category_reaches_admins() {
        let (router, _dir) = router().await;
        let recipients = router.discover_recipients("backup-failed", WorkCategory::System);
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].person, "alice");
    }

    #[tokio::test]
    async fn unseen_results_follow_the_watermark() {
        let (router, _dir) = router().await;
        let produced_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        // Never notified: unseen by definition.
        assert!(
            router
                .has_unseen_results("weekly-report", produced_at)
                .await
                .unwrap()
        );

        router.mark_notified("weekly-report", produced_at).await.unwrap();
        assert!(
            !router
                .has_unseen_results("weekly-report", produced_at)
                .await
                .unwrap()
        );

        // A newer artifact flips the flag again.
        let newer = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert!(router.has_unseen_results("weekly-report", newer).await.unwrap());
    }
}
