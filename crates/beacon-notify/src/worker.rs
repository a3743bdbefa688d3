// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background delivery worker draining the notification outbox.
//!
//! Each drain pass fetches a bounded batch of pending rows and delivers
//! them concurrently with per-row isolation: one recipient's unreachable
//! channel or invalid address never stops or delays its siblings. Failed
//! rows stay pending for a later pass up to their attempt bound, then are
//! left permanently failed for operator review (`beacon status`). A
//! delivery channel with no registered sender is a permanent failure for
//! that row, not a crash.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_config::model::NotifyConfig;
use beacon_core::BeaconError;
use beacon_core::traits::sender::NotificationSender;
use beacon_core::types::{DeliveryChannel, OutboxRow};
use beacon_storage::Database;
use beacon_storage::queries::outbox;

/// Outcome of one row's delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Delivered,
    Retrying,
    FailedPermanently,
}

/// Totals for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub fetched: usize,
    pub delivered: usize,
    pub retrying: usize,
    pub failed_permanently: usize,
}

/// Drains the outbox and dispatches rows to channel-specific senders.
pub struct NotificationWorker {
    db: Arc<Database>,
    senders: HashMap<DeliveryChannel, Arc<dyn NotificationSender>>,
    config: NotifyConfig,
}

impl NotificationWorker {
    pub fn new(db: Arc<Database>, config: NotifyConfig) -> Self {
        Self {
            db,
            senders: HashMap::new(),
            config,
        }
    }

    /// Register the sender for its delivery channel.
    pub fn register_sender(&mut self, sender: Arc<dyn NotificationSender>) {
        let channel = sender.channel();
        self.senders.insert(channel, sender);
        debug!(channel = %channel, "notification sender registered");
    }

    /// Run drain passes on the poll interval until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "notification worker running"
        );
        let mut interval = tokio::time::interval(self.config.poll_interval());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.drain_batch().await {
                        Ok(stats) if stats.fetched > 0 => {
                            info!(
                                fetched = stats.fetched,
                                delivered = stats.delivered,
                                retrying = stats.retrying,
                                failed = stats.failed_permanently,
                                "outbox batch drained"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "outbox drain pass failed");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("notification worker shutting down");
                    break;
                }
            }
        }
    }

    /// Fetch one bounded batch and deliver every row independently.
    pub async fn drain_batch(&self) -> Result<BatchStats, BeaconError> {
        let rows = outbox::fetch_pending(&self.db, self.config.batch_size).await?;
        let mut stats = BatchStats {
            fetched: rows.len(),
            ..BatchStats::default()
        };
        if rows.is_empty() {
            return Ok(stats);
        }

        let outcomes = join_all(rows.iter().map(|row| self.deliver_row(row))).await;
        for outcome in outcomes {
            match outcome {
                RowOutcome::Delivered => stats.delivered += 1,
                RowOutcome::Retrying => stats.retrying += 1,
                RowOutcome::FailedPermanently => stats.failed_permanently += 1,
            }
        }
        Ok(stats)
    }

    /// Deliver one row. Never propagates: every failure path marks the row
    /// and returns an outcome, so sibling rows are unaffected.
    async fn deliver_row(&self, row: &OutboxRow) -> RowOutcome {
        let Ok(channel) = DeliveryChannel::from_str(&row.delivery_channel) else {
            error!(
                row_id = row.id,
                channel = row.delivery_channel.as_str(),
                "unknown delivery channel, row failed permanently"
            );
            self.mark(row.id, RowOutcome::FailedPermanently).await;
            return RowOutcome::FailedPermanently;
        };

        let Some(sender) = self.senders.get(&channel) else {
            error!(
                row_id = row.id,
                channel = %channel,
                "no sender registered for channel, row failed permanently"
            );
            self.mark(row.id, RowOutcome::FailedPermanently).await;
            return RowOutcome::FailedPermanently;
        };

        match sender.send(&row.recipient_address, &row.rendered_text).await {
            Ok(()) => {
                debug!(
                    row_id = row.id,
                    recipient = row.recipient.as_str(),
                    channel = %channel,
                    "notification delivered"
                );
                self.mark(row.id, RowOutcome::Delivered).await;
                RowOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    row_id = row.id,
                    recipient = row.recipient.as_str(),
                    channel = %channel,
                    attempt = row.attempts + 1,
                    max_attempts = row.max_attempts,
                    error = %e,
                    "notification delivery failed"
                );
                self.mark(row.id, RowOutcome::Retrying).await;
                if row.attempts + 1 >= row.max_attempts {
                    RowOutcome::FailedPermanently
                } else {
                    RowOutcome::Retrying
                }
            }
        }
    }

    /// Apply a row outcome to storage; marking errors are logged, never
    /// propagated into sibling deliveries.
    async fn mark(&self, row_id: i64, outcome: RowOutcome) {
        let result = match outcome {
            RowOutcome::Delivered => outbox::mark_delivered(&self.db, row_id).await,
            RowOutcome::Retrying => outbox::mark_failed(&self.db, row_id).await,
            RowOutcome::FailedPermanently => outbox::mark_failed_permanent(&self.db, row_id).await,
        };
        if let Err(e) = result {
            error!(row_id, error = %e, "failed to update outbox row status");
        }
    }
}
