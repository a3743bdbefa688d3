// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon status` command implementation.
//!
//! Operator view over the daemon's database: session counts per lifecycle
//! status and outbox delivery counts, including permanently failed rows
//! awaiting review. Reads the same SQLite file the daemon writes; works
//! whether or not the daemon is currently running.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use serde::Serialize;

use beacon_config::model::BeaconConfig;
use beacon_core::BeaconError;
use beacon_storage::Database;
use beacon_storage::queries::{outbox, sessions};

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database_path: String,
    pub sessions_by_status: BTreeMap<String, usize>,
    pub outbox_pending: i64,
    pub outbox_delivered: i64,
    pub outbox_failed: i64,
}

/// Collect the status report from the database.
pub async fn collect_report(config: &BeaconConfig) -> Result<StatusReport, BeaconError> {
    let db = Database::open_with_options(&config.storage.database_path, config.storage.wal_mode)
        .await?;

    let mut sessions_by_status: BTreeMap<String, usize> = BTreeMap::new();
    for record in sessions::list_sessions(&db, None).await? {
        *sessions_by_status.entry(record.status).or_insert(0) += 1;
    }

    let counts = outbox::status_counts(&db).await?;
    db.close().await?;

    Ok(StatusReport {
        database_path: config.storage.database_path.clone(),
        sessions_by_status,
        outbox_pending: counts.pending,
        outbox_delivered: counts.delivered,
        outbox_failed: counts.failed,
    })
}

/// Run the `beacon status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &BeaconConfig, json: bool, plain: bool) -> Result<(), BeaconError> {
    let report = collect_report(config).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }

    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    println!();
    println!("  beacon status");
    println!("  {}", "-".repeat(35));
    println!("    Database: {}", report.database_path);
    println!();

    if report.sessions_by_status.is_empty() {
        println!("    Sessions: none");
    } else {
        println!("    Sessions:");
        for (status, count) in &report.sessions_by_status {
            println!("      {status:<16} {count}");
        }
    }

    println!();
    println!("    Outbox:");
    println!("      pending          {}", report.outbox_pending);
    println!("      delivered        {}", report.outbox_delivered);
    if report.outbox_failed > 0 && use_color {
        use colored::Colorize;
        println!(
            "      failed           {} {}",
            report.outbox_failed.to_string().red(),
            "(needs review)".red()
        );
    } else if report.outbox_failed > 0 {
        println!(
            "      failed           {} (needs review)",
            report.outbox_failed
        );
    } else {
        println!("      failed           0");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::model::StorageConfig;
    use beacon_core::types::SessionRecord;
    use tempfile::tempdir;

    fn config_for(path: &std::path::Path) -> BeaconConfig {
        BeaconConfig {
            storage: StorageConfig {
                database_path: path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            ..BeaconConfig::default()
        }
    }

    #[tokio::test]
    async fn report_counts_sessions_and_outbox() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let config = config_for(&db_path);

        {
            let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
            for (id, status) in [("s1", "active_output"), ("s2", "active_output"), ("s3", "stalled")] {
                sessions::create_session(
                    &db,
                    &SessionRecord {
                        id: id.to_string(),
                        origin_surface: "web".to_string(),
                        status: status.to_string(),
                        last_activity_at: None,
                        created_at: "2026-01-01T00:00:00.000Z".to_string(),
                        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
                    },
                )
                .await
                .unwrap();
            }
            let id = outbox::insert(
                &db,
                outbox::NewOutboxRow {
                    source_key: "job:alice".to_string(),
                    work_name: "job".to_string(),
                    recipient: "alice".to_string(),
                    recipient_address: "100".to_string(),
                    delivery_channel: "telegram".to_string(),
                    content_ref: None,
                    rendered_text: "x".to_string(),
                    max_attempts: 3,
                },
            )
            .await
            .unwrap()
            .unwrap();
            outbox::mark_failed_permanent(&db, id).await.unwrap();
            db.close().await.unwrap();
        }

        let report = collect_report(&config).await.unwrap();
        assert_eq!(report.sessions_by_status.get("active_output"), Some(&2));
        assert_eq!(report.sessions_by_status.get("stalled"), Some(&1));
        assert_eq!(report.outbox_failed, 1);
        assert_eq!(report.outbox_pending, 0);
    }

    #[tokio::test]
    async fn report_serializes_to_json() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let report = collect_report(&config_for(&db_path)).await.unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outbox_pending\":0"));
        assert!(json.contains("\"sessions_by_status\":{}"));
    }
}
