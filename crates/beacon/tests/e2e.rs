// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Beacon pipeline.
//!
//! Each test assembles the daemon stack against a temp SQLite database
//! with mock surfaces and mock senders, then drives it the way external
//! triggers would: accept/observe/stop for the status path, discover +
//! enqueue + drain for the notification path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use beacon_agent::{SessionCoordinator, StatusBus, SurfaceMultiplexer, relay};
use beacon_config::load_and_validate_str;
use beacon_config::model::{BeaconConfig, StallConfig, StorageConfig};
use beacon_core::SessionStatus;
use beacon_core::traits::store::SessionStore;
use beacon_core::types::{DeliveryChannel, SurfaceOperation};
use beacon_notify::{NotificationRouter, NotificationWorker, RenderedPayload, SubscriptionDirectory, WorkCategory};
use beacon_storage::queries::outbox;
use beacon_storage::{Database, SqliteStorage};
use beacon_test_utils::{MockSender, MockSurface};

struct Stack {
    storage: Arc<SqliteStorage>,
    coordinator: Arc<SessionCoordinator>,
    multiplexer: Arc<SurfaceMultiplexer>,
    cancel: CancellationToken,
    relay: tokio::task::JoinHandle<()>,
    _dir: tempfile::TempDir,
}

/// Build storage + coordinator + multiplexer + relay on a temp database.
///
/// Stall thresholds are set high so no timer interferes with these tests;
/// timer behavior is covered by the coordinator's paused-clock tests.
async fn stack() -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let storage_config = StorageConfig {
        database_path: dir.path().join("e2e.db").to_string_lossy().to_string(),
        wal_mode: true,
    };
    let storage = Arc::new(SqliteStorage::open(&storage_config).await.unwrap());

    let coordinator = Arc::new(SessionCoordinator::new(
        storage.clone() as Arc<dyn SessionStore>,
        StatusBus::new(),
        StallConfig {
            awaiting_threshold_secs: 300,
            stalled_threshold_secs: 900,
        },
    ));

    let multiplexer = Arc::new(SurfaceMultiplexer::new());
    let cancel = CancellationToken::new();
    let relay = tokio::spawn(relay::run_status_relay(
        multiplexer.clone(),
        storage.clone() as Arc<dyn SessionStore>,
        coordinator.bus().subscribe(),
        cancel.clone(),
    ));

    Stack {
        storage,
        coordinator,
        multiplexer,
        cancel,
        relay,
        _dir: dir,
    }
}

impl Stack {
    async fn teardown(self) {
        self.cancel.cancel();
        self.relay.await.unwrap();
        self.coordinator.shutdown().await;
        self.storage.close().await.unwrap();
    }
}

fn statuses(ops: &[SurfaceOperation]) -> Vec<SessionStatus> {
    ops.iter()
        .filter_map(|op| match op {
            SurfaceOperation::Status(event) => Some(event.status),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn status_lifecycle_reaches_every_presentation_surface() {
    let stack = stack().await;
    let origin = Arc::new(MockSurface::presentation("web"));
    let observer = Arc::new(MockSurface::presentation("telegram"));
    let bus_binding = Arc::new(MockSurface::transport("nats"));
    stack.multiplexer.attach(origin.clone()).await;
    stack.multiplexer.attach(observer.clone()).await;
    stack.multiplexer.attach(bus_binding.clone()).await;

    stack.coordinator.accept("sess-1", "web").await;
    stack.coordinator.observe_output("sess-1").await;
    stack.coordinator.stop("sess-1").await;

    // accepted, active_output, completed on both presentation surfaces.
    origin.wait_for_deliveries(3).await;
    observer.wait_for_deliveries(3).await;

    let expected = vec![
        SessionStatus::Accepted,
        SessionStatus::ActiveOutput,
        SessionStatus::Completed,
    ];
    assert_eq!(statuses(&origin.delivered_ops().await), expected);
    assert_eq!(statuses(&observer.delivered_ops().await), expected);

    // Transport bindings never see broadcasts.
    assert_eq!(bus_binding.delivered_count().await, 0);

    // The terminal status is persisted with its origin binding intact.
    let record = stack.storage.get_session("sess-1").await.unwrap().unwrap();
    assert_eq!(record.status, "completed");
    assert_eq!(record.origin_surface, "web");

    stack.teardown().await;
}

#[tokio::test]
async fn failing_observer_never_blocks_origin_rendering() {
    let stack = stack().await;
    let origin = Arc::new(MockSurface::presentation("web"));
    let broken = Arc::new(MockSurface::presentation("telegram"));
    broken.fail_next_deliveries(100).await;
    stack.multiplexer.attach(origin.clone()).await;
    stack.multiplexer.attach(broken.clone()).await;

    stack.coordinator.accept("sess-1", "web").await;
    stack.coordinator.fail("sess-1", "provider_crashed").await;

    origin.wait_for_deliveries(2).await;
    let rendered = statuses(&origin.delivered_ops().await);
    assert_eq!(rendered, vec![SessionStatus::Accepted, SessionStatus::Error]);

    stack.teardown().await;
}

#[tokio::test]
async fn notification_pipeline_discover_enqueue_drain() {
    let config: BeaconConfig = load_and_validate_str(
        r#"
[[persons]]
name = "alice"
role = "admin"

[persons.notification]
channel = "telegram"
address = "100"

[[persons.subscriptions]]
kind = "job"
job = "weekly-report"

[[persons]]
name = "bob"

[[persons.subscriptions]]
kind = "job"
job = "weekly-report"

[persons.subscriptions.notification]
channel = "email"
address = "bob@example.com"

[[persons]]
name = "carol"

[[persons.subscriptions]]
kind = "job"
job = "weekly-report"
enabled = false

[persons.subscriptions.notification]
channel = "discord"
address = "300"
"#,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(
        Database::open(dir.path().join("notify.db").to_str().unwrap())
            .await
            .unwrap(),
    );

    let directory = SubscriptionDirectory::new(&config.persons);
    let router = NotificationRouter::new(directory, db.clone(), config.notify.max_attempts);

    // Disabled subscriber is invisible: exactly two recipients.
    let recipients = router.discover_recipients("weekly-report", WorkCategory::Subscription);
    assert_eq!(recipients.len(), 2);

    let payload = RenderedPayload {
        content_ref: Some("reports/2026-03-01.md".to_string()),
        text: "Weekly report finished.".to_string(),
    };
    let inserted = router
        .enqueue("weekly-report", &payload, &recipients)
        .await
        .unwrap();
    assert_eq!(inserted.len(), 2);

    // Second pass of the same unit of work: zero new rows.
    let again = router
        .enqueue("weekly-report", &payload, &recipients)
        .await
        .unwrap();
    assert!(again.is_empty());

    // Drain with both channels registered.
    let telegram = Arc::new(MockSender::new(DeliveryChannel::Telegram));
    let email = Arc::new(MockSender::new(DeliveryChannel::Email));
    let mut worker = NotificationWorker::new(db.clone(), config.notify.clone());
    worker.register_sender(telegram.clone());
    worker.register_sender(email.clone());

    let stats = worker.drain_batch().await.unwrap();
    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.delivered, 2);
    assert_eq!(telegram.sent().await, vec![("100".to_string(), "Weekly report finished.".to_string())]);
    assert_eq!(email.sent_count().await, 1);

    // Mailbox flag: once notified, the same artifact is seen.
    let produced_at = chrono::Utc::now();
    router.mark_notified("weekly-report", produced_at).await.unwrap();
    assert!(
        !router
            .has_unseen_results("weekly-report", produced_at)
            .await
            .unwrap()
    );

    db.close().await.unwrap();
}

#[tokio::test]
async fn one_dead_channel_never_starves_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(
        Database::open(dir.path().join("notify.db").to_str().unwrap())
            .await
            .unwrap(),
    );

    for (person, channel, address) in [
        ("alice", "telegram", "100"),
        ("bob", "email", "bob@example.com"),
        ("mallory", "carrier_pigeon", "coop 7"),
    ] {
        outbox::insert(
            &db,
            outbox::NewOutboxRow {
                source_key: format!("nightly-sync:{person}"),
                work_name: "nightly-sync".to_string(),
                recipient: person.to_string(),
                recipient_address: address.to_string(),
                delivery_channel: channel.to_string(),
                content_ref: None,
                rendered_text: "Nightly sync finished.".to_string(),
                max_attempts: 2,
            },
        )
        .await
        .unwrap()
        .unwrap();
    }

    let telegram = Arc::new(MockSender::new(DeliveryChannel::Telegram));
    let email = Arc::new(MockSender::new(DeliveryChannel::Email));
    email.fail_always();

    let mut worker = NotificationWorker::new(
        db.clone(),
        beacon_config::model::NotifyConfig {
            poll_interval_secs: 1,
            batch_size: 10,
            max_attempts: 2,
        },
    );
    worker.register_sender(telegram.clone());
    worker.register_sender(email);

    // Pass 1: telegram delivers, unknown channel fails permanently, email retries.
    let stats = worker.drain_batch().await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed_permanently, 1);
    assert_eq!(stats.retrying, 1);

    // Pass 2: email burns its last attempt and goes permanent.
    let stats = worker.drain_batch().await.unwrap();
    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.failed_permanently, 1);

    let counts = outbox::status_counts(&db).await.unwrap();
    assert_eq!(counts.delivered, 1);
    assert_eq!(counts.failed, 2);
    assert_eq!(counts.pending, 0);

    db.close().await.unwrap();
}

#[tokio::test]
async fn ephemeral_feedback_stays_on_the_origin_surface() {
    let stack = stack().await;
    let origin = Arc::new(MockSurface::presentation("web"));
    let observer = Arc::new(MockSurface::presentation("telegram"));
    stack.multiplexer.attach(origin.clone()).await;
    stack.multiplexer.attach(observer.clone()).await;

    stack.coordinator.accept("sess-1", "web").await;
    origin.wait_for_deliveries(1).await;
    observer.wait_for_deliveries(1).await;

    let route = beacon_core::types::SessionRoute {
        session_id: "sess-1".to_string(),
        origin_surface: "web".to_string(),
    };
    stack
        .multiplexer
        .dispatch(
            &route,
            &SurfaceOperation::Ephemeral {
                session_id: "sess-1".to_string(),
                text: "running tool...".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(origin.delivered_count().await, 2);
    assert_eq!(observer.delivered_count().await, 1);

    stack.teardown().await;
}

#[tokio::test]
async fn restart_marks_interrupted_sessions_errored() {
    let dir = tempfile::tempdir().unwrap();
    let storage_config = StorageConfig {
        database_path: dir.path().join("e2e.db").to_string_lossy().to_string(),
        wal_mode: true,
    };

    // First run: a session is accepted, then the daemon "crashes".
    {
        let storage = Arc::new(SqliteStorage::open(&storage_config).await.unwrap());
        let coordinator = Arc::new(SessionCoordinator::new(
            storage.clone() as Arc<dyn SessionStore>,
            StatusBus::new(),
            StallConfig {
                awaiting_threshold_secs: 300,
                stalled_threshold_secs: 900,
            },
        ));
        coordinator.accept("sess-1", "web").await;
        coordinator.shutdown().await;
        storage.close().await.unwrap();
    }

    // Second run: recovery marks it errored through the normal contract path.
    {
        let storage = Arc::new(SqliteStorage::open(&storage_config).await.unwrap());
        let bus = StatusBus::new();
        let mut rx = bus.subscribe();
        let coordinator = Arc::new(SessionCoordinator::new(
            storage.clone() as Arc<dyn SessionStore>,
            bus,
            StallConfig {
                awaiting_threshold_secs: 300,
                stalled_threshold_secs: 900,
            },
        ));
        coordinator.recover_interrupted().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id, "sess-1");
        assert_eq!(event.status, SessionStatus::Error);
        assert_eq!(event.reason, "daemon_restart");

        let record = storage.get_session("sess-1").await.unwrap().unwrap();
        assert_eq!(record.status, "error");
        storage.close().await.unwrap();
    }
}
