// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon serve` command implementation.
//!
//! Starts the daemon core: SQLite storage, the session coordinator with
//! stall detection, the surface broadcast multiplexer with its status
//! relay, and the notification delivery worker. Presentation surfaces and
//! channel senders are provided by integration crates that register
//! against the running core; the core itself stays honest without them
//! (events flow on the bus, outbox rows wait for a worker with senders).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use beacon_agent::{SessionCoordinator, StatusBus, SurfaceMultiplexer, relay, shutdown};
use beacon_config::model::BeaconConfig;
use beacon_core::BeaconError;
use beacon_core::traits::store::SessionStore;
use beacon_core::traits::surface::SurfaceAdapter;
use beacon_core::traits::sender::NotificationSender;
use beacon_notify::NotificationWorker;
use beacon_storage::SqliteStorage;

/// Everything `serve` assembles before parking on the shutdown signal.
///
/// Split out so integration code (and the e2e tests) can build the same
/// stack, attach surfaces and senders, and drive it directly.
pub struct DaemonCore {
    pub storage: Arc<SqliteStorage>,
    pub coordinator: Arc<SessionCoordinator>,
    pub multiplexer: Arc<SurfaceMultiplexer>,
    pub worker: NotificationWorker,
}

/// Build the daemon core from a validated config.
///
/// Opens storage (running migrations), marks sessions left non-terminal by
/// a previous run as errored, and wires coordinator, multiplexer, and
/// worker together. No background task is spawned yet.
pub async fn build_core(config: &BeaconConfig) -> Result<DaemonCore, BeaconError> {
    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);

    let coordinator = Arc::new(SessionCoordinator::new(
        storage.clone() as Arc<dyn SessionStore>,
        StatusBus::new(),
        config.stall.clone(),
    ));
    coordinator.recover_interrupted().await;

    let multiplexer = Arc::new(SurfaceMultiplexer::new());
    let db = Arc::new(storage.database().clone());
    let worker = NotificationWorker::new(db, config.notify.clone());

    Ok(DaemonCore {
        storage,
        coordinator,
        multiplexer,
        worker,
    })
}

/// Spawn the daemon's background tasks and run until cancelled.
pub async fn run_core(
    core: DaemonCore,
    surfaces: Vec<Arc<dyn SurfaceAdapter>>,
    senders: Vec<Arc<dyn NotificationSender>>,
    cancel: CancellationToken,
) -> Result<(), BeaconError> {
    let DaemonCore {
        storage,
        coordinator,
        multiplexer,
        mut worker,
    } = core;

    for surface in surfaces {
        multiplexer.attach(surface).await;
    }
    if multiplexer.surface_count().await == 0 {
        warn!("no surfaces attached; status events will reach the bus only");
    }

    // Relay: coordinator bus -> every attached presentation surface.
    let relay_handle = tokio::spawn(relay::run_status_relay(
        multiplexer.clone(),
        storage.clone() as Arc<dyn SessionStore>,
        coordinator.bus().subscribe(),
        cancel.clone(),
    ));

    // Worker: drain the outbox, but only with at least one sender -- with
    // none, every row would burn its attempts on "unsupported channel".
    let sender_count = senders.len();
    let worker_handle = if sender_count > 0 {
        for sender in senders {
            worker.register_sender(sender);
        }
        let worker_cancel = cancel.clone();
        Some(tokio::spawn(async move { worker.run(worker_cancel).await }))
    } else {
        warn!("no channel senders registered; notification worker not started");
        None
    };

    info!("beacon core running");
    cancel.cancelled().await;

    // Timers first, then the background loops, then storage.
    coordinator.shutdown().await;
    if let Err(e) = relay_handle.await {
        warn!(error = %e, "status relay task join failed");
    }
    if let Some(handle) = worker_handle
        && let Err(e) = handle.await
    {
        warn!(error = %e, "notification worker task join failed");
    }
    storage.close().await?;

    info!("beacon core stopped");
    Ok(())
}

/// Run the `beacon serve` command until SIGINT/SIGTERM.
pub async fn run_serve(config: BeaconConfig) -> Result<(), BeaconError> {
    info!(agent = config.agent.name.as_str(), "starting beacon serve");

    let core = build_core(&config).await?;
    let cancel = shutdown::install_signal_handler();
    run_core(core, Vec::new(), Vec::new(), cancel).await?;

    info!("beacon serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("beacon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
