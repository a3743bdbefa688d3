// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status relay: bus subscriber that renders every canonical status event
//! on every attached presentation surface.
//!
//! Resolves each event's origin binding from the session store (origin
//! bindings survive restarts and terminal transitions there), then
//! dispatches through the multiplexer. Fail-soft: a session with no
//! resolvable origin, a lagged bus receiver, or an origin send failure is
//! logged and skipped -- the relay loop itself never dies before shutdown.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_core::status::CanonicalStatusEvent;
use beacon_core::traits::store::SessionStore;
use beacon_core::types::{SessionRoute, SurfaceOperation};

use crate::broadcast::SurfaceMultiplexer;

/// Run the relay until the cancellation token fires or the bus closes.
pub async fn run_status_relay(
    mux: Arc<SurfaceMultiplexer>,
    store: Arc<dyn SessionStore>,
    mut rx: broadcast::Receiver<CanonicalStatusEvent>,
    cancel: CancellationToken,
) {
    info!("status relay running");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("status relay shutting down");
                break;
            }
            received = rx.recv() => match received {
                Ok(event) => relay_event(&mux, store.as_ref(), event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "status relay lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("status bus closed, relay stopping");
                    break;
                }
            }
        }
    }
}

async fn relay_event(
    mux: &SurfaceMultiplexer,
    store: &dyn SessionStore,
    event: CanonicalStatusEvent,
) {
    let origin_surface = match store.get_session(&event.session_id).await {
        Ok(Some(record)) => record.origin_surface,
        Ok(None) => {
            warn!(
                session_id = event.session_id.as_str(),
                "no origin binding for status event, skipping fan-out"
            );
            return;
        }
        Err(e) => {
            warn!(
                session_id = event.session_id.as_str(),
                error = %e,
                "failed to resolve origin binding, skipping fan-out"
            );
            return;
        }
    };

    let route = SessionRoute {
        session_id: event.session_id.clone(),
        origin_surface,
    };
    let op = SurfaceOperation::Status(event);
    if let Err(e) = mux.dispatch(&route, &op).await {
        // Origin send failure is the one user-visible path; here the caller
        // is the relay itself, so it surfaces in the log at error level.
        error!(
            session_id = route.session_id.as_str(),
            origin = route.origin_surface.as_str(),
            error = %e,
            "origin status render failed"
        );
    }
}
