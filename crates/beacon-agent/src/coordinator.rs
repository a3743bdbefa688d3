// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session lifecycle state machine with stall detection.
//!
//! The [`SessionCoordinator`] is the single source of truth for "what is
//! happening right now" in every session. Each public operation updates the
//! in-memory state, cancels/arms stall timers, persists the session row,
//! and publishes a validated status event on the bus -- in that order,
//! under one lock, so per-session transitions are never reordered.
//!
//! Transition table (`completed`, `error`, `closed` are terminal):
//!
//! ```text
//! (start) -> accepted              [accept]
//! accepted -> active_output        [observe_output]
//! accepted -> awaiting_output      [stall timer, T1]
//! awaiting_output -> stalled       [stall timer, T2 total]
//! awaiting_output -> active_output [observe_output]
//! stalled -> active_output         [observe_output]
//! active_output -> awaiting_output [stall timer, T1 after output stops]
//! active_output -> completed       [stop]
//! {accepted, awaiting_output, active_output, stalled} -> error  [fail]
//! {accepted, awaiting_output, active_output, stalled} -> closed [close]
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_config::model::StallConfig;
use beacon_core::status::{self, CanonicalStatusEvent, SessionStatus, StatusCandidate, reason};
use beacon_core::traits::store::SessionStore;
use beacon_core::types::SessionRecord;

use crate::bus::StatusBus;

/// Which transition a stall timer drives when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StallPhase {
    /// T1 elapsed with no output: enter `awaiting_output`.
    Awaiting,
    /// T2 total elapsed, still no output: enter `stalled`.
    Stalled,
}

/// Triggers applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ObserveOutput,
    Stop,
    Fail,
    Close,
    StallToAwaiting,
    StallToStalled,
}

/// The pure transition function behind every coordinator operation.
///
/// Returns `None` when the trigger does not apply in the current status;
/// terminal statuses never transition.
fn next_status(current: SessionStatus, trigger: Trigger) -> Option<SessionStatus> {
    use SessionStatus::*;
    match (current, trigger) {
        (Accepted | AwaitingOutput | Stalled, Trigger::ObserveOutput) => Some(ActiveOutput),
        (ActiveOutput, Trigger::Stop) => Some(Completed),
        (Accepted | AwaitingOutput | ActiveOutput | Stalled, Trigger::Fail) => Some(Error),
        (Accepted | AwaitingOutput | ActiveOutput | Stalled, Trigger::Close) => Some(Closed),
        (Accepted | ActiveOutput, Trigger::StallToAwaiting) => Some(AwaitingOutput),
        (AwaitingOutput, Trigger::StallToStalled) => Some(Stalled),
        _ => None,
    }
}

/// A handle to one armed stall timer.
///
/// Cancellation is idempotent: cancelling an already-cancelled or
/// already-fired timer is a no-op. Dropping the handle cancels the timer,
/// so a destroyed session can never be fired on.
struct StallTimer {
    token: CancellationToken,
}

impl StallTimer {
    fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for StallTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Mutable per-session state, owned exclusively by the coordinator.
struct SessionStatusState {
    status: SessionStatus,
    last_activity_at: Option<DateTime<Utc>>,
    timer: Option<StallTimer>,
    /// Bumped on every arm/cancel; a fired timer whose generation no longer
    /// matches is stale and must not transition.
    generation: u64,
}

impl SessionStatusState {
    /// Unconditionally cancel any live timer and invalidate in-flight fires.
    fn cancel_timer(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

/// Owns per-session status state and stall-detection timers; emits
/// [`CanonicalStatusEvent`]s through the status bus.
///
/// Operations on unknown or already-terminal sessions are warn-logged
/// no-ops -- they never raise into the caller's critical path.
pub struct SessionCoordinator {
    sessions: Mutex<HashMap<String, SessionStatusState>>,
    store: Arc<dyn SessionStore>,
    bus: StatusBus,
    stall: StallConfig,
}

impl SessionCoordinator {
    pub fn new(store: Arc<dyn SessionStore>, bus: StatusBus, stall: StallConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            bus,
            stall,
        }
    }

    /// The bus this coordinator publishes on.
    pub fn bus(&self) -> &StatusBus {
        &self.bus
    }

    /// Current status of a session, if it is live.
    pub async fn status_of(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.lock().await.get(session_id).map(|s| s.status)
    }

    /// Number of live (non-terminal) sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Accept a new session originating on the given surface.
    ///
    /// Persists the session row with its origin binding, arms the T1 stall
    /// timer, and emits `accepted`.
    pub async fn accept(self: &Arc<Self>, session_id: &str, origin_surface: &str) {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(session_id) {
            warn!(session_id, "accept ignored: session already live");
            return;
        }

        let now = Utc::now();
        let record = SessionRecord {
            id: session_id.to_string(),
            origin_surface: origin_surface.to_string(),
            status: SessionStatus::Accepted.to_string(),
            last_activity_at: None,
            created_at: rfc3339(now),
            updated_at: rfc3339(now),
        };
        if let Err(e) = self.store.create_session(&record).await {
            error!(session_id, error = %e, "failed to persist accepted session");
        }

        let mut state = SessionStatusState {
            status: SessionStatus::Accepted,
            last_activity_at: None,
            timer: None,
            generation: 0,
        };
        self.arm_stall_timer(
            &mut state,
            session_id,
            self.stall.awaiting_threshold(),
            StallPhase::Awaiting,
        );
        sessions.insert(session_id.to_string(), state);

        info!(session_id, origin = origin_surface, "session accepted");
        self.emit(session_id, SessionStatus::Accepted, reason::WORK_ACCEPTED, None);
    }

    /// Record observed output for a session.
    ///
    /// From `accepted`, `awaiting_output`, or `stalled` this transitions to
    /// `active_output`. While already in `active_output` it only refreshes
    /// the activity instant and re-arms the T1 timer -- no duplicate
    /// transition event is emitted.
    pub async fn observe_output(self: &Arc<Self>, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        let Some(state) = sessions.get_mut(session_id) else {
            warn!(session_id, "observe_output ignored: unknown or terminal session");
            return;
        };

        let now = Utc::now();
        state.last_activity_at = Some(now);

        if state.status == SessionStatus::ActiveOutput {
            self.arm_stall_timer(
                state,
                session_id,
                self.stall.awaiting_threshold(),
                StallPhase::Awaiting,
            );
            if let Err(e) = self
                .store
                .update_session_status(
                    session_id,
                    &state.status.to_string(),
                    Some(&rfc3339(now)),
                )
                .await
            {
                error!(session_id, error = %e, "failed to persist activity refresh");
            }
            debug!(session_id, "output observed, stall clock reset");
            return;
        }

        let Some(next) = next_status(state.status, Trigger::ObserveOutput) else {
            warn!(session_id, status = %state.status, "observe_output ignored");
            return;
        };

        state.cancel_timer();
        state.status = next;
        self.arm_stall_timer(
            state,
            session_id,
            self.stall.awaiting_threshold(),
            StallPhase::Awaiting,
        );

        if let Err(e) = self
            .store
            .update_session_status(session_id, &next.to_string(), Some(&rfc3339(now)))
            .await
        {
            error!(session_id, error = %e, "failed to persist status transition");
        }
        self.emit(session_id, next, reason::OUTPUT_OBSERVED, Some(now));
    }

    /// Mark a session completed (valid only from `active_output`).
    pub async fn stop(&self, session_id: &str) {
        self.apply_terminal(session_id, Trigger::Stop, reason::NORMAL_STOP)
            .await;
    }

    /// Mark a session errored with a caller-supplied reason code.
    ///
    /// The stall timer is cancelled as part of this operation; a stall
    /// timer firing after an error transition would be a correctness bug.
    pub async fn fail(&self, session_id: &str, reason_code: &str) {
        self.apply_terminal(session_id, Trigger::Fail, reason_code).await;
    }

    /// Close a session. Cancels any live timer before tearing down state,
    /// so no stale timer can fire after the session is gone.
    pub async fn close(&self, session_id: &str) {
        self.apply_terminal(session_id, Trigger::Close, reason::SESSION_CLOSED)
            .await;
    }

    /// Cancel every live stall timer. Called on daemon shutdown.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for state in sessions.values_mut() {
            state.cancel_timer();
        }
        debug!(sessions = sessions.len(), "coordinator timers cancelled");
    }

    /// Mark sessions left non-terminal by a previous run as errored.
    ///
    /// Runs at daemon startup, before any new work is accepted. Every
    /// emission goes through the status contract like any other.
    pub async fn recover_interrupted(&self) {
        let rows = match self.store.list_sessions(None).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "failed to list sessions for crash recovery");
                return;
            }
        };

        let mut recovered = 0usize;
        for row in rows {
            let non_terminal = row
                .status
                .parse::<SessionStatus>()
                .map(|s| !s.is_terminal())
                .unwrap_or(false);
            if !non_terminal {
                continue;
            }

            if let Err(e) = self
                .store
                .update_session_status(
                    &row.id,
                    &SessionStatus::Error.to_string(),
                    row.last_activity_at.as_deref(),
                )
                .await
            {
                error!(session_id = row.id.as_str(), error = %e, "failed to mark stale session");
                continue;
            }
            let last_activity = row
                .last_activity_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            self.emit(
                &row.id,
                SessionStatus::Error,
                reason::DAEMON_RESTART,
                last_activity,
            );
            recovered += 1;
        }

        if recovered > 0 {
            info!(count = recovered, "stale sessions marked errored");
        }
    }

    /// Shared path for `stop`/`fail`/`close`: cancel the timer first, apply
    /// the transition, persist, emit, and destroy the per-session state.
    async fn apply_terminal(&self, session_id: &str, trigger: Trigger, reason_code: &str) {
        let mut sessions = self.sessions.lock().await;
        let Some(state) = sessions.get_mut(session_id) else {
            warn!(session_id, ?trigger, "operation ignored: unknown or terminal session");
            return;
        };
        let Some(next) = next_status(state.status, trigger) else {
            warn!(
                session_id,
                status = %state.status,
                ?trigger,
                "operation ignored: no transition from current status"
            );
            return;
        };

        // Timer teardown comes before everything else.
        state.cancel_timer();
        let last_activity = state.last_activity_at;

        if let Err(e) = self
            .store
            .update_session_status(
                session_id,
                &next.to_string(),
                last_activity.map(rfc3339).as_deref(),
            )
            .await
        {
            error!(session_id, error = %e, "failed to persist terminal status");
        }
        self.emit(session_id, next, reason_code, last_activity);

        // Terminal: destroy the state; later operations become no-ops.
        sessions.remove(session_id);
        info!(session_id, status = %next, "session reached terminal status");
    }

    /// Timer callback: apply the stall transition the fired timer drives.
    ///
    /// Stale fires (the session transitioned or re-armed since this timer
    /// was set) are detected via the generation counter and dropped.
    async fn stall_tick(self: Arc<Self>, session_id: String, phase: StallPhase, generation: u64) {
        let mut sessions = self.sessions.lock().await;
        let Some(state) = sessions.get_mut(&session_id) else {
            debug!(session_id, "stall timer fired for destroyed session, ignoring");
            return;
        };
        if state.generation != generation {
            debug!(session_id, "stale stall timer fire, ignoring");
            return;
        }

        let trigger = match phase {
            StallPhase::Awaiting => Trigger::StallToAwaiting,
            StallPhase::Stalled => Trigger::StallToStalled,
        };
        let Some(next) = next_status(state.status, trigger) else {
            debug!(session_id, status = %state.status, "stall trigger does not apply, ignoring");
            return;
        };

        state.timer = None;
        state.status = next;

        if next == SessionStatus::AwaitingOutput {
            // Arm the follow-up so `stalled` lands at T2 total elapsed.
            let remaining = self
                .stall
                .stalled_threshold()
                .saturating_sub(self.stall.awaiting_threshold());
            self.arm_stall_timer(state, &session_id, remaining, StallPhase::Stalled);
        }

        let last_activity = state.last_activity_at;
        if let Err(e) = self
            .store
            .update_session_status(
                &session_id,
                &next.to_string(),
                last_activity.map(rfc3339).as_deref(),
            )
            .await
        {
            error!(session_id = session_id.as_str(), error = %e, "failed to persist stall transition");
        }
        self.emit(&session_id, next, reason::STALL_TIMEOUT, last_activity);
    }

    /// Arm exactly one stall timer on this session, replacing any live one.
    fn arm_stall_timer(
        self: &Arc<Self>,
        state: &mut SessionStatusState,
        session_id: &str,
        after: Duration,
        phase: StallPhase,
    ) {
        state.cancel_timer();
        let generation = state.generation;

        let token = CancellationToken::new();
        let fire_token = token.clone();
        let weak = Arc::downgrade(self);
        let sid = session_id.to_string();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = fire_token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let Some(coordinator) = weak.upgrade() else { return };
                    // Nothing inside the tick may take down the timer task's
                    // neighbors: failures are logged, the session is left in
                    // its current status.
                    let tick = std::panic::AssertUnwindSafe(
                        coordinator.stall_tick(sid.clone(), phase, generation),
                    )
                    .catch_unwind();
                    if tick.await.is_err() {
                        error!(session_id = sid.as_str(), "stall timer transition panicked");
                    }
                }
            }
        });

        state.timer = Some(StallTimer { token });
    }

    /// Build and publish one status event through the contract.
    ///
    /// A contract rejection here is a coordinator bug: logged at error
    /// level, event dropped.
    fn emit(
        &self,
        session_id: &str,
        status_value: SessionStatus,
        reason_code: &str,
        last_activity_at: Option<DateTime<Utc>>,
    ) {
        let candidate = StatusCandidate {
            session_id: Some(session_id.to_string()),
            status: Some(status_value.to_string()),
            reason: Some(reason_code.to_string()),
            timestamp: Some(Utc::now()),
            last_activity_at,
        };
        match status::validate_and_build(candidate) {
            Ok(event) => {
                self.publish(event);
            }
            Err(e) => {
                error!(session_id, error = %e, "status emission rejected by contract, dropped");
            }
        }
    }

    fn publish(&self, event: CanonicalStatusEvent) {
        debug!(
            session_id = event.session_id.as_str(),
            status = %event.status,
            reason = event.reason.as_str(),
            "status event published"
        );
        self.bus.publish(event);
    }
}

fn rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
