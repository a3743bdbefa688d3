// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The canonical session-status contract.
//!
//! Every status emission in the daemon passes through [`validate_and_build`]:
//! it is the single gate between internal transition logic and the wire
//! payload that presentation surfaces render. No other code path may
//! construct a [`CanonicalStatusEvent`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::BeaconError;

/// The seven-value session lifecycle vocabulary.
///
/// `Completed`, `Error`, and `Closed` are terminal: no outgoing transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Accepted,
    AwaitingOutput,
    ActiveOutput,
    Stalled,
    Completed,
    Error,
    Closed,
}

impl SessionStatus {
    /// Returns true for statuses with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Error | SessionStatus::Closed
        )
    }
}

/// Machine-readable reason codes attached to status events.
pub mod reason {
    pub const WORK_ACCEPTED: &str = "work_accepted";
    pub const OUTPUT_OBSERVED: &str = "output_observed";
    pub const STALL_TIMEOUT: &str = "stall_timeout";
    pub const NORMAL_STOP: &str = "normal_stop";
    pub const SESSION_CLOSED: &str = "session_closed";
    pub const DAEMON_RESTART: &str = "daemon_restart";
}

/// An unvalidated status emission candidate.
///
/// Built by callers from whatever they hold; the contract decides whether
/// it becomes an event. The `status` field is a string on purpose: the
/// vocabulary check is the contract's job, not the caller's.
#[derive(Debug, Clone, Default)]
pub struct StatusCandidate {
    pub session_id: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// The single validated representation of a session's lifecycle state.
///
/// Immutable: one instance per transition, never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalStatusEvent {
    pub session_id: String,
    pub status: SessionStatus,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl CanonicalStatusEvent {
    /// Serializable wire form of this event.
    pub fn to_wire(&self) -> StatusWirePayload {
        StatusWirePayload {
            event: WIRE_EVENT_NAME.to_string(),
            session_id: self.session_id.clone(),
            status: self.status,
            reason: self.reason.clone(),
            timestamp: self.timestamp,
            last_activity_at: self.last_activity_at,
        }
    }
}

/// Wire tag for session status payloads.
pub const WIRE_EVENT_NAME: &str = "session_status";

/// The canonical status wire payload consumed by every presentation surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusWirePayload {
    pub event: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Validate a candidate and build the canonical event.
///
/// Rejects any status outside the seven-value vocabulary and any missing
/// required field (`session_id`, `status`, `timestamp`). Rejection means
/// the caller holds a bug; the caller logs at error level and drops the
/// event rather than emitting a partial one.
pub fn validate_and_build(
    candidate: StatusCandidate,
) -> Result<CanonicalStatusEvent, BeaconError> {
    let session_id = match candidate.session_id {
        Some(id) if !id.trim().is_empty() => id,
        Some(_) => {
            return Err(BeaconError::Contract {
                reason: "session_id must not be empty".to_string(),
            });
        }
        None => {
            return Err(BeaconError::Contract {
                reason: "missing required field: session_id".to_string(),
            });
        }
    };

    let status = match candidate.status {
        Some(raw) => SessionStatus::from_str(&raw).map_err(|_| BeaconError::Contract {
            reason: format!("unknown status value `{raw}`"),
        })?,
        None => {
            return Err(BeaconError::Contract {
                reason: "missing required field: status".to_string(),
            });
        }
    };

    let timestamp = candidate.timestamp.ok_or_else(|| BeaconError::Contract {
        reason: "missing required field: timestamp".to_string(),
    })?;

    Ok(CanonicalStatusEvent {
        session_id,
        status,
        reason: candidate.reason.unwrap_or_default(),
        timestamp,
        last_activity_at: candidate.last_activity_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(status: &str) -> StatusCandidate {
        StatusCandidate {
            session_id: Some("sess-1".to_string()),
            status: Some(status.to_string()),
            reason: Some(reason::WORK_ACCEPTED.to_string()),
            timestamp: Some(Utc::now()),
            last_activity_at: None,
        }
    }

    #[test]
    fn all_seven_statuses_accepted() {
        for s in [
            "accepted",
            "awaiting_output",
            "active_output",
            "stalled",
            "completed",
            "error",
            "closed",
        ] {
            let event = validate_and_build(candidate(s)).unwrap();
            assert_eq!(event.status.to_string(), s);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        let err = validate_and_build(candidate("thinking")).unwrap_err();
        assert!(matches!(err, BeaconError::Contract { .. }));
        assert!(err.to_string().contains("thinking"));
    }

    #[test]
    fn missing_session_id_rejected() {
        let mut c = candidate("accepted");
        c.session_id = None;
        let err = validate_and_build(c).unwrap_err();
        assert!(err.to_string().contains("session_id"));
    }

    #[test]
    fn empty_session_id_rejected() {
        let mut c = candidate("accepted");
        c.session_id = Some("   ".to_string());
        assert!(validate_and_build(c).is_err());
    }

    #[test]
    fn missing_status_rejected() {
        let mut c = candidate("accepted");
        c.status = None;
        let err = validate_and_build(c).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn missing_timestamp_rejected() {
        let mut c = candidate("accepted");
        c.timestamp = None;
        let err = validate_and_build(c).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(SessionStatus::Closed.is_terminal());
        assert!(!SessionStatus::Accepted.is_terminal());
        assert!(!SessionStatus::AwaitingOutput.is_terminal());
        assert!(!SessionStatus::ActiveOutput.is_terminal());
        assert!(!SessionStatus::Stalled.is_terminal());
    }

    #[test]
    fn wire_payload_shape() {
        let event = validate_and_build(candidate("stalled")).unwrap();
        let json = serde_json::to_value(event.to_wire()).unwrap();
        assert_eq!(json["event"], "session_status");
        assert_eq!(json["session_id"], "sess-1");
        assert_eq!(json["status"], "stalled");
        assert_eq!(json["reason"], "work_accepted");
        assert!(json["timestamp"].is_string());
        assert!(json["last_activity_at"].is_null());
    }

    #[test]
    fn wire_payload_roundtrips() {
        let event = validate_and_build(candidate("active_output")).unwrap();
        let json = serde_json::to_string(&event.to_wire()).unwrap();
        let back: StatusWirePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, SessionStatus::ActiveOutput);
        assert_eq!(back.session_id, "sess-1");
    }

    #[test]
    fn status_display_fromstr_roundtrip() {
        for s in [
            SessionStatus::Accepted,
            SessionStatus::AwaitingOutput,
            SessionStatus::ActiveOutput,
            SessionStatus::Stalled,
            SessionStatus::Completed,
            SessionStatus::Error,
            SessionStatus::Closed,
        ] {
            let parsed = SessionStatus::from_str(&s.to_string()).unwrap();
            assert_eq!(s, parsed);
        }
    }
}
