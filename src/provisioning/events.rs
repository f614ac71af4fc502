//! Session Events
//!
//! Events emitted by provisioning sessions so a front end can render
//! progress without polling.

use serde::{Deserialize, Serialize};

/// Events emitted by a provisioning session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A session started and its timers are running
    Started {
        session_id: u64,
        title: String,
        steps: Vec<String>,
    },

    /// The heartbeat moved the presented step forward
    StepAdvanced {
        session_id: u64,
        index: usize,
        label: String,
    },

    /// Elapsed-time display tick
    ElapsedTick { session_id: u64, seconds: u64 },

    /// The remote operation succeeded and views are being refreshed
    Reconciling { session_id: u64 },

    /// Terminal success
    Completed { session_id: u64, message: String },

    /// Terminal failure
    Failed { session_id: u64, message: String },

    /// Timers were torn down before a terminal state (preemption or re-auth)
    Cancelled { session_id: u64 },
}

impl SessionEvent {
    /// Get the session ID associated with this event
    pub fn session_id(&self) -> u64 {
        match self {
            SessionEvent::Started { session_id, .. } => *session_id,
            SessionEvent::StepAdvanced { session_id, .. } => *session_id,
            SessionEvent::ElapsedTick { session_id, .. } => *session_id,
            SessionEvent::Reconciling { session_id } => *session_id,
            SessionEvent::Completed { session_id, .. } => *session_id,
            SessionEvent::Failed { session_id, .. } => *session_id,
            SessionEvent::Cancelled { session_id } => *session_id,
        }
    }

    /// Check if this event ends the session's display lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Completed { .. }
                | SessionEvent::Failed { .. }
                | SessionEvent::Cancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_session_id() {
        let event = SessionEvent::StepAdvanced {
            session_id: 7,
            index: 1,
            label: "Mount filesystem".to_string(),
        };
        assert_eq!(event.session_id(), 7);
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_terminal_events() {
        assert!(SessionEvent::Completed {
            session_id: 1,
            message: "Share created".to_string(),
        }
        .is_terminal());
        assert!(SessionEvent::Cancelled { session_id: 1 }.is_terminal());
        assert!(!SessionEvent::Reconciling { session_id: 1 }.is_terminal());
    }
}
