//! The session state machine and its allowed transitions.

use serde::{Deserialize, Serialize};

use crate::core::GhostDropError;

/// Lifecycle of one GhostDrop session. Initial state is [`SessionState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Advertising,
    Scanning,
    Connecting,
    Negotiating,
    Verifying,
    Transferring,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states may only transition back to `idle`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    fn allowed_destinations(self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Idle => &[Advertising, Scanning, Connecting, Negotiating, Failed, Cancelled],
            Advertising | Scanning => &[Connecting, Negotiating, Failed, Cancelled],
            Connecting => &[Negotiating, Failed, Cancelled],
            // The receiver may see `Hello` arrive post-negotiation and jump
            // straight to `Transferring`, bypassing `Verifying`.
            Negotiating => &[Verifying, Transferring, Failed, Cancelled],
            Verifying => &[Transferring, Failed, Cancelled],
            Transferring => &[Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => &[Idle],
        }
    }

    /// `true` if `self -> to` is a legal transition (re-entering the
    /// current state is always legal, as a no-op).
    pub fn can_transition_to(self, to: SessionState) -> bool {
        self == to || self.allowed_destinations().contains(&to)
    }
}

/// Thin wrapper around [`SessionState`] enforcing the transition table.
#[derive(Debug, Clone, Copy)]
pub struct SessionStateMachine {
    current: SessionState,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            current: SessionState::Idle,
        }
    }
}

impl SessionStateMachine {
    pub fn current(&self) -> SessionState {
        self.current
    }

    /// Attempt `current -> to`. Returns the previous state on success.
    pub fn transition(&mut self, to: SessionState) -> Result<SessionState, GhostDropError> {
        if !self.current.can_transition_to(to) {
            return Err(GhostDropError::InvalidStateTransition {
                from: self.current,
                to,
            });
        }
        let from = self.current;
        self.current = to;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn re_entering_current_state_is_a_no_op() {
        let mut machine = SessionStateMachine::default();
        assert_eq!(machine.transition(Idle).unwrap(), Idle);
        assert_eq!(machine.current(), Idle);
    }

    #[test]
    fn terminal_states_only_return_to_idle() {
        let mut machine = SessionStateMachine::default();
        machine.transition(Negotiating).unwrap();
        machine.transition(Transferring).unwrap();
        machine.transition(Completed).unwrap();
        assert!(machine.transition(Scanning).is_err());
        assert!(machine.transition(Idle).is_ok());
    }

    #[test]
    fn negotiating_can_jump_straight_to_transferring() {
        let mut machine = SessionStateMachine::default();
        machine.transition(Negotiating).unwrap();
        assert!(machine.transition(Transferring).is_ok());
    }

    #[test]
    fn illegal_transition_reports_from_and_to() {
        let mut machine = SessionStateMachine::default();
        let err = machine.transition(Transferring).unwrap_err();
        match err {
            GhostDropError::InvalidStateTransition { from, to } => {
                assert_eq!(from, Idle);
                assert_eq!(to, Transferring);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
