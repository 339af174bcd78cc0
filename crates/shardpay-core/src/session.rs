use std::fmt;
use std::sync::Mutex;

use crate::error::CoreError;

/// Lifecycle states of a renter upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    /// Shards are being negotiated and uploaded.
    Init,
    /// Contracts are being submitted to the escrow authority.
    Submit,
    /// Escrow accepted the contracts; payment is in progress.
    Pay,
    /// Guard contracts are being registered.
    Guard,
    /// Waiting for hosts to confirm the upload.
    WaitUpload,
    /// Upload settled. Final state.
    Complete,
    /// Session aborted. Final state.
    Error,
}

impl SessionState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Submit => write!(f, "submit"),
            Self::Pay => write!(f, "pay"),
            Self::Guard => write!(f, "guard"),
            Self::WaitUpload => write!(f, "wait-upload"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Events that drive session transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ToSubmit,
    ToPay,
    ToGuard,
    ToWaitUpload,
    ToComplete,
    ToError,
}

impl SessionEvent {
    fn target(&self) -> SessionState {
        match self {
            Self::ToSubmit => SessionState::Submit,
            Self::ToPay => SessionState::Pay,
            Self::ToGuard => SessionState::Guard,
            Self::ToWaitUpload => SessionState::WaitUpload,
            Self::ToComplete => SessionState::Complete,
            Self::ToError => SessionState::Error,
        }
    }
}

/// Renter session transition rules.
///
/// Valid transitions:
/// - Init → Submit (ToSubmit)
/// - Submit → Pay (ToPay)
/// - Pay → Guard (ToGuard)
/// - Guard → WaitUpload (ToWaitUpload)
/// - WaitUpload → Complete (ToComplete)
/// - any non-final state → Error (ToError)
pub struct SessionStateMachine;

impl SessionStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(current: SessionState, event: SessionEvent) -> Result<SessionState, CoreError> {
        let new_state = match (current, event) {
            (SessionState::Init, SessionEvent::ToSubmit) => SessionState::Submit,
            (SessionState::Submit, SessionEvent::ToPay) => SessionState::Pay,
            (SessionState::Pay, SessionEvent::ToGuard) => SessionState::Guard,
            (SessionState::Guard, SessionEvent::ToWaitUpload) => SessionState::WaitUpload,
            (SessionState::WaitUpload, SessionEvent::ToComplete) => SessionState::Complete,
            (state, SessionEvent::ToError) if !state.is_final() => SessionState::Error,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: event.target(),
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "session state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: SessionState, event: SessionEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

/// Thread-safe holder of a session's current state.
///
/// `fire` checks and applies a transition under one lock, so of two
/// concurrent attempts at the same transition exactly one succeeds.
pub struct SessionGate {
    state: Mutex<SessionState>,
}

impl SessionGate {
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `event`, returning the new state.
    pub fn fire(&self, event: SessionEvent) -> Result<SessionState, CoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let next = SessionStateMachine::transition(*state, event)?;
        *state = next;
        Ok(next)
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new(SessionState::Init)
    }
}
