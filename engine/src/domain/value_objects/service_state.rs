use crate::domain::DomainError;
use std::fmt;

/// Lifecycle of one supervised service.
///
/// There is no way back to `NotStarted`: a readiness failure is terminal for
/// that start attempt and nothing is restarted automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Nothing spawned yet.
    NotStarted,
    /// Spawn requested.
    Launching,
    /// Process is alive, readiness probe is being retried.
    AwaitingReady,
    /// Probe succeeded, handle handed to the caller.
    Ready,
    /// `close` in progress: kill, then stop script.
    Closing,
    /// Process exited and stop script finished.
    Closed,
    /// Spawn or readiness failed.
    Failed,
}

impl ServiceState {
    pub fn is_ready(self) -> bool {
        self == ServiceState::Ready
    }

    pub(crate) fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (NotStarted, Launching)
                | (Launching, AwaitingReady)
                | (Launching, Failed)
                | (AwaitingReady, Ready)
                | (AwaitingReady, Failed)
                | (Ready, Closing)
                | (Closing, Closed)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub(crate) fn advance(&mut self, next: ServiceState) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::NotStarted => write!(f, "not-started"),
            ServiceState::Launching => write!(f, "launching"),
            ServiceState::AwaitingReady => write!(f, "awaiting-ready"),
            ServiceState::Ready => write!(f, "ready"),
            ServiceState::Closing => write!(f, "closing"),
            ServiceState::Closed => write!(f, "closed"),
            ServiceState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ServiceState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [NotStarted, Launching, AwaitingReady, Ready, Closing, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_automatic_restart() {
        assert!(!AwaitingReady.can_transition_to(NotStarted));
        assert!(!Failed.can_transition_to(Launching));
        assert!(!Closed.can_transition_to(Launching));
    }

    #[test]
    fn test_cannot_skip_readiness() {
        assert!(!Launching.can_transition_to(Ready));
        assert!(!NotStarted.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Closed));
    }

    #[test]
    fn test_advance_rejects_invalid_transition() {
        let mut state = Ready;
        let err = state.advance(Launching).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(state, Ready);

        state.advance(Closing).unwrap();
        assert_eq!(state, Closing);
    }

    #[test]
    fn test_display() {
        assert_eq!(AwaitingReady.to_string(), "awaiting-ready");
        assert_eq!(Closed.to_string(), "closed");
        assert!(Ready.is_ready());
        assert!(!Closing.is_ready());
    }
}
