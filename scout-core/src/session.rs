//! Discovery session state machine: Idle -> Requesting -> Active -> Stopped/Failed.

/// Session lifecycle state. `Stopped` and `Failed` are terminal: only
/// `reset()` is valid from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Active,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Requesting => "requesting",
            SessionState::Active => "active",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why the platform declined a discovery request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unsupported,
    Busy,
    Internal,
    Unknown,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Unsupported => "unsupported",
            RejectReason::Busy => "busy",
            RejectReason::Internal => "internal",
            RejectReason::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Operation attempted in a state where it is not legal. Programming error,
/// surfaced to the caller synchronously.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{op} not valid in state {state}")]
pub struct InvalidState {
    pub op: &'static str,
    pub state: SessionState,
}

/// One discovery session. Transitions are driven exclusively through the
/// methods below; timestamps are the owner's logical clock.
#[derive(Debug)]
pub struct DiscoverySession {
    state: SessionState,
    failure_reason: Option<RejectReason>,
    started_at: Option<u64>,
    ended_at: Option<u64>,
}

impl DiscoverySession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            failure_reason: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Set only when `state == Failed`.
    pub fn failure_reason(&self) -> Option<RejectReason> {
        self.failure_reason
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<u64> {
        self.ended_at
    }

    /// Idle -> Requesting. The owner forwards the actual discovery request to
    /// the platform binding; acceptance arrives later via `on_accepted`.
    pub fn start(&mut self, now: u64) -> Result<(), InvalidState> {
        if self.state != SessionState::Idle {
            return Err(InvalidState {
                op: "start",
                state: self.state,
            });
        }
        self.state = SessionState::Requesting;
        self.started_at = Some(now);
        self.ended_at = None;
        Ok(())
    }

    /// Requesting -> Active: the platform confirmed the request.
    pub fn on_accepted(&mut self) -> Result<(), InvalidState> {
        if self.state != SessionState::Requesting {
            return Err(InvalidState {
                op: "on_accepted",
                state: self.state,
            });
        }
        self.state = SessionState::Active;
        Ok(())
    }

    /// Requesting -> Failed: the platform declined; the reason is recorded.
    pub fn on_rejected(&mut self, reason: RejectReason, now: u64) -> Result<(), InvalidState> {
        if self.state != SessionState::Requesting {
            return Err(InvalidState {
                op: "on_rejected",
                state: self.state,
            });
        }
        self.state = SessionState::Failed;
        self.failure_reason = Some(reason);
        self.ended_at = Some(now);
        Ok(())
    }

    /// Requesting | Active -> Stopped: caller-initiated cancellation.
    pub fn stop(&mut self, now: u64) -> Result<(), InvalidState> {
        match self.state {
            SessionState::Requesting | SessionState::Active => {
                self.state = SessionState::Stopped;
                self.ended_at = Some(now);
                Ok(())
            }
            state => Err(InvalidState { op: "stop", state }),
        }
    }

    /// Stopped | Failed -> Idle. Clears the failure reason; the owner clears
    /// the peer store alongside.
    pub fn reset(&mut self) -> Result<(), InvalidState> {
        if !self.state.is_terminal() {
            return Err(InvalidState {
                op: "reset",
                state: self.state,
            });
        }
        self.state = SessionState::Idle;
        self.failure_reason = None;
        self.started_at = None;
        self.ended_at = None;
        Ok(())
    }
}

impl Default for DiscoverySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_idle_only_start_is_legal() {
        let mut s = DiscoverySession::new();
        assert!(s.stop(1).is_err());
        assert!(s.reset().is_err());
        assert!(s.on_accepted().is_err());
        assert!(s.on_rejected(RejectReason::Busy, 1).is_err());
        assert!(s.start(1).is_ok());
        assert_eq!(s.state(), SessionState::Requesting);
    }

    #[test]
    fn accepted_activates() {
        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        s.on_accepted().unwrap();
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.failure_reason(), None);
    }

    #[test]
    fn rejected_records_reason_and_requires_reset() {
        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        s.on_rejected(RejectReason::Busy, 2).unwrap();
        assert_eq!(s.state(), SessionState::Failed);
        assert_eq!(s.failure_reason(), Some(RejectReason::Busy));

        // Terminal: start is not legal again until reset.
        let err = s.start(3).unwrap_err();
        assert_eq!(err.state, SessionState::Failed);

        s.reset().unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.failure_reason(), None);
        assert!(s.start(4).is_ok());
    }

    #[test]
    fn stop_from_requesting_and_active() {
        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        s.stop(2).unwrap();
        assert_eq!(s.state(), SessionState::Stopped);

        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        s.on_accepted().unwrap();
        s.stop(3).unwrap();
        assert_eq!(s.state(), SessionState::Stopped);
        assert_eq!(s.ended_at(), Some(3));
    }

    #[test]
    fn stop_from_terminal_is_invalid() {
        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        s.stop(2).unwrap();
        assert!(s.stop(3).is_err());
    }

    #[test]
    fn reset_only_from_terminal() {
        let mut s = DiscoverySession::new();
        s.start(1).unwrap();
        assert!(s.reset().is_err());
        s.on_accepted().unwrap();
        assert!(s.reset().is_err());
        s.stop(2).unwrap();
        assert!(s.reset().is_ok());
    }

    #[test]
    fn timestamps_cover_the_session() {
        let mut s = DiscoverySession::new();
        s.start(10).unwrap();
        assert_eq!(s.started_at(), Some(10));
        assert_eq!(s.ended_at(), None);
        s.on_accepted().unwrap();
        s.stop(20).unwrap();
        assert_eq!(s.ended_at(), Some(20));
        s.reset().unwrap();
        assert_eq!(s.started_at(), None);
    }
}
