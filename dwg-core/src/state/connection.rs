//! Server-side connection state machine.
//!
//! Provides a `ConnectionPhase` enum that models the lifecycle of the one
//! gateway connection a server handles, with validated transitions that
//! return `Result` instead of panicking.

use std::fmt;

use crate::error::DwgError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the server.
///
/// ```text
///  Disconnected ──► WaitingForPeer ──► Authenticating ──► Connected
///       ▲                  │                  │                │
///       └──────────────────┴──── stop / failure ───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionPhase {
    /// Not listening. Initial and terminal state.
    #[default]
    Disconnected,

    /// Listening for the gateway to connect.
    WaitingForPeer,

    /// Gateway connected; authentication and initial reports in progress.
    Authenticating,

    /// Gateway authenticated and reported signal quality; requests allowed.
    Connected,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `WaitingForPeer`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_listen(&mut self) -> Result<(), DwgError> {
        match self {
            Self::Disconnected => {
                *self = Self::WaitingForPeer;
                Ok(())
            }
            _ => Err(DwgError::AlreadyStarted),
        }
    }

    /// Transition to `Authenticating`.
    ///
    /// Valid from: `WaitingForPeer`.
    pub fn accept_peer(&mut self) -> Result<(), DwgError> {
        match self {
            Self::WaitingForPeer => {
                *self = Self::Authenticating;
                Ok(())
            }
            _ => Err(DwgError::ProtocolViolation(
                "cannot accept a peer: not waiting for one",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Authenticating`.
    pub fn complete_handshake(&mut self) -> Result<(), DwgError> {
        match self {
            Self::Authenticating => {
                *self = Self::Connected;
                Ok(())
            }
            _ => Err(DwgError::ProtocolViolation(
                "cannot complete handshake: not authenticating",
            )),
        }
    }

    /// Transition to `Disconnected` on request.
    ///
    /// Valid from any phase except `Disconnected`.
    pub fn stop(&mut self) -> Result<(), DwgError> {
        match self {
            Self::Disconnected => Err(DwgError::NotRunning),
            _ => {
                *self = Self::Disconnected;
                Ok(())
            }
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = ConnectionPhase::default();
        assert!(phase.is_disconnected());

        phase.begin_listen().unwrap();
        assert_eq!(phase, ConnectionPhase::WaitingForPeer);

        phase.accept_peer().unwrap();
        assert_eq!(phase, ConnectionPhase::Authenticating);

        phase.complete_handshake().unwrap();
        assert!(phase.is_connected());

        phase.stop().unwrap();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn listen_twice_is_already_started() {
        let mut phase = ConnectionPhase::Connected;
        assert!(matches!(phase.begin_listen(), Err(DwgError::AlreadyStarted)));
        assert_eq!(phase, ConnectionPhase::Connected);
    }

    #[test]
    fn stop_when_disconnected_is_not_running() {
        let mut phase = ConnectionPhase::Disconnected;
        assert!(matches!(phase.stop(), Err(DwgError::NotRunning)));
    }

    #[test]
    fn stop_from_every_running_phase() {
        for mut phase in [
            ConnectionPhase::WaitingForPeer,
            ConnectionPhase::Authenticating,
            ConnectionPhase::Connected,
        ] {
            phase.stop().unwrap();
            assert!(phase.is_disconnected());
        }
    }

    #[test]
    fn handshake_requires_authenticating() {
        let mut phase = ConnectionPhase::WaitingForPeer;
        assert!(phase.complete_handshake().is_err());
        let mut phase = ConnectionPhase::Disconnected;
        assert!(phase.accept_peer().is_err());
    }

    #[test]
    fn force_disconnect_from_any_state() {
        let mut phase = ConnectionPhase::Authenticating;
        phase.force_disconnect();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionPhase::WaitingForPeer.to_string(), "WaitingForPeer");
        assert_eq!(ConnectionPhase::Connected.to_string(), "Connected");
    }
}
