//! Per-connection data the gateway reports during a session.

use tokio_util::sync::CancellationToken;

use crate::error::DwgError;
use crate::header::{MacAddress, ZERO_MAC};
use crate::protocol::PortStatus;
use crate::state::connection::ConnectionPhase;

/// Phase plus everything learned from the current gateway.
///
/// `generation` increases on every start so that a connection task from a
/// previous run can tell it no longer owns the session. `shutdown` stops
/// the tasks of the current generation and is cancelled by [`reset`].
///
/// [`reset`]: Session::reset
#[derive(Debug, Default)]
pub struct Session {
    phase: ConnectionPhase,
    generation: u64,
    shutdown: Option<CancellationToken>,
    mac: MacAddress,
    authenticated: bool,
    ports: Vec<PortStatus>,
    ports_reported: bool,
    signal_levels: Vec<u8>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Phase ─────────────────────────────────────────────────────

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn phase_mut(&mut self) -> &mut ConnectionPhase {
        &mut self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move to `WaitingForPeer` under a fresh generation.
    pub fn begin(&mut self) -> Result<u64, DwgError> {
        self.phase.begin_listen()?;
        self.clear();
        self.generation += 1;
        Ok(self.generation)
    }

    /// Drop back to `Disconnected`, cancel the current generation's tasks
    /// and forget the gateway.
    pub fn reset(&mut self) {
        self.phase.force_disconnect();
        if let Some(token) = self.shutdown.take() {
            token.cancel();
        }
        self.clear();
    }

    /// Attach the token that stops this generation's tasks.
    pub fn set_shutdown(&mut self, token: CancellationToken) {
        self.shutdown = Some(token);
    }

    pub fn shutdown_token(&self) -> Option<CancellationToken> {
        self.shutdown.clone()
    }

    fn clear(&mut self) {
        self.mac = ZERO_MAC;
        self.authenticated = false;
        self.ports.clear();
        self.ports_reported = false;
        self.signal_levels.clear();
    }

    // ── Gateway data ──────────────────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Record a successful authentication from the gateway at `mac`.
    pub fn authenticate(&mut self, mac: MacAddress) -> Result<(), DwgError> {
        if self.phase != ConnectionPhase::Authenticating || self.authenticated {
            return Err(DwgError::ProtocolViolation(
                "authentication request outside of the handshake",
            ));
        }
        self.authenticated = true;
        self.mac = mac;
        Ok(())
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn ports(&self) -> &[PortStatus] {
        &self.ports
    }

    /// Store the port table. Only the first report of a session is kept;
    /// returns whether this one was.
    pub fn report_ports(&mut self, ports: Vec<PortStatus>) -> bool {
        if self.ports_reported {
            return false;
        }
        self.ports = ports;
        self.ports_reported = true;
        true
    }

    pub fn signal_levels(&self) -> &[u8] {
        &self.signal_levels
    }

    pub fn report_signal(&mut self, levels: Vec<u8>) {
        self.signal_levels = levels;
    }

    /// Check that a request may be sent through `port` right now.
    pub fn check_port(&self, port: u8) -> Result<(), DwgError> {
        if !self.phase.is_connected() {
            return Err(DwgError::InvalidOperation("no gateway connected"));
        }
        match self.ports.get(port as usize) {
            None => Err(DwgError::InvalidOperation("port index out of range")),
            Some(PortStatus::Works) => Ok(()),
            Some(_) => Err(DwgError::PortUnavailable { port }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = [9, 8, 7, 6, 5, 4];

    fn connected(ports: Vec<PortStatus>) -> Session {
        let mut s = Session::new();
        s.begin().unwrap();
        s.phase_mut().accept_peer().unwrap();
        s.authenticate(MAC).unwrap();
        s.report_ports(ports);
        s.phase_mut().complete_handshake().unwrap();
        s
    }

    #[test]
    fn begin_bumps_generation() {
        let mut s = Session::new();
        assert_eq!(s.begin().unwrap(), 1);
        assert!(matches!(s.begin(), Err(DwgError::AlreadyStarted)));
        s.reset();
        assert_eq!(s.begin().unwrap(), 2);
    }

    #[test]
    fn authenticate_only_once_while_authenticating() {
        let mut s = Session::new();
        s.begin().unwrap();
        assert!(s.authenticate(MAC).is_err());

        s.phase_mut().accept_peer().unwrap();
        s.authenticate(MAC).unwrap();
        assert_eq!(s.mac(), MAC);
        assert!(matches!(
            s.authenticate(MAC),
            Err(DwgError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn only_first_port_report_is_kept() {
        let mut s = Session::new();
        assert!(s.report_ports(vec![PortStatus::Works, PortStatus::NoSim]));
        assert!(!s.report_ports(vec![PortStatus::Unavailable]));
        assert_eq!(s.ports(), &[PortStatus::Works, PortStatus::NoSim]);
    }

    #[test]
    fn check_port_preconditions() {
        let s = connected(vec![PortStatus::Works, PortStatus::NoSim]);
        assert!(s.check_port(0).is_ok());
        assert!(matches!(
            s.check_port(1),
            Err(DwgError::PortUnavailable { port: 1 })
        ));
        assert!(matches!(
            s.check_port(2),
            Err(DwgError::InvalidOperation(_))
        ));
    }

    #[test]
    fn check_port_requires_connected() {
        let mut s = Session::new();
        s.report_ports(vec![PortStatus::Works]);
        assert!(matches!(
            s.check_port(0),
            Err(DwgError::InvalidOperation(_))
        ));
    }

    #[test]
    fn reset_forgets_gateway() {
        let mut s = connected(vec![PortStatus::Works]);
        s.report_signal(vec![20]);
        s.reset();
        assert!(s.phase().is_disconnected());
        assert_eq!(s.mac(), ZERO_MAC);
        assert!(s.ports().is_empty());
        assert!(s.signal_levels().is_empty());
        assert!(!s.is_authenticated());
        assert!(s.report_ports(vec![PortStatus::NoSim]));
    }

    #[test]
    fn reset_cancels_shutdown_token() {
        let mut s = Session::new();
        s.begin().unwrap();
        let token = CancellationToken::new();
        s.set_shutdown(token.clone());
        assert!(s.shutdown_token().is_some());

        s.reset();
        assert!(token.is_cancelled());
        assert!(s.shutdown_token().is_none());
    }
}
