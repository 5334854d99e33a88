//! The host-facing server handle.
//!
//! A [`DwgServer`] listens for one gateway connection at a time. Hosts
//! drive it with [`start`](DwgServer::start) / [`stop`](DwgServer::stop),
//! send requests with [`send_sms`](DwgServer::send_sms) and
//! [`send_ussd`](DwgServer::send_ussd), and observe everything else
//! through the [`ServerEvent`] receiver returned by [`DwgServer::new`].

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::SinkExt;
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::DwgCodec;
use crate::config::ServerConfig;
use crate::correlator::{Correlator, PendingRequest};
use crate::error::DwgError;
use crate::frame::Message;
use crate::header::MacAddress;
use crate::network::connection;
use crate::protocol::{
    Body, PortStatus, ReceiveSmsReceiptRequest, ReceiveSmsRequest, ReceiveUssdRequest,
    SendSmsRequest, SendSmsResult, SendSmsResultRequest, SendUssdRequest, SendUssdResult,
    SmsEncoding, UssdType,
};
use crate::state::{ConnectionPhase, Session};

// ── ServerEvent ──────────────────────────────────────────────────

/// Notifications delivered to the host.
#[derive(Debug)]
pub enum ServerEvent {
    /// The server moved to a new phase.
    StateChanged(ConnectionPhase),
    /// The connection failed and was torn down.
    Error(DwgError),
    /// Final delivery outcome of an SMS sent earlier.
    SmsResult(SendSmsResultRequest),
    /// The network answered a USSD command.
    UssdReceived(ReceiveUssdRequest),
    /// An SMS arrived on one of the gateway's ports.
    SmsReceived(ReceiveSmsRequest),
    /// A delivery receipt arrived for an SMS sent earlier.
    ReceiptReceived(ReceiveSmsReceiptRequest),
}

// ── Shared state ─────────────────────────────────────────────────

/// Upper bound on flushing a gateway socket that is being closed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) type GatewayWriter = FramedWrite<OwnedWriteHalf, DwgCodec>;

/// The write half of session `generation`'s socket.
#[derive(Debug)]
pub(crate) struct Link {
    generation: u64,
    writer: GatewayWriter,
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) config: ServerConfig,
    session: Mutex<Session>,
    writer: tokio::sync::Mutex<Option<Link>>,
    pub(crate) correlator: Correlator,
    events: mpsc::Sender<ServerEvent>,
}

impl Inner {
    pub(crate) fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session, if `generation` is still the live one.
    pub(crate) fn current_session(&self, generation: u64) -> Option<MutexGuard<'_, Session>> {
        let session = self.session();
        (session.generation() == generation && !session.phase().is_disconnected())
            .then_some(session)
    }

    /// Queue a notification without waiting on the host.
    pub(crate) fn emit(&self, event: ServerEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event queue full, dropping notification");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Apply `transition` to the phase of session `generation` and announce
    /// the result. Returns `false` if the session has moved on.
    pub(crate) fn transition(
        &self,
        generation: u64,
        transition: fn(&mut ConnectionPhase) -> Result<(), DwgError>,
    ) -> Result<bool, DwgError> {
        let phase = {
            let Some(mut session) = self.current_session(generation) else {
                return Ok(false);
            };
            transition(session.phase_mut())?;
            session.phase()
        };
        info!(%phase, "phase changed");
        self.emit(ServerEvent::StateChanged(phase));
        Ok(true)
    }

    pub(crate) async fn install_writer(
        &self,
        generation: u64,
        writer: GatewayWriter,
        token: &CancellationToken,
    ) -> bool {
        let mut slot = self.writer.lock().await;
        if token.is_cancelled() {
            return false;
        }
        *slot = Some(Link { generation, writer });
        true
    }

    /// Frame `body` under `mac` and write it to the gateway.
    ///
    /// Fails with [`DwgError::ConnectionClosed`] as soon as the session
    /// is stopped, even if the socket is not accepting bytes.
    pub(crate) async fn write(&self, body: Body, mac: MacAddress) -> Result<(), DwgError> {
        let message = Message::new(body, mac)?;
        let (generation, token) = {
            let session = self.session();
            match session.shutdown_token() {
                Some(token) => (session.generation(), token),
                None => return Err(DwgError::ConnectionClosed),
            }
        };

        let sent = async {
            let mut slot = self.writer.lock().await;
            let Some(link) = slot.as_mut().filter(|l| l.generation == generation) else {
                return Err(DwgError::ConnectionClosed);
            };
            debug!(kind = %message.message_type(), "sending");
            link.writer.send(message).await
        };
        tokio::select! {
            _ = token.cancelled() => Err(DwgError::ConnectionClosed),
            sent = sent => sent,
        }
    }

    /// Write `body` under the authenticated gateway's MAC.
    pub(crate) async fn send(&self, body: Body) -> Result<(), DwgError> {
        let mac = self.session().mac();
        self.write(body, mac).await
    }

    /// Reset `session` and fail every waiting caller while its lock is held.
    fn shut_down(&self, session: &mut Session) {
        session.reset();
        self.correlator.cancel_all();
    }

    /// Close the socket of session `generation`, if it is still installed.
    async fn release_writer(&self, generation: u64) {
        let link = {
            let mut slot = self.writer.lock().await;
            if slot.as_ref().is_some_and(|l| l.generation == generation) {
                slot.take()
            } else {
                None
            }
        };
        let Some(mut link) = link else {
            return;
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, link.writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "closing gateway socket"),
            Err(_) => debug!("gateway socket did not drain, dropping it"),
        }
    }

    /// End session `generation` after its connection failed or closed.
    pub(crate) async fn teardown(&self, generation: u64, error: Option<DwgError>) {
        {
            let Some(mut session) = self.current_session(generation) else {
                return;
            };
            self.shut_down(&mut session);
        }
        self.release_writer(generation).await;
        if let Some(error) = error {
            self.emit(ServerEvent::Error(error));
        }
        info!(phase = %ConnectionPhase::Disconnected, "phase changed");
        self.emit(ServerEvent::StateChanged(ConnectionPhase::Disconnected));
    }
}

// ── DwgServer ────────────────────────────────────────────────────

/// Handle to a DWG protocol server. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DwgServer {
    pub(crate) inner: Arc<Inner>,
}

impl DwgServer {
    /// Create a stopped server and the receiver for its notifications.
    pub fn new(config: ServerConfig) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (events, rx) = mpsc::channel(config.event_capacity());
        let inner = Inner {
            config,
            session: Mutex::new(Session::new()),
            writer: tokio::sync::Mutex::new(None),
            correlator: Correlator::new(),
            events,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start listening for the gateway and return the bound address.
    pub async fn start(&self) -> Result<SocketAddr, DwgError> {
        let generation = self.inner.session().begin()?;

        let bound = async {
            let listener = TcpListener::bind(self.inner.config.socket_addr()).await?;
            let addr = listener.local_addr()?;
            Ok::<_, std::io::Error>((listener, addr))
        }
        .await;
        let (listener, addr) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                let mut session = self.inner.session();
                if session.generation() == generation {
                    session.reset();
                }
                warn!(addr = %self.inner.config.socket_addr(), error = %e, "bind failed");
                return Err(e.into());
            }
        };

        let token = CancellationToken::new();
        {
            // Stopped while binding.
            let Some(mut session) = self.inner.current_session(generation) else {
                return Err(DwgError::NotRunning);
            };
            session.set_shutdown(token.clone());
        }

        info!(%addr, "listening for gateway");
        self.inner
            .emit(ServerEvent::StateChanged(ConnectionPhase::WaitingForPeer));
        tokio::spawn(connection::serve(
            Arc::clone(&self.inner),
            listener,
            generation,
            token,
        ));
        Ok(addr)
    }

    /// Stop listening or drop the gateway connection.
    ///
    /// Callers waiting in `send_sms`/`send_ussd` fail with
    /// [`DwgError::ConnectionClosed`].
    pub async fn stop(&self) -> Result<(), DwgError> {
        let generation = {
            let mut session = self.inner.session();
            session.phase_mut().stop()?;
            self.inner.shut_down(&mut session);
            session.generation()
        };
        self.inner.release_writer(generation).await;
        info!("server stopped");
        self.inner
            .emit(ServerEvent::StateChanged(ConnectionPhase::Disconnected));
        Ok(())
    }

    // ── Requests ─────────────────────────────────────────────────

    /// Send an SMS through `port` and wait for the gateway's answer.
    pub async fn send_sms(
        &self,
        port: u8,
        number: &str,
        content: &str,
        encoding: SmsEncoding,
    ) -> Result<SendSmsResult, DwgError> {
        self.inner.session().check_port(port)?;
        let request = SendSmsRequest::new(port, number, content, encoding)?;
        let pending = self.inner.correlator.begin_sms()?;

        let outcome = self.exchange(Body::SendSmsRequest(request), pending).await;
        match &outcome {
            Ok(result) => info!(port, number, %result, "SMS send answered"),
            Err(e) => warn!(port, number, error = %e, "SMS send failed"),
        }
        outcome
    }

    /// Run a USSD command on `port` and wait for the gateway's answer.
    ///
    /// The network's reply text arrives later as
    /// [`ServerEvent::UssdReceived`].
    pub async fn send_ussd(
        &self,
        port: u8,
        kind: UssdType,
        content: &str,
    ) -> Result<SendUssdResult, DwgError> {
        self.inner.session().check_port(port)?;
        let request = SendUssdRequest::new(port, kind, content)?;
        let pending = self.inner.correlator.begin_ussd()?;

        let outcome = self.exchange(Body::SendUssdRequest(request), pending).await;
        match &outcome {
            Ok(result) => info!(port, %kind, %result, "USSD send answered"),
            Err(e) => warn!(port, %kind, error = %e, "USSD send failed"),
        }
        outcome
    }

    /// Write `body` and wait for the answer `pending` was reserved for.
    /// The response timeout covers both.
    async fn exchange<T>(&self, body: Body, pending: PendingRequest<T>) -> Result<T, DwgError> {
        let limit = self.inner.config.response_timeout();
        let exchange = async {
            self.inner.send(body).await?;
            pending.wait(limit).await
        };
        tokio::time::timeout(limit, exchange)
            .await
            .unwrap_or(Err(DwgError::Timeout(limit)))
    }

    // ── Snapshots ────────────────────────────────────────────────

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.session().phase()
    }

    /// Port table from the gateway's first status report.
    pub fn ports(&self) -> Vec<PortStatus> {
        self.inner.session().ports().to_vec()
    }

    /// Signal level per port from the latest signal-quality report.
    pub fn signal_levels(&self) -> Vec<u8> {
        self.inner.session().signal_levels().to_vec()
    }

    /// MAC address of the authenticated gateway, zero before that.
    pub fn mac(&self) -> MacAddress {
        self.inner.session().mac()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::correlator::RequestKind;
    use crate::header::ZERO_MAC;

    fn server() -> (DwgServer, mpsc::Receiver<ServerEvent>) {
        let config = ServerConfig::new(0, "svc", "pw1")
            .unwrap()
            .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST));
        DwgServer::new(config)
    }

    /// Open a generation the way `start` does, without a listener.
    fn begin(inner: &Inner) -> (u64, CancellationToken) {
        let mut session = inner.session();
        let generation = session.begin().unwrap();
        let token = CancellationToken::new();
        session.set_shutdown(token.clone());
        (generation, token)
    }

    #[test]
    fn current_session_tracks_generation() {
        let (server, _events) = server();
        let inner = &server.inner;
        let (old, _) = begin(inner);
        assert!(inner.current_session(old).is_some());

        inner.shut_down(&mut inner.session());
        assert!(inner.current_session(old).is_none());

        let (new, _) = begin(inner);
        assert!(inner.current_session(old).is_none());
        assert!(inner.current_session(new).is_some());
        assert!(!inner.transition(old, ConnectionPhase::accept_peer).unwrap());
        assert_eq!(server.phase(), ConnectionPhase::WaitingForPeer);
    }

    #[tokio::test]
    async fn stale_teardown_leaves_next_session_alone() {
        let (server, mut events) = server();
        let inner = &server.inner;
        let (old, old_token) = begin(inner);
        inner.shut_down(&mut inner.session());
        assert!(old_token.is_cancelled());

        let (_, new_token) = begin(inner);
        let _pending = inner.correlator.begin_sms().unwrap();

        inner.teardown(old, Some(DwgError::ConnectionClosed)).await;
        assert!(!new_token.is_cancelled());
        assert!(inner.correlator.is_pending(RequestKind::Sms));
        assert_eq!(server.phase(), ConnectionPhase::WaitingForPeer);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn shut_down_fails_waiting_callers() {
        let (server, _events) = server();
        let inner = &server.inner;
        let (_, token) = begin(inner);
        let pending = inner.correlator.begin_ussd().unwrap();

        inner.shut_down(&mut inner.session());
        assert!(token.is_cancelled());
        assert!(matches!(
            pending.wait(Duration::from_secs(5)).await,
            Err(DwgError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn write_needs_a_live_socket() {
        let (server, _events) = server();
        let inner = &server.inner;
        assert!(matches!(
            inner.write(Body::KeepAlive, ZERO_MAC).await,
            Err(DwgError::ConnectionClosed)
        ));

        begin(inner);
        assert!(matches!(
            inner.send(Body::KeepAlive).await,
            Err(DwgError::ConnectionClosed)
        ));
    }
}
