//! Connection task: accepts the gateway, then reads and answers its
//! messages until the connection ends or the server stops.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedReadHalf;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::DwgCodec;
use crate::error::DwgError;
use crate::frame::Message;
use crate::header::MacAddress;
use crate::network::server::{Inner, ServerEvent};
use crate::protocol::{AuthenticationRequest, Body, MessageResult};
use crate::state::ConnectionPhase;

pub(crate) async fn serve(
    inner: Arc<Inner>,
    listener: TcpListener,
    generation: u64,
    token: CancellationToken,
) {
    let accepted = tokio::select! {
        _ = token.cancelled() => return,
        accepted = listener.accept() => accepted,
    };
    // One gateway per session.
    drop(listener);

    let (stream, peer) = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            error!(error = %e, "accept failed");
            inner.teardown(generation, Some(e.into())).await;
            return;
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "set_nodelay failed");
    }
    info!(%peer, "gateway connected");

    let (read_half, write_half) = stream.into_split();
    if !inner
        .install_writer(
            generation,
            FramedWrite::new(write_half, DwgCodec::server()),
            &token,
        )
        .await
    {
        return;
    }
    match inner.transition(generation, ConnectionPhase::accept_peer) {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            inner.teardown(generation, Some(e)).await;
            return;
        }
    }

    if let Some(interval) = inner.config.keepalive_interval() {
        tokio::spawn(keep_alive(Arc::clone(&inner), interval, token.clone()));
    }

    let reader = FramedRead::new(read_half, DwgCodec::server());
    let failure = tokio::select! {
        _ = token.cancelled() => return,
        failure = read_loop(&inner, generation, reader, peer) => failure,
    };

    if let Some(e) = &failure {
        warn!(%peer, error = %e, "dropping gateway connection");
    }
    inner.teardown(generation, failure).await;
}

/// Read and answer messages until the gateway hangs up or misbehaves.
async fn read_loop(
    inner: &Inner,
    generation: u64,
    mut reader: FramedRead<OwnedReadHalf, DwgCodec>,
    peer: SocketAddr,
) -> Option<DwgError> {
    while let Some(next) = reader.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => return Some(e),
        };
        if let Err(e) = dispatch(inner, generation, message).await {
            return Some(e);
        }
    }
    info!(%peer, "gateway closed the connection");
    None
}

async fn keep_alive(inner: Arc<Inner>, period: std::time::Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = inner.send(Body::KeepAlive).await {
                    debug!(error = %e, "keep-alive stopped");
                    break;
                }
            }
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

async fn dispatch(inner: &Inner, generation: u64, message: Message) -> Result<(), DwgError> {
    let mac = message.mac();
    debug!(kind = %message.message_type(), "received");

    match message.into_body() {
        Body::KeepAlive => inner.send(Body::KeepAlive).await,
        Body::AuthenticationRequest(request) => {
            authenticate(inner, generation, request, mac).await
        }
        body => {
            let authenticated = inner
                .current_session(generation)
                .ok_or(DwgError::ConnectionClosed)?
                .is_authenticated();
            if !authenticated {
                return Err(DwgError::ProtocolViolation(
                    "message received before authentication",
                ));
            }
            handle(inner, generation, body).await
        }
    }
}

async fn authenticate(
    inner: &Inner,
    generation: u64,
    request: AuthenticationRequest,
    mac: MacAddress,
) -> Result<(), DwgError> {
    {
        let session = inner
            .current_session(generation)
            .ok_or(DwgError::ConnectionClosed)?;
        if session.phase() != ConnectionPhase::Authenticating || session.is_authenticated() {
            return Err(DwgError::ProtocolViolation(
                "authentication request outside of the handshake",
            ));
        }
    }

    if !request.matches(inner.config.user(), inner.config.password()) {
        warn!(user = %request.user, "gateway authentication failed");
        if let Err(e) = inner
            .write(Body::AuthenticationResponse(MessageResult::Fail), mac)
            .await
        {
            debug!(error = %e, "could not deliver authentication failure");
        }
        return Err(DwgError::AuthenticationFailed { user: request.user });
    }

    inner
        .current_session(generation)
        .ok_or(DwgError::ConnectionClosed)?
        .authenticate(mac)?;
    info!(user = %request.user, mac = %format_mac(&mac), "gateway authenticated");
    inner
        .send(Body::AuthenticationResponse(MessageResult::Succeed))
        .await
}

async fn handle(inner: &Inner, generation: u64, body: Body) -> Result<(), DwgError> {
    match body {
        Body::StatusRequest(request) => {
            let accepted = inner
                .current_session(generation)
                .ok_or(DwgError::ConnectionClosed)?
                .report_ports(request.ports.clone());
            if accepted {
                info!(ports = ?request.ports, "gateway reported port status");
            } else {
                debug!("ignoring repeated port status report");
            }
            inner
                .send(Body::StatusResponse(MessageResult::Succeed))
                .await
        }
        Body::SignalQualityRequest(request) => {
            let handshaking = {
                let mut session = inner
                    .current_session(generation)
                    .ok_or(DwgError::ConnectionClosed)?;
                session.report_signal(request.levels);
                session.phase() == ConnectionPhase::Authenticating
            };
            inner
                .send(Body::SignalQualityResponse(MessageResult::Succeed))
                .await?;
            if handshaking {
                inner.transition(generation, ConnectionPhase::complete_handshake)?;
            }
            Ok(())
        }
        Body::SendSmsResponse(result) => {
            if !inner.correlator.complete_sms(result) {
                warn!(%result, "send-SMS response with no request outstanding");
            }
            Ok(())
        }
        Body::SendUssdResponse(result) => {
            if !inner.correlator.complete_ussd(result) {
                warn!(%result, "send-USSD response with no request outstanding");
            }
            Ok(())
        }
        Body::SendSmsResultRequest(request) => {
            info!(
                port = request.port,
                number = %request.number,
                result = %request.result,
                slices = request.total_slices,
                succeeded = request.succeeded_slices,
                "SMS delivery result"
            );
            inner
                .send(Body::SendSmsResultResponse(MessageResult::Succeed))
                .await?;
            inner.emit(ServerEvent::SmsResult(request));
            Ok(())
        }
        Body::ReceiveSmsRequest(request) => {
            info!(port = request.port, number = %request.number, "SMS received");
            inner
                .send(Body::ReceiveSmsResponse(MessageResult::Succeed))
                .await?;
            inner.emit(ServerEvent::SmsReceived(request));
            Ok(())
        }
        Body::ReceiveUssdRequest(request) => {
            info!(port = request.port, status = %request.status, "USSD received");
            inner
                .send(Body::ReceiveUssdResponse(MessageResult::Succeed))
                .await?;
            inner.emit(ServerEvent::UssdReceived(request));
            Ok(())
        }
        Body::ReceiveSmsReceiptRequest(request) => {
            info!(
                port = request.port,
                number = %request.number,
                receipt = request.receipt_id,
                state = ?request.state(),
                "SMS receipt received"
            );
            inner
                .send(Body::ReceiveSmsReceiptResponse(MessageResult::Succeed))
                .await?;
            inner.emit(ServerEvent::ReceiptReceived(request));
            Ok(())
        }
        other => {
            warn!(kind = %other.message_type(), "unexpected message from gateway");
            Err(DwgError::ProtocolViolation("unexpected message from gateway"))
        }
    }
}

fn format_mac(mac: &MacAddress) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::network::server::DwgServer;
    use crate::protocol::{PortStatus, SignalQualityRequest, StatusRequest};

    #[tokio::test]
    async fn stale_reports_leave_next_session_alone() {
        let (server, _events) = DwgServer::new(ServerConfig::new(0, "svc", "pw1").unwrap());
        let inner = &server.inner;
        let old = inner.session().begin().unwrap();
        inner.session().reset();
        let new = inner.session().begin().unwrap();
        inner.session().phase_mut().accept_peer().unwrap();

        let status = Body::StatusRequest(StatusRequest {
            ports: vec![PortStatus::Works],
        });
        assert!(matches!(
            handle(inner, old, status).await,
            Err(DwgError::ConnectionClosed)
        ));
        let signal = Body::SignalQualityRequest(SignalQualityRequest { levels: vec![30] });
        assert!(matches!(
            handle(inner, old, signal).await,
            Err(DwgError::ConnectionClosed)
        ));

        let session = inner.session();
        assert_eq!(session.generation(), new);
        assert!(session.ports().is_empty());
        assert!(session.signal_levels().is_empty());
        assert_eq!(session.phase(), ConnectionPhase::Authenticating);
    }

    #[test]
    fn mac_formatting() {
        assert_eq!(format_mac(&[0, 0x1f, 0xd6, 0xab, 1, 255]), "00:1f:d6:ab:01:ff");
    }
}
