//! Turns server notifications into log lines.

use std::time::Duration;

use dwg_core::{ReceiptState, ServerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One-line description of an event.
pub fn summarize(event: &ServerEvent) -> String {
    match event {
        ServerEvent::StateChanged(phase) => format!("phase: {phase}"),
        ServerEvent::Error(e) => format!("connection error: {e}"),
        ServerEvent::SmsResult(r) => format!(
            "delivery to {} via port {}: {} ({}/{} slices)",
            r.number, r.port, r.result, r.succeeded_slices, r.total_slices
        ),
        ServerEvent::UssdReceived(u) => {
            format!("USSD on port {} ({}): {}", u.port, u.status, u.content)
        }
        ServerEvent::SmsReceived(s) => format!(
            "SMS from {} on port {} at {}: {}",
            s.number, s.port, s.timestamp, s.content
        ),
        ServerEvent::ReceiptReceived(r) => format!(
            "receipt #{} for {} on port {}: {:?}",
            r.receipt_id,
            r.number,
            r.port,
            r.state()
        ),
    }
}

fn is_problem(event: &ServerEvent) -> bool {
    match event {
        ServerEvent::Error(_) => true,
        ServerEvent::ReceiptReceived(r) => r.state() == ReceiptState::PermanentError,
        _ => false,
    }
}

/// Log every event until the server is dropped.
pub async fn log_events(mut events: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = events.recv().await {
        let line = summarize(&event);
        if is_problem(&event) {
            warn!("{line}");
        } else {
            info!("{line}");
        }
    }
}

/// Give the reporter up to `limit` to drain. Returns whether it finished
/// cleanly.
pub async fn finish(reporter: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, reporter).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("event reporter failed: {e}");
            false
        }
        Err(_) => {
            debug!("event reporter still draining after {limit:?}, exiting anyway");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use dwg_core::{
        ConnectionPhase, DwgError, ReceiveSmsReceiptRequest, SendSmsResult, SendSmsResultRequest,
    };

    fn receipt(status: u8) -> ServerEvent {
        ServerEvent::ReceiptReceived(ReceiveSmsReceiptRequest {
            port: 1,
            number: "555".into(),
            receipt_id: 9,
            timestamp: NaiveDateTime::default(),
            timezone: 0,
            status,
        })
    }

    #[test]
    fn summaries() {
        assert_eq!(
            summarize(&ServerEvent::StateChanged(ConnectionPhase::Connected)),
            "phase: Connected"
        );
        let line = summarize(&ServerEvent::SmsResult(SendSmsResultRequest {
            number_count: 1,
            number: "+100".into(),
            port: 2,
            result: SendSmsResult::PartialSucceed,
            total_slices: 3,
            succeeded_slices: 1,
        }));
        assert_eq!(line, "delivery to +100 via port 2: PartialSucceed (1/3 slices)");
        assert!(summarize(&receipt(0)).contains("Success"));
    }

    #[test]
    fn problems() {
        assert!(is_problem(&ServerEvent::Error(DwgError::ConnectionClosed)));
        assert!(is_problem(&receipt(200)));
        assert!(!is_problem(&receipt(10)));
        assert!(!is_problem(&ServerEvent::StateChanged(
            ConnectionPhase::Disconnected
        )));
    }

    #[tokio::test]
    async fn finish_after_channel_closes() {
        let (tx, rx) = mpsc::channel(4);
        let reporter = tokio::spawn(log_events(rx));
        tx.send(ServerEvent::StateChanged(ConnectionPhase::Connected))
            .await
            .unwrap();
        drop(tx);
        assert!(finish(reporter, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn finish_gives_up_on_stuck_reporter() {
        let (_tx, rx) = mpsc::channel(4);
        let reporter = tokio::spawn(log_events(rx));
        assert!(!finish(reporter, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn finish_reports_crashed_reporter() {
        let reporter: JoinHandle<()> = tokio::spawn(async { panic!("reporter crashed") });
        assert!(!finish(reporter, Duration::from_secs(5)).await);
    }
}
