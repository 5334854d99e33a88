//! Request/response correlation for outbound SMS and USSD sends.
//!
//! The protocol carries no request ids, so at most one request of each kind
//! may be in flight. A caller reserves the slot, writes the request and
//! waits on the returned [`PendingRequest`]; the read loop completes the
//! slot when the matching response arrives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::DwgError;
use crate::protocol::{SendSmsResult, SendUssdResult};

// ── RequestKind ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Sms,
    Ussd,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Sms => f.write_str("SMS"),
            RequestKind::Ussd => f.write_str("USSD"),
        }
    }
}

// ── Slot ─────────────────────────────────────────────────────────

type Completion<T> = oneshot::Sender<Result<T, DwgError>>;

#[derive(Debug)]
struct Slot<T> {
    kind: RequestKind,
    next_id: AtomicU64,
    pending: Mutex<Option<(u64, Completion<T>)>>,
}

impl<T> Slot<T> {
    fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<(u64, Completion<T>)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(self: &Arc<Self>) -> Result<PendingRequest<T>, DwgError> {
        let mut pending = self.lock();
        if pending.is_some() {
            return Err(DwgError::OperationInProgress(self.kind));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *pending = Some((id, tx));
        Ok(PendingRequest {
            slot: Arc::clone(self),
            id,
            rx,
        })
    }

    fn complete(&self, outcome: Result<T, DwgError>) -> bool {
        match self.lock().take() {
            Some((_, tx)) => {
                // The waiter may already have given up.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    fn release(&self, id: u64) {
        let mut pending = self.lock();
        if matches!(&*pending, Some((owner, _)) if *owner == id) {
            *pending = None;
        }
    }

    fn is_pending(&self) -> bool {
        self.lock().is_some()
    }
}

// ── PendingRequest ───────────────────────────────────────────────

/// A reserved slot awaiting its response.
///
/// Dropping it without a response frees the slot for the next caller.
#[derive(Debug)]
pub struct PendingRequest<T> {
    slot: Arc<Slot<T>>,
    id: u64,
    rx: oneshot::Receiver<Result<T, DwgError>>,
}

impl<T> PendingRequest<T> {
    pub fn kind(&self) -> RequestKind {
        self.slot.kind
    }

    /// Wait up to `limit` for the response.
    pub async fn wait(mut self, limit: Duration) -> Result<T, DwgError> {
        match tokio::time::timeout(limit, &mut self.rx).await {
            Err(_elapsed) => Err(DwgError::Timeout(limit)),
            Ok(Err(_closed)) => Err(DwgError::ConnectionClosed),
            Ok(Ok(outcome)) => outcome,
        }
    }
}

impl<T> Drop for PendingRequest<T> {
    fn drop(&mut self) {
        self.slot.release(self.id);
    }
}

// ── Correlator ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct Correlator {
    sms: Arc<Slot<SendSmsResult>>,
    ussd: Arc<Slot<SendUssdResult>>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            sms: Arc::new(Slot::new(RequestKind::Sms)),
            ussd: Arc::new(Slot::new(RequestKind::Ussd)),
        }
    }

    pub fn begin_sms(&self) -> Result<PendingRequest<SendSmsResult>, DwgError> {
        self.sms.reserve()
    }

    pub fn begin_ussd(&self) -> Result<PendingRequest<SendUssdResult>, DwgError> {
        self.ussd.reserve()
    }

    /// Hand a send-SMS response to its waiter. Returns `false` if nobody
    /// was waiting.
    pub fn complete_sms(&self, result: SendSmsResult) -> bool {
        self.sms.complete(Ok(result))
    }

    pub fn complete_ussd(&self, result: SendUssdResult) -> bool {
        self.ussd.complete(Ok(result))
    }

    /// Fail every waiter with [`DwgError::ConnectionClosed`].
    pub fn cancel_all(&self) {
        self.sms.complete(Err(DwgError::ConnectionClosed));
        self.ussd.complete(Err(DwgError::ConnectionClosed));
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Sms => self.sms.is_pending(),
            RequestKind::Ussd => self.ussd.is_pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn response_completes_waiter() {
        let c = Correlator::new();
        let pending = c.begin_sms().unwrap();
        assert!(c.is_pending(RequestKind::Sms));

        assert!(c.complete_sms(SendSmsResult::Succeed));
        assert_eq!(pending.wait(LONG).await.unwrap(), SendSmsResult::Succeed);
        assert!(!c.is_pending(RequestKind::Sms));
    }

    #[tokio::test]
    async fn second_request_of_same_kind_is_rejected() {
        let c = Correlator::new();
        let _first = c.begin_sms().unwrap();
        assert!(matches!(
            c.begin_sms(),
            Err(DwgError::OperationInProgress(RequestKind::Sms))
        ));
        // Other kinds are independent.
        let _ussd = c.begin_ussd().unwrap();
    }

    #[tokio::test]
    async fn slot_reopens_after_completion() {
        let c = Correlator::new();
        let first = c.begin_ussd().unwrap();
        c.complete_ussd(SendUssdResult::Fail);
        assert_eq!(first.wait(LONG).await.unwrap(), SendUssdResult::Fail);
        assert!(c.begin_ussd().is_ok());
    }

    #[tokio::test]
    async fn timeout_frees_slot() {
        let c = Correlator::new();
        let pending = c.begin_sms().unwrap();
        let limit = Duration::from_millis(50);
        assert!(matches!(
            pending.wait(limit).await,
            Err(DwgError::Timeout(d)) if d == limit
        ));
        assert!(!c.is_pending(RequestKind::Sms));
        assert!(c.begin_sms().is_ok());
    }

    #[tokio::test]
    async fn cancel_all_closes_waiters() {
        let c = Correlator::new();
        let sms = c.begin_sms().unwrap();
        let ussd = c.begin_ussd().unwrap();
        c.cancel_all();
        assert!(matches!(
            sms.wait(LONG).await,
            Err(DwgError::ConnectionClosed)
        ));
        assert!(matches!(
            ussd.wait(LONG).await,
            Err(DwgError::ConnectionClosed)
        ));
    }

    #[test]
    fn uncorrelated_response_is_reported() {
        let c = Correlator::new();
        assert!(!c.complete_sms(SendSmsResult::Succeed));
        assert!(!c.complete_ussd(SendUssdResult::Succeed));
    }

    #[test]
    fn stale_guard_does_not_release_newer_request() {
        let c = Correlator::new();
        let first = c.begin_sms().unwrap();
        c.complete_sms(SendSmsResult::Succeed);
        let _second = c.begin_sms().unwrap();
        drop(first);
        assert!(c.is_pending(RequestKind::Sms));
    }
}
