//! Domain-specific error types for the DWG protocol engine.
//!
//! All fallible operations return `Result<T, DwgError>`.
//! No panics on invalid input. Every error is typed and recoverable,
//! and every variant belongs to exactly one [`ErrorCategory`].

use std::time::Duration;
use thiserror::Error;

use crate::correlator::RequestKind;

/// The canonical error type for the DWG protocol engine.
#[derive(Debug, Error)]
pub enum DwgError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The header names a message type this endpoint does not decode.
    #[error("unsupported message type: {0:#06x}")]
    UnsupportedMessageType(u16),

    /// Fewer than 24 header bytes were supplied.
    #[error("truncated header: {0} bytes")]
    TruncatedHeader(usize),

    /// The header declares more body bytes than are available.
    #[error("body length mismatch: header declares {declared} bytes, {available} available")]
    BodyLengthMismatch { declared: usize, available: usize },

    /// A body could not be parsed according to its layout.
    #[error("malformed {kind} body: {reason}")]
    MalformedBody { kind: &'static str, reason: String },

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A message arrived that is not legal in the current session phase.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Text Errors ──────────────────────────────────────────────
    /// A character has no representation in the chosen text encoding.
    #[error("character {0:?} is not representable in the GSM 7-bit alphabet")]
    UnsupportedCharacter(char),

    /// Encoded text bytes could not be decoded.
    #[error("malformed text: {0}")]
    MalformedText(&'static str),

    // ── Field Errors ─────────────────────────────────────────────
    /// A fixed-width field was given a value longer than it can hold.
    #[error("{field} too long: {actual} bytes (max {max})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// A field holds characters outside of its allowed alphabet.
    #[error("invalid {0}: only ASCII is allowed")]
    NonAsciiField(&'static str),

    // ── Authentication Errors ────────────────────────────────────
    /// The gateway presented credentials that do not match the configuration.
    #[error("authentication failed for user {user:?}")]
    AuthenticationFailed { user: String },

    // ── Operation Errors ─────────────────────────────────────────
    /// The operation is not allowed in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// The target port exists but cannot currently send.
    #[error("port {port} is unavailable")]
    PortUnavailable { port: u8 },

    /// Encoded content exceeds the protocol's size ceiling.
    #[error("message too long: {size} bytes (max {max})")]
    MessageTooLong { size: usize, max: usize },

    /// A request of the same kind is already awaiting its response.
    #[error("a {0} request is already in progress")]
    OperationInProgress(RequestKind),

    // ── Timeout Errors ───────────────────────────────────────────
    /// No correlated response arrived within the configured window.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// `start` was called while the server is already running.
    #[error("server is already started")]
    AlreadyStarted,

    /// `stop` was called while the server is not running.
    #[error("server is not running")]
    NotRunning,

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The gateway connection went away while a request was pending.
    #[error("connection closed")]
    ConnectionClosed,

    // ── Configuration Errors ─────────────────────────────────────
    /// The server configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ── ErrorCategory ─────────────────────────────────────────────────

/// Coarse classification of a [`DwgError`], deciding what happens to the
/// connection when it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or illegal inbound traffic; the connection is torn down.
    Protocol,
    /// Credential mismatch; the connection is torn down.
    Authentication,
    /// Caller precondition violation; the connection is unaffected.
    Operation,
    /// No response in time; the request slot is released.
    Timeout,
    /// `start`/`stop` called in the wrong state.
    Lifecycle,
    /// Transport failure or closed connection.
    Connection,
    /// Rejected configuration.
    Configuration,
}

impl DwgError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownVariant { .. }
            | Self::UnsupportedMessageType(_)
            | Self::TruncatedHeader(_)
            | Self::BodyLengthMismatch { .. }
            | Self::MalformedBody { .. }
            | Self::FrameTooLarge { .. }
            | Self::ProtocolViolation(_)
            | Self::MalformedText(_) => ErrorCategory::Protocol,

            Self::AuthenticationFailed { .. } => ErrorCategory::Authentication,

            Self::UnsupportedCharacter(_)
            | Self::FieldTooLong { .. }
            | Self::NonAsciiField(_)
            | Self::InvalidOperation(_)
            | Self::PortUnavailable { .. }
            | Self::MessageTooLong { .. }
            | Self::OperationInProgress(_) => ErrorCategory::Operation,

            Self::Timeout(_) => ErrorCategory::Timeout,

            Self::AlreadyStarted | Self::NotRunning => ErrorCategory::Lifecycle,

            Self::Connection(_) | Self::ConnectionClosed => ErrorCategory::Connection,

            Self::InvalidConfiguration(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns `true` if this error must close the gateway connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Protocol | ErrorCategory::Authentication | ErrorCategory::Connection
        )
    }

    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedBody {
            kind,
            reason: reason.into(),
        }
    }
}
