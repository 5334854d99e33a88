//! # dwg-core
//!
//! Server side of the DWG protocol spoken by GSM SMS/USSD gateways.
//!
//! This crate contains:
//! - **Wire types**: `MessageHeader`, `MessageType`, `Message` and the typed
//!   bodies in [`protocol`]
//! - **Text**: GSM 03.38 7-bit and big-endian UCS-2 conversion
//! - **Codec**: `DwgCodec` for framed TCP I/O via `tokio_util`
//! - **State**: the server `ConnectionPhase` machine and per-gateway `Session`
//! - **Correlator**: single-slot request/response matching with timeouts
//! - **Network**: `DwgServer`, which accepts a gateway and exposes
//!   `send_sms` / `send_ussd` plus a stream of `ServerEvent`s
//! - **Error**: `DwgError`, a typed `thiserror` hierarchy grouped by
//!   `ErrorCategory`

pub mod codec;
pub mod config;
pub mod correlator;
pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod network;
pub mod protocol;
pub mod state;
pub mod text;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::DwgCodec;
pub use config::ServerConfig;
pub use correlator::{Correlator, PendingRequest, RequestKind};
pub use error::{DwgError, ErrorCategory};
pub use frame::{MAX_BODY_SIZE, Message};
pub use header::{HEADER_SIZE, MacAddress, MessageHeader, ZERO_MAC};
pub use message::{Endpoint, MessageType};
pub use network::{DwgServer, ServerEvent};
pub use protocol::{
    AuthenticationRequest, Body, MAX_SMS_CONTENT_LEN, MessageResult, PortStatus, ReceiptState,
    ReceiveSmsReceiptRequest, ReceiveSmsRequest, ReceiveUssdRequest, SendSmsRequest,
    SendSmsResult, SendSmsResultRequest, SendUssdRequest, SendUssdResult, SignalQualityRequest,
    SmsEncoding, StatusRequest, UssdStatus, UssdType, WireBody,
};
pub use state::{ConnectionPhase, Session};
