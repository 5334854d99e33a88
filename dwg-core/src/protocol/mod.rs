//! Message body layouts for every DWG message kind.
//!
//! Each sub-module defines the structured bodies for one protocol domain
//! (authentication, port status, SMS, USSD). Every body implements
//! [`WireBody`] and is carried inside [`Body`], the closed set of variants
//! keyed by [`MessageType`].

pub mod auth;
pub mod sms;
pub mod status;
pub mod ussd;

use bytes::{BufMut, BytesMut};
use chrono::NaiveDateTime;

use crate::error::DwgError;
use crate::message::MessageType;

pub use auth::AuthenticationRequest;
pub use sms::{
    MAX_SMS_CONTENT_LEN, ReceiptState, ReceiveSmsReceiptRequest, ReceiveSmsRequest, SendSmsRequest,
    SendSmsResult, SendSmsResultRequest, SmsEncoding,
};
pub use status::{PortStatus, SignalQualityRequest, StatusRequest};
pub use ussd::{ReceiveUssdRequest, SendUssdRequest, SendUssdResult, UssdStatus, UssdType};

// ── WireBody ─────────────────────────────────────────────────────

/// A message body with a fixed byte layout.
pub trait WireBody: Sized {
    /// Human-readable kind, used in decode errors.
    const KIND: &'static str;

    /// Append the encoded body to `dst`.
    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError>;

    /// Parse a body from exactly the bytes the header declared.
    fn decode(src: &[u8]) -> Result<Self, DwgError>;
}

// ── MessageResult ────────────────────────────────────────────────

/// Generic one-byte outcome used by acknowledgement bodies.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageResult {
    Succeed = 0,
    Fail = 1,
}

impl TryFrom<u8> for MessageResult {
    type Error = DwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageResult::Succeed),
            1 => Ok(MessageResult::Fail),
            _ => Err(DwgError::UnknownVariant {
                type_name: "MessageResult",
                value: value as u64,
            }),
        }
    }
}

impl WireBody for MessageResult {
    const KIND: &'static str = "result";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.put_u8(*self as u8);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        MessageResult::try_from(r.u8("result")?)
    }
}

// ── Body ─────────────────────────────────────────────────────────

/// Every message body, one variant per [`MessageType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    KeepAlive,
    SendSmsRequest(SendSmsRequest),
    SendSmsResponse(SendSmsResult),
    SendSmsResultRequest(SendSmsResultRequest),
    SendSmsResultResponse(MessageResult),
    ReceiveSmsRequest(ReceiveSmsRequest),
    ReceiveSmsResponse(MessageResult),
    StatusRequest(StatusRequest),
    StatusResponse(MessageResult),
    SendUssdRequest(SendUssdRequest),
    SendUssdResponse(SendUssdResult),
    ReceiveUssdRequest(ReceiveUssdRequest),
    ReceiveUssdResponse(MessageResult),
    SignalQualityRequest(SignalQualityRequest),
    SignalQualityResponse(MessageResult),
    AuthenticationRequest(AuthenticationRequest),
    AuthenticationResponse(MessageResult),
    ReceiveSmsReceiptRequest(ReceiveSmsReceiptRequest),
    ReceiveSmsReceiptResponse(MessageResult),
}

impl Body {
    /// The message type this body travels under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Body::KeepAlive => MessageType::KeepAlive,
            Body::SendSmsRequest(_) => MessageType::SendSmsRequest,
            Body::SendSmsResponse(_) => MessageType::SendSmsResponse,
            Body::SendSmsResultRequest(_) => MessageType::SendSmsResultRequest,
            Body::SendSmsResultResponse(_) => MessageType::SendSmsResultResponse,
            Body::ReceiveSmsRequest(_) => MessageType::ReceiveSmsRequest,
            Body::ReceiveSmsResponse(_) => MessageType::ReceiveSmsResponse,
            Body::StatusRequest(_) => MessageType::StatusRequest,
            Body::StatusResponse(_) => MessageType::StatusResponse,
            Body::SendUssdRequest(_) => MessageType::SendUssdRequest,
            Body::SendUssdResponse(_) => MessageType::SendUssdResponse,
            Body::ReceiveUssdRequest(_) => MessageType::ReceiveUssdRequest,
            Body::ReceiveUssdResponse(_) => MessageType::ReceiveUssdResponse,
            Body::SignalQualityRequest(_) => MessageType::SignalQualityRequest,
            Body::SignalQualityResponse(_) => MessageType::SignalQualityResponse,
            Body::AuthenticationRequest(_) => MessageType::AuthenticationRequest,
            Body::AuthenticationResponse(_) => MessageType::AuthenticationResponse,
            Body::ReceiveSmsReceiptRequest(_) => MessageType::ReceiveSmsReceiptRequest,
            Body::ReceiveSmsReceiptResponse(_) => MessageType::ReceiveSmsReceiptResponse,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        match self {
            Body::KeepAlive => Ok(()),
            Body::SendSmsRequest(b) => b.encode(dst),
            Body::SendSmsResponse(b) => b.encode(dst),
            Body::SendSmsResultRequest(b) => b.encode(dst),
            Body::ReceiveSmsRequest(b) => b.encode(dst),
            Body::StatusRequest(b) => b.encode(dst),
            Body::SendUssdRequest(b) => b.encode(dst),
            Body::SendUssdResponse(b) => b.encode(dst),
            Body::ReceiveUssdRequest(b) => b.encode(dst),
            Body::SignalQualityRequest(b) => b.encode(dst),
            Body::AuthenticationRequest(b) => b.encode(dst),
            Body::ReceiveSmsReceiptRequest(b) => b.encode(dst),
            Body::SendSmsResultResponse(r)
            | Body::ReceiveSmsResponse(r)
            | Body::StatusResponse(r)
            | Body::ReceiveUssdResponse(r)
            | Body::SignalQualityResponse(r)
            | Body::AuthenticationResponse(r)
            | Body::ReceiveSmsReceiptResponse(r) => r.encode(dst),
        }
    }

    pub fn decode(ty: MessageType, src: &[u8]) -> Result<Self, DwgError> {
        Ok(match ty {
            MessageType::KeepAlive => Body::KeepAlive,
            MessageType::SendSmsRequest => Body::SendSmsRequest(WireBody::decode(src)?),
            MessageType::SendSmsResponse => Body::SendSmsResponse(WireBody::decode(src)?),
            MessageType::SendSmsResultRequest => {
                Body::SendSmsResultRequest(WireBody::decode(src)?)
            }
            MessageType::SendSmsResultResponse => {
                Body::SendSmsResultResponse(WireBody::decode(src)?)
            }
            MessageType::ReceiveSmsRequest => Body::ReceiveSmsRequest(WireBody::decode(src)?),
            MessageType::ReceiveSmsResponse => Body::ReceiveSmsResponse(WireBody::decode(src)?),
            MessageType::StatusRequest => Body::StatusRequest(WireBody::decode(src)?),
            MessageType::StatusResponse => Body::StatusResponse(WireBody::decode(src)?),
            MessageType::SendUssdRequest => Body::SendUssdRequest(WireBody::decode(src)?),
            MessageType::SendUssdResponse => Body::SendUssdResponse(WireBody::decode(src)?),
            MessageType::ReceiveUssdRequest => Body::ReceiveUssdRequest(WireBody::decode(src)?),
            MessageType::ReceiveUssdResponse => Body::ReceiveUssdResponse(WireBody::decode(src)?),
            MessageType::SignalQualityRequest => {
                Body::SignalQualityRequest(WireBody::decode(src)?)
            }
            MessageType::SignalQualityResponse => {
                Body::SignalQualityResponse(WireBody::decode(src)?)
            }
            MessageType::AuthenticationRequest => {
                Body::AuthenticationRequest(WireBody::decode(src)?)
            }
            MessageType::AuthenticationResponse => {
                Body::AuthenticationResponse(WireBody::decode(src)?)
            }
            MessageType::ReceiveSmsReceiptRequest => {
                Body::ReceiveSmsReceiptRequest(WireBody::decode(src)?)
            }
            MessageType::ReceiveSmsReceiptResponse => {
                Body::ReceiveSmsReceiptResponse(WireBody::decode(src)?)
            }
        })
    }
}

// ── BodyReader ───────────────────────────────────────────────────

/// Bounds-checked cursor over a body slice.
///
/// Every read names the field it is reading so that a short body produces
/// a [`DwgError::MalformedBody`] pointing at the missing field.
pub(crate) struct BodyReader<'a> {
    kind: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    pub(crate) fn new(kind: &'static str, data: &'a [u8]) -> Self {
        Self { kind, data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DwgError> {
        if self.remaining() < len {
            return Err(DwgError::malformed(
                self.kind,
                format!("{field} needs {len} bytes, {} left", self.remaining()),
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, DwgError> {
        Ok(self.take(1, field)?[0])
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, DwgError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// A fixed-width ASCII field, NUL-padded on the wire.
    pub(crate) fn ascii(&mut self, width: usize, field: &'static str) -> Result<String, DwgError> {
        Ok(ascii_field(self.take(width, field)?))
    }

    /// A fixed-width `yyyyMMddHHmmss` timestamp field.
    pub(crate) fn timestamp(
        &mut self,
        width: usize,
        field: &'static str,
    ) -> Result<NaiveDateTime, DwgError> {
        let text = self.ascii(width, field)?;
        NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
            .map_err(|e| DwgError::malformed(self.kind, format!("{field} {text:?}: {e}")))
    }
}

// ── Field helpers ────────────────────────────────────────────────

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Width of timestamp fields: 14 digits plus a NUL terminator.
pub(crate) const TIMESTAMP_FIELD_LEN: usize = 15;

fn ascii_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect::<String>()
        .trim_matches('\0')
        .to_string()
}

/// Check that `value` is ASCII and at most `max` bytes long.
pub(crate) fn check_ascii(value: &str, max: usize, field: &'static str) -> Result<(), DwgError> {
    if !value.is_ascii() {
        return Err(DwgError::NonAsciiField(field));
    }
    if value.len() > max {
        return Err(DwgError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Write `value` into a NUL-padded field of `width` bytes.
pub(crate) fn put_ascii(
    dst: &mut BytesMut,
    value: &str,
    width: usize,
    field: &'static str,
) -> Result<(), DwgError> {
    check_ascii(value, width, field)?;
    dst.put_slice(value.as_bytes());
    dst.put_bytes(0, width - value.len());
    Ok(())
}

pub(crate) fn put_timestamp(dst: &mut BytesMut, timestamp: &NaiveDateTime) {
    let text = timestamp.format(TIMESTAMP_FORMAT).to_string();
    dst.put_slice(text.as_bytes());
    dst.put_bytes(0, TIMESTAMP_FIELD_LEN.saturating_sub(text.len()));
}

/// Length prefix for variable content, which must fit in a `u16`.
pub(crate) fn content_len(len: usize, field: &'static str) -> Result<u16, DwgError> {
    u16::try_from(len).map_err(|_| DwgError::FieldTooLong {
        field,
        max: u16::MAX as usize,
        actual: len,
    })
}
