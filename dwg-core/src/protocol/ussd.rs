//! USSD bodies: outbound commands, their immediate result, and network
//! answers forwarded by the gateway.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::DwgError;
use crate::protocol::{BodyReader, WireBody, content_len};
use crate::text;

/// Encoding tag the gateway places in front of USSD answers.
const UCS2_TAG: u8 = 1;

// ── UssdType ─────────────────────────────────────────────────────

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UssdType {
    /// Start or continue a USSD session.
    #[default]
    Send = 1,
    /// Close the current USSD session.
    EndSession = 2,
}

impl TryFrom<u8> for UssdType {
    type Error = DwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UssdType::Send),
            2 => Ok(UssdType::EndSession),
            _ => Err(DwgError::UnknownVariant {
                type_name: "UssdType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for UssdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── SendUssdResult ───────────────────────────────────────────────

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendUssdResult {
    Succeed = 0,
    Fail = 1,
    Timeout = 2,
    BadRequest = 3,
    PortUnavailable = 4,
    OtherError = 255,
}

impl From<u8> for SendUssdResult {
    fn from(value: u8) -> Self {
        match value {
            0 => SendUssdResult::Succeed,
            1 => SendUssdResult::Fail,
            2 => SendUssdResult::Timeout,
            3 => SendUssdResult::BadRequest,
            4 => SendUssdResult::PortUnavailable,
            _ => SendUssdResult::OtherError,
        }
    }
}

impl fmt::Display for SendUssdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl WireBody for SendUssdResult {
    const KIND: &'static str = "send USSD response";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.put_u8(*self as u8);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        Ok(SendUssdResult::from(r.u8("result")?))
    }
}

// ── UssdStatus ───────────────────────────────────────────────────

/// Session state reported alongside a USSD answer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UssdStatus {
    NoFurtherActionRequired = 0,
    FurtherActionRequired = 1,
    TerminatedByNetwork = 2,
    OtherLocalClientResponded = 3,
    OperationNotSupported = 4,
    NetworkTimeout = 5,
}

impl TryFrom<u8> for UssdStatus {
    type Error = DwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UssdStatus::NoFurtherActionRequired),
            1 => Ok(UssdStatus::FurtherActionRequired),
            2 => Ok(UssdStatus::TerminatedByNetwork),
            3 => Ok(UssdStatus::OtherLocalClientResponded),
            4 => Ok(UssdStatus::OperationNotSupported),
            5 => Ok(UssdStatus::NetworkTimeout),
            _ => Err(DwgError::UnknownVariant {
                type_name: "UssdStatus",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for UssdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── SendUssdRequest ──────────────────────────────────────────────

/// Server → gateway: run a USSD command on one port.
///
/// ```text
/// [0]       port
/// [1]       USSD type
/// [2..4)    content length, u16 big-endian
/// [4..]     content, ASCII
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendUssdRequest {
    pub port: u8,
    pub kind: UssdType,
    pub content: String,
}

impl SendUssdRequest {
    pub fn new(port: u8, kind: UssdType, content: impl Into<String>) -> Result<Self, DwgError> {
        let req = Self {
            port,
            kind,
            content: content.into(),
        };
        req.validate()?;
        Ok(req)
    }

    fn validate(&self) -> Result<u16, DwgError> {
        if !self.content.is_ascii() {
            return Err(DwgError::NonAsciiField("content"));
        }
        content_len(self.content.len(), "content")
    }
}

impl WireBody for SendUssdRequest {
    const KIND: &'static str = "send USSD request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        let len = self.validate()?;
        dst.put_u8(self.port);
        dst.put_u8(self.kind as u8);
        dst.put_u16(len);
        dst.put_slice(self.content.as_bytes());
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let port = r.u8("port")?;
        let kind = UssdType::try_from(r.u8("USSD type")?)?;
        let len = r.u16("content length")? as usize;
        let raw = r.take(len, "content")?;
        let content = std::str::from_utf8(raw)
            .ok()
            .filter(|s| s.is_ascii())
            .ok_or_else(|| DwgError::malformed(Self::KIND, "content is not ASCII"))?
            .to_string();
        Ok(Self {
            port,
            kind,
            content,
        })
    }
}

// ── ReceiveUssdRequest ───────────────────────────────────────────

/// Gateway → server: the network's answer to a USSD command.
///
/// ```text
/// [0]       port
/// [1]       status
/// [2..4)    content length in bytes, u16 big-endian
/// [4]       encoding tag
/// [5..]     content, big-endian UCS-2
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveUssdRequest {
    pub port: u8,
    pub status: UssdStatus,
    pub content: String,
}

impl WireBody for ReceiveUssdRequest {
    const KIND: &'static str = "receive USSD request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        let content = text::encode_ucs2(&self.content);
        dst.put_u8(self.port);
        dst.put_u8(self.status as u8);
        dst.put_u16(content_len(content.len(), "content")?);
        dst.put_u8(UCS2_TAG);
        dst.put_slice(&content);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let port = r.u8("port")?;
        let status = UssdStatus::try_from(r.u8("status")?)?;
        let len = r.u16("content length")? as usize;
        let _encoding = r.u8("encoding")?;
        let content = text::decode_ucs2(r.take(len, "content")?)?;
        Ok(Self {
            port,
            status,
            content,
        })
    }
}
