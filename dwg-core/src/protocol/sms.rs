//! SMS bodies: outbound send requests, delivery results, inbound messages
//! and delivery receipts.

use std::fmt;

use bytes::{BufMut, BytesMut};
use chrono::NaiveDateTime;

use crate::error::DwgError;
use crate::protocol::{
    BodyReader, TIMESTAMP_FIELD_LEN, WireBody, check_ascii, content_len, put_ascii, put_timestamp,
};
use crate::text;

/// Largest SMS content, in encoded bytes, a single send request may carry.
pub const MAX_SMS_CONTENT_LEN: usize = 1340;

/// Width of the phone number field in send, result and inbound bodies.
pub const NUMBER_FIELD_LEN: usize = 24;

/// Width of the phone number field in delivery receipts.
pub const RECEIPT_NUMBER_FIELD_LEN: usize = 23;

/// The only message type the gateway understands in SMS bodies.
const MESSAGE_TYPE_SMS: u8 = 0;

// ── SmsEncoding ──────────────────────────────────────────────────

/// Text encoding tag carried in SMS bodies.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SmsEncoding {
    /// GSM 03.38 7-bit alphabet, one index per byte.
    Gsm7Bit = 0,
    /// Big-endian UCS-2.
    #[default]
    Unicode = 1,
}

impl TryFrom<u8> for SmsEncoding {
    type Error = DwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SmsEncoding::Gsm7Bit),
            1 => Ok(SmsEncoding::Unicode),
            _ => Err(DwgError::UnknownVariant {
                type_name: "SmsEncoding",
                value: value as u64,
            }),
        }
    }
}

impl SmsEncoding {
    pub fn encode(&self, content: &str) -> Result<Vec<u8>, DwgError> {
        match self {
            SmsEncoding::Gsm7Bit => text::encode_gsm7(content),
            SmsEncoding::Unicode => Ok(text::encode_ucs2(content)),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, DwgError> {
        match self {
            SmsEncoding::Gsm7Bit => text::decode_gsm7(bytes),
            SmsEncoding::Unicode => text::decode_ucs2(bytes),
        }
    }

    /// Encoded size of `content` in this encoding.
    pub fn encoded_len(&self, content: &str) -> Result<usize, DwgError> {
        match self {
            SmsEncoding::Gsm7Bit => text::gsm7_len(content),
            SmsEncoding::Unicode => Ok(text::ucs2_len(content)),
        }
    }
}

// ── SendSmsResult ────────────────────────────────────────────────

/// Outcome of sending an SMS, reported in send responses and delivery
/// results.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendSmsResult {
    Succeed = 0,
    Fail = 1,
    Timeout = 2,
    BadRequest = 3,
    PortUnavailable = 4,
    /// Only some slices of a multi-part message went out.
    PartialSucceed = 5,
    OtherError = 255,
}

impl From<u8> for SendSmsResult {
    fn from(value: u8) -> Self {
        match value {
            0 => SendSmsResult::Succeed,
            1 => SendSmsResult::Fail,
            2 => SendSmsResult::Timeout,
            3 => SendSmsResult::BadRequest,
            4 => SendSmsResult::PortUnavailable,
            5 => SendSmsResult::PartialSucceed,
            _ => SendSmsResult::OtherError,
        }
    }
}

impl fmt::Display for SendSmsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl WireBody for SendSmsResult {
    const KIND: &'static str = "send SMS response";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.put_u8(*self as u8);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        Ok(SendSmsResult::from(r.u8("result")?))
    }
}

// ── SendSmsRequest ───────────────────────────────────────────────

/// Server → gateway: send one SMS to one number.
///
/// ```text
/// [0]        port
/// [1]        encoding flag
/// [2]        message type (always SMS)
/// [3]        number count (always 1)
/// [4..28)    number, ASCII NUL-padded
/// [28..30)   content length, u16 big-endian
/// [30..]     content
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSmsRequest {
    pub port: u8,
    pub encoding: SmsEncoding,
    pub number: String,
    pub content: String,
}

impl SendSmsRequest {
    /// Build a request, rejecting numbers and content the wire cannot carry.
    pub fn new(
        port: u8,
        number: impl Into<String>,
        content: impl Into<String>,
        encoding: SmsEncoding,
    ) -> Result<Self, DwgError> {
        let req = Self {
            port,
            encoding,
            number: number.into(),
            content: content.into(),
        };
        req.validate()?;
        Ok(req)
    }

    fn validate(&self) -> Result<usize, DwgError> {
        check_ascii(&self.number, NUMBER_FIELD_LEN, "number")?;
        let size = self.encoding.encoded_len(&self.content)?;
        if size > MAX_SMS_CONTENT_LEN {
            return Err(DwgError::MessageTooLong {
                size,
                max: MAX_SMS_CONTENT_LEN,
            });
        }
        Ok(size)
    }
}

impl WireBody for SendSmsRequest {
    const KIND: &'static str = "send SMS request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        self.validate()?;
        let content = self.encoding.encode(&self.content)?;
        dst.put_u8(self.port);
        dst.put_u8(self.encoding as u8);
        dst.put_u8(MESSAGE_TYPE_SMS);
        dst.put_u8(1);
        put_ascii(dst, &self.number, NUMBER_FIELD_LEN, "number")?;
        dst.put_u16(content_len(content.len(), "content")?);
        dst.put_slice(&content);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let port = r.u8("port")?;
        let encoding = SmsEncoding::try_from(r.u8("encoding")?)?;
        let _message_type = r.u8("message type")?;
        let _number_count = r.u8("number count")?;
        let number = r.ascii(NUMBER_FIELD_LEN, "number")?;
        let len = r.u16("content length")? as usize;
        let content = encoding.decode(r.take(len, "content")?)?;
        Ok(Self {
            port,
            encoding,
            number,
            content,
        })
    }
}

// ── SendSmsResultRequest ─────────────────────────────────────────

/// Gateway → server: final delivery outcome of a previously sent SMS.
///
/// ```text
/// [0]        number count
/// [1..25)    number
/// [25]       port
/// [26]       result
/// [27]       slice count
/// [28]       succeeded slices
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSmsResultRequest {
    pub number_count: u8,
    pub number: String,
    pub port: u8,
    pub result: SendSmsResult,
    pub total_slices: u8,
    pub succeeded_slices: u8,
}

impl WireBody for SendSmsResultRequest {
    const KIND: &'static str = "send SMS result request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.put_u8(self.number_count);
        put_ascii(dst, &self.number, NUMBER_FIELD_LEN, "number")?;
        dst.put_u8(self.port);
        dst.put_u8(self.result as u8);
        dst.put_u8(self.total_slices);
        dst.put_u8(self.succeeded_slices);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        Ok(Self {
            number_count: r.u8("number count")?,
            number: r.ascii(NUMBER_FIELD_LEN, "number")?,
            port: r.u8("port")?,
            result: SendSmsResult::from(r.u8("result")?),
            total_slices: r.u8("slice count")?,
            succeeded_slices: r.u8("succeeded slices")?,
        })
    }
}

// ── ReceiveSmsRequest ────────────────────────────────────────────

/// Gateway → server: an SMS arrived on one of the gateway's ports.
///
/// ```text
/// [0..24)    sender number
/// [24]       message type
/// [25]       port
/// [26..41)   timestamp yyyyMMddHHmmss
/// [41]       timezone
/// [42]       encoding tag
/// [43..45)   content length, u16 big-endian
/// [45..]     content
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSmsRequest {
    pub number: String,
    pub port: u8,
    pub timestamp: NaiveDateTime,
    pub timezone: u8,
    pub encoding: SmsEncoding,
    pub content: String,
}

impl WireBody for ReceiveSmsRequest {
    const KIND: &'static str = "receive SMS request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        let content = self.encoding.encode(&self.content)?;
        put_ascii(dst, &self.number, NUMBER_FIELD_LEN, "number")?;
        dst.put_u8(MESSAGE_TYPE_SMS);
        dst.put_u8(self.port);
        put_timestamp(dst, &self.timestamp);
        dst.put_u8(self.timezone);
        dst.put_u8(self.encoding as u8);
        dst.put_u16(content_len(content.len(), "content")?);
        dst.put_slice(&content);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let number = r.ascii(NUMBER_FIELD_LEN, "number")?;
        let _message_type = r.u8("message type")?;
        let port = r.u8("port")?;
        let timestamp = r.timestamp(TIMESTAMP_FIELD_LEN, "timestamp")?;
        let timezone = r.u8("timezone")?;
        let encoding = SmsEncoding::try_from(r.u8("encoding")?)?;
        let len = r.u16("content length")? as usize;
        let content = encoding.decode(r.take(len, "content")?)?;
        Ok(Self {
            number,
            port,
            timestamp,
            timezone,
            encoding,
            content,
        })
    }
}

// ── ReceiveSmsReceiptRequest ─────────────────────────────────────

/// Delivery state derived from a receipt's raw status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptState {
    Success,
    TemporaryError,
    PermanentError,
}

impl From<u8> for ReceiptState {
    fn from(status: u8) -> Self {
        match status {
            0..=31 => ReceiptState::Success,
            32..=63 => ReceiptState::TemporaryError,
            _ => ReceiptState::PermanentError,
        }
    }
}

/// Gateway → server: SMS delivery receipt from the network.
///
/// ```text
/// [0]        port
/// [1..24)    number
/// [24]       receipt id
/// [25..40)   timestamp yyyyMMddHHmmss
/// [40]       timezone
/// [41]       raw status
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSmsReceiptRequest {
    pub port: u8,
    pub number: String,
    pub receipt_id: u8,
    pub timestamp: NaiveDateTime,
    pub timezone: u8,
    pub status: u8,
}

impl ReceiveSmsReceiptRequest {
    pub fn state(&self) -> ReceiptState {
        ReceiptState::from(self.status)
    }
}

impl WireBody for ReceiveSmsReceiptRequest {
    const KIND: &'static str = "SMS receipt request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.put_u8(self.port);
        put_ascii(dst, &self.number, RECEIPT_NUMBER_FIELD_LEN, "number")?;
        dst.put_u8(self.receipt_id);
        put_timestamp(dst, &self.timestamp);
        dst.put_u8(self.timezone);
        dst.put_u8(self.status);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        Ok(Self {
            port: r.u8("port")?,
            number: r.ascii(RECEIPT_NUMBER_FIELD_LEN, "number")?,
            receipt_id: r.u8("receipt id")?,
            timestamp: r.timestamp(TIMESTAMP_FIELD_LEN, "timestamp")?,
            timezone: r.u8("timezone")?,
            status: r.u8("status")?,
        })
    }
}
