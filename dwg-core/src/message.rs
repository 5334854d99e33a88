//! Message type identifiers and the direction each one travels in.
//!
//! Unknown values become `DwgError::UnknownVariant` through `TryFrom`, never a panic.

use crate::error::DwgError;
use std::fmt;

// ── MessageType ──────────────────────────────────────────────────

/// Every message type understood by the DWG protocol.
///
/// Requests and responses come in adjacent pairs; the gateway originates
/// the odd-numbered requests except for `SendSmsRequest` and
/// `SendUssdRequest`, which the server originates.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Empty keep-alive, sent in both directions.
    KeepAlive = 0x00,

    /// Server asks the gateway to send an SMS.
    SendSmsRequest = 0x01,
    SendSmsResponse = 0x02,

    /// Gateway reports the final delivery outcome of a sent SMS.
    SendSmsResultRequest = 0x03,
    SendSmsResultResponse = 0x04,

    /// Gateway forwards an SMS received on one of its ports.
    ReceiveSmsRequest = 0x05,
    ReceiveSmsResponse = 0x06,

    /// Gateway reports the status of each of its ports.
    StatusRequest = 0x07,
    StatusResponse = 0x08,

    /// Server asks the gateway to send a USSD command.
    SendUssdRequest = 0x09,
    SendUssdResponse = 0x0A,

    /// Gateway forwards the network's USSD answer.
    ReceiveUssdRequest = 0x0B,
    ReceiveUssdResponse = 0x0C,

    /// Gateway reports per-port signal quality (CSQ/RSSI).
    SignalQualityRequest = 0x0D,
    SignalQualityResponse = 0x0E,

    /// Gateway presents its credentials.
    AuthenticationRequest = 0x0F,
    AuthenticationResponse = 0x10,

    /// Gateway forwards an SMS delivery receipt.
    ReceiveSmsReceiptRequest = 0x11,
    ReceiveSmsReceiptResponse = 0x12,
}

impl TryFrom<u16> for MessageType {
    type Error = DwgError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::KeepAlive),
            0x01 => Ok(MessageType::SendSmsRequest),
            0x02 => Ok(MessageType::SendSmsResponse),
            0x03 => Ok(MessageType::SendSmsResultRequest),
            0x04 => Ok(MessageType::SendSmsResultResponse),
            0x05 => Ok(MessageType::ReceiveSmsRequest),
            0x06 => Ok(MessageType::ReceiveSmsResponse),
            0x07 => Ok(MessageType::StatusRequest),
            0x08 => Ok(MessageType::StatusResponse),
            0x09 => Ok(MessageType::SendUssdRequest),
            0x0A => Ok(MessageType::SendUssdResponse),
            0x0B => Ok(MessageType::ReceiveUssdRequest),
            0x0C => Ok(MessageType::ReceiveUssdResponse),
            0x0D => Ok(MessageType::SignalQualityRequest),
            0x0E => Ok(MessageType::SignalQualityResponse),
            0x0F => Ok(MessageType::AuthenticationRequest),
            0x10 => Ok(MessageType::AuthenticationResponse),
            0x11 => Ok(MessageType::ReceiveSmsReceiptRequest),
            0x12 => Ok(MessageType::ReceiveSmsReceiptResponse),
            _ => Err(DwgError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl MessageType {
    /// Returns `true` for messages the gateway sends to the server.
    ///
    /// Keep-alive travels both ways and counts as gateway-originated too.
    pub fn is_gateway_originated(&self) -> bool {
        matches!(
            self,
            MessageType::KeepAlive
                | MessageType::AuthenticationRequest
                | MessageType::StatusRequest
                | MessageType::SignalQualityRequest
                | MessageType::SendSmsResponse
                | MessageType::SendSmsResultRequest
                | MessageType::SendUssdResponse
                | MessageType::ReceiveUssdRequest
                | MessageType::ReceiveSmsRequest
                | MessageType::ReceiveSmsReceiptRequest
        )
    }
}

// ── Endpoint ─────────────────────────────────────────────────────

/// Which side of the connection a decoder is running on.
///
/// An endpoint only decodes the messages its peer is allowed to send;
/// anything else is rejected as an unsupported message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endpoint {
    /// The SMS server: decodes gateway-originated messages.
    #[default]
    Server,
    /// The gateway appliance (or a simulator): decodes server-originated
    /// messages.
    Gateway,
}

impl Endpoint {
    /// Returns `true` if this endpoint accepts inbound messages of `ty`.
    pub fn decodes(&self, ty: MessageType) -> bool {
        match self {
            Endpoint::Server => ty.is_gateway_originated(),
            Endpoint::Gateway => ty == MessageType::KeepAlive || !ty.is_gateway_originated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MessageType; 19] = [
        MessageType::KeepAlive,
        MessageType::SendSmsRequest,
        MessageType::SendSmsResponse,
        MessageType::SendSmsResultRequest,
        MessageType::SendSmsResultResponse,
        MessageType::ReceiveSmsRequest,
        MessageType::ReceiveSmsResponse,
        MessageType::StatusRequest,
        MessageType::StatusResponse,
        MessageType::SendUssdRequest,
        MessageType::SendUssdResponse,
        MessageType::ReceiveUssdRequest,
        MessageType::ReceiveUssdResponse,
        MessageType::SignalQualityRequest,
        MessageType::SignalQualityResponse,
        MessageType::AuthenticationRequest,
        MessageType::AuthenticationResponse,
        MessageType::ReceiveSmsReceiptRequest,
        MessageType::ReceiveSmsReceiptResponse,
    ];

    #[test]
    fn message_type_roundtrip() {
        for ty in ALL {
            assert_eq!(MessageType::try_from(ty as u16).unwrap(), ty);
        }
    }

    #[test]
    fn message_type_invalid() {
        assert!(MessageType::try_from(0x13).is_err());
        assert!(MessageType::try_from(0xDEAD).is_err());
    }

    #[test]
    fn server_decodes_exactly_the_gateway_side() {
        let server: Vec<_> = ALL
            .into_iter()
            .filter(|t| Endpoint::Server.decodes(*t))
            .collect();
        assert_eq!(server.len(), 10);
        assert!(server.contains(&MessageType::AuthenticationRequest));
        assert!(!server.contains(&MessageType::AuthenticationResponse));
        assert!(!server.contains(&MessageType::SendSmsRequest));
    }

    #[test]
    fn keepalive_decodes_on_both_ends() {
        assert!(Endpoint::Server.decodes(MessageType::KeepAlive));
        assert!(Endpoint::Gateway.decodes(MessageType::KeepAlive));
        assert!(Endpoint::Gateway.decodes(MessageType::SendSmsRequest));
        assert!(!Endpoint::Gateway.decodes(MessageType::StatusRequest));
    }
}
