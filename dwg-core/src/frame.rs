//! A complete DWG message: the 24-byte header followed by its body.

use bytes::{BufMut, BytesMut};

use crate::error::DwgError;
use crate::header::{HEADER_SIZE, MacAddress, MessageHeader};
use crate::message::{Endpoint, MessageType};
use crate::protocol::Body;

/// Largest body the streaming decoder will buffer.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MessageHeader,
    body: Body,
}

impl Message {
    /// Frame `body` under `mac`, taking the type from the body variant and
    /// the length from its encoding.
    pub fn new(body: Body, mac: MacAddress) -> Result<Self, DwgError> {
        let mut scratch = BytesMut::new();
        body.encode(&mut scratch)?;
        let body_length = u32::try_from(scratch.len()).map_err(|_| DwgError::FrameTooLarge {
            size: scratch.len(),
            max: MAX_BODY_SIZE,
        })?;
        let header = MessageHeader::new(body.message_type() as u16, mac, body_length);
        Ok(Self { header, body })
    }

    pub fn keep_alive(mac: MacAddress) -> Self {
        Self {
            header: MessageHeader::new(MessageType::KeepAlive as u16, mac, 0),
            body: Body::KeepAlive,
        }
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub fn mac(&self) -> MacAddress {
        self.header.mac()
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    /// Total encoded size, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.header.body_length() as usize
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        dst.reserve(self.encoded_len());
        dst.put_slice(&self.header.to_bytes());
        self.body.encode(dst)
    }

    pub fn to_bytes(&self) -> Result<BytesMut, DwgError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Parse one message from `bytes` as seen by `endpoint`.
    ///
    /// Bytes past the declared body length are ignored.
    pub fn decode(bytes: &[u8], endpoint: Endpoint) -> Result<Self, DwgError> {
        let header = MessageHeader::from_bytes(bytes)?;
        let raw_type = header.message_type();
        let ty = MessageType::try_from(raw_type)
            .ok()
            .filter(|ty| endpoint.decodes(*ty))
            .ok_or(DwgError::UnsupportedMessageType(raw_type))?;

        let declared = header.body_length() as usize;
        let available = bytes.len() - HEADER_SIZE;
        if declared > available {
            return Err(DwgError::BodyLengthMismatch {
                declared,
                available,
            });
        }

        let body = Body::decode(ty, &bytes[HEADER_SIZE..HEADER_SIZE + declared])?;
        Ok(Self { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AuthenticationRequest, MessageResult, StatusRequest};

    const MAC: MacAddress = [0x00, 0x1f, 0xd6, 0x01, 0x02, 0x03];

    #[test]
    fn header_matches_body() {
        let msg = Message::new(Body::AuthenticationResponse(MessageResult::Succeed), MAC).unwrap();
        let bytes = msg.to_bytes().unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + 1);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..10], &MAC);
        assert!(bytes[10..20].iter().all(|&b| b == 0));
        assert_eq!(&bytes[20..22], &[0x00, 0x10]);
        assert_eq!(bytes[24], 0);
    }

    #[test]
    fn server_decodes_gateway_message() {
        let body = Body::AuthenticationRequest(AuthenticationRequest::new("svc", "pw1"));
        let bytes = Message::new(body.clone(), MAC).unwrap().to_bytes().unwrap();

        let msg = Message::decode(&bytes, Endpoint::Server).unwrap();
        assert_eq!(msg.body(), &body);
        assert_eq!(msg.mac(), MAC);
        assert_eq!(msg.header().body_length(), 32);
    }

    #[test]
    fn endpoint_rejects_wrong_direction() {
        let bytes = Message::new(Body::StatusResponse(MessageResult::Succeed), MAC)
            .unwrap()
            .to_bytes()
            .unwrap();
        assert!(matches!(
            Message::decode(&bytes, Endpoint::Server),
            Err(DwgError::UnsupportedMessageType(0x08))
        ));
        assert!(Message::decode(&bytes, Endpoint::Gateway).is_ok());
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[20..22].copy_from_slice(&0x0042u16.to_be_bytes());
        assert!(matches!(
            Message::decode(&bytes, Endpoint::Server),
            Err(DwgError::UnsupportedMessageType(0x42))
        ));
    }

    #[test]
    fn short_body_is_length_mismatch() {
        let body = Body::StatusRequest(StatusRequest::default());
        let mut bytes = Message::new(body, MAC).unwrap().to_bytes().unwrap();
        bytes[3] = 9;
        assert!(matches!(
            Message::decode(&bytes, Endpoint::Server),
            Err(DwgError::BodyLengthMismatch {
                declared: 9,
                available: 1
            })
        ));
    }

    #[test]
    fn keep_alive_ignores_length_and_mac() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&77u32.to_be_bytes());
        bytes[4..10].copy_from_slice(&MAC);

        let msg = Message::decode(&bytes, Endpoint::Server).unwrap();
        assert_eq!(msg.body(), &Body::KeepAlive);
        assert_eq!(msg.header().body_length(), 0);
        assert_eq!(msg.mac(), [0; 6]);
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(
            Message::decode(&[0u8; 10], Endpoint::Server),
            Err(DwgError::TruncatedHeader(10))
        ));
    }

    #[test]
    fn invalid_body_cannot_be_framed() {
        let body = Body::AuthenticationRequest(AuthenticationRequest::new("x".repeat(16), "pw"));
        assert!(matches!(
            Message::new(body, MAC),
            Err(DwgError::FieldTooLong { .. })
        ));
    }
}
