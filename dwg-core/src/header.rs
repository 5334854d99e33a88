//! The fixed 24-byte DWG message header.
//!
//! ```text
//! offset  size  field
//!  0       4    body_length   u32 big-endian
//!  4       6    mac           gateway MAC address
//! 10      10    reserved
//! 20       2    message_type  u16 big-endian
//! 22       2    reserved
//! ```

use crate::error::DwgError;

/// Encoded size of a header on the wire.
pub const HEADER_SIZE: usize = 24;

/// A 6-byte hardware address carried in every header.
pub type MacAddress = [u8; 6];

/// The all-zero MAC used before a gateway has authenticated.
pub const ZERO_MAC: MacAddress = [0; 6];

pub type HeaderBytes = [u8; HEADER_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    body_length: u32,
    mac: MacAddress,
    message_type: u16,
}

impl MessageHeader {
    pub fn new(message_type: u16, mac: MacAddress, body_length: u32) -> Self {
        Self {
            body_length,
            mac,
            message_type,
        }
    }

    pub fn to_bytes(&self) -> HeaderBytes {
        let mut header: HeaderBytes = [0; HEADER_SIZE];
        header[0..4].copy_from_slice(&self.body_length.to_be_bytes());
        header[4..10].copy_from_slice(&self.mac);
        header[20..22].copy_from_slice(&self.message_type.to_be_bytes());
        header
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// Keep-alive headers (type 0) carry no meaningful length or MAC, so
    /// both are reported as zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DwgError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DwgError::TruncatedHeader(bytes.len()));
        }
        let message_type = u16::from_be_bytes([bytes[20], bytes[21]]);
        if message_type == 0 {
            return Ok(Self::new(0, ZERO_MAC, 0));
        }

        let body_length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mut mac = ZERO_MAC;
        mac.copy_from_slice(&bytes[4..10]);

        Ok(Self {
            body_length,
            mac,
            message_type,
        })
    }

    pub fn body_length(&self) -> u32 {
        self.body_length
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let cases = [
            (0x0001u16, [1, 2, 3, 4, 5, 6], 0u32),
            (0x000F, [0xAA; 6], 32),
            (0x0012, ZERO_MAC, 1),
            (0xFFFF, [0xFF; 6], u32::MAX),
        ];
        for (ty, mac, len) in cases {
            let header = MessageHeader::new(ty, mac, len);
            let decoded = MessageHeader::from_bytes(&header.to_bytes()).unwrap();
            assert_eq!(decoded, header);
        }
    }

    #[test]
    fn field_offsets_are_big_endian() {
        let header = MessageHeader::new(0x0102, [9, 8, 7, 6, 5, 4], 0x0A0B0C0D);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(&bytes[4..10], &[9, 8, 7, 6, 5, 4]);
        assert!(bytes[10..20].iter().all(|&b| b == 0));
        assert_eq!(&bytes[20..22], &[0x01, 0x02]);
        assert_eq!(&bytes[22..24], &[0, 0]);
    }

    #[test]
    fn keepalive_ignores_length_and_mac() {
        let mut bytes = [0xEEu8; HEADER_SIZE];
        bytes[20] = 0;
        bytes[21] = 0;
        let header = MessageHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.message_type(), 0);
        assert_eq!(header.body_length(), 0);
        assert_eq!(header.mac(), ZERO_MAC);
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(
            MessageHeader::from_bytes(&[0u8; 23]),
            Err(DwgError::TruncatedHeader(23))
        ));
    }
}
