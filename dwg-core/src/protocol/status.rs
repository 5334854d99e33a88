//! Port status and signal-quality reports pushed by the gateway.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::DwgError;
use crate::protocol::{BodyReader, WireBody};

// ── PortStatus ───────────────────────────────────────────────────

/// Condition of a single gateway port.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStatus {
    /// Port works normally.
    Works = 0,
    /// No SIM card inserted.
    NoSim = 1,
    /// SIM not registered on the mobile network.
    NotRegistered = 2,
    /// No hardware behind this port.
    Unavailable = 3,
}

impl TryFrom<u8> for PortStatus {
    type Error = DwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PortStatus::Works),
            1 => Ok(PortStatus::NoSim),
            2 => Ok(PortStatus::NotRegistered),
            3 => Ok(PortStatus::Unavailable),
            _ => Err(DwgError::UnknownVariant {
                type_name: "PortStatus",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn put_count(dst: &mut BytesMut, len: usize) -> Result<(), DwgError> {
    let count = u8::try_from(len).map_err(|_| DwgError::FieldTooLong {
        field: "port count",
        max: u8::MAX as usize,
        actual: len,
    })?;
    dst.put_u8(count);
    Ok(())
}

// ── StatusRequest ────────────────────────────────────────────────

/// `[0] port count, [1..1+count) one status byte per port`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRequest {
    pub ports: Vec<PortStatus>,
}

impl WireBody for StatusRequest {
    const KIND: &'static str = "status request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        put_count(dst, self.ports.len())?;
        for status in &self.ports {
            dst.put_u8(*status as u8);
        }
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let count = r.u8("port count")? as usize;
        let ports = r
            .take(count, "port statuses")?
            .iter()
            .map(|&b| PortStatus::try_from(b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ports })
    }
}

// ── SignalQualityRequest ─────────────────────────────────────────

/// `[0] port count, [1..1+count) one signal level byte per port`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalQualityRequest {
    pub levels: Vec<u8>,
}

impl WireBody for SignalQualityRequest {
    const KIND: &'static str = "signal quality request";

    fn encode(&self, dst: &mut BytesMut) -> Result<(), DwgError> {
        put_count(dst, self.levels.len())?;
        dst.put_slice(&self.levels);
        Ok(())
    }

    fn decode(src: &[u8]) -> Result<Self, DwgError> {
        let mut r = BodyReader::new(Self::KIND, src);
        let count = r.u8("port count")? as usize;
        let levels = r.take(count, "signal levels")?.to_vec();
        Ok(Self { levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_layout() {
        let req = StatusRequest {
            ports: vec![PortStatus::Works, PortStatus::NoSim],
        };
        let mut buf = BytesMut::new();
        req.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[2, 0, 1]);
        assert_eq!(StatusRequest::decode(&buf).unwrap(), req);
    }

    #[test]
    fn status_zero_ports() {
        let req = StatusRequest::default();
        let mut buf = BytesMut::new();
        req.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0]);
        assert_eq!(StatusRequest::decode(&buf).unwrap(), req);
    }

    #[test]
    fn status_count_exceeds_body() {
        assert!(matches!(
            StatusRequest::decode(&[4, 0, 0]),
            Err(DwgError::MalformedBody { .. })
        ));
    }

    #[test]
    fn status_unknown_port_status() {
        assert!(matches!(
            StatusRequest::decode(&[1, 9]),
            Err(DwgError::UnknownVariant {
                type_name: "PortStatus",
                value: 9
            })
        ));
    }

    #[test]
    fn signal_quality_roundtrip() {
        let req = SignalQualityRequest {
            levels: vec![31, 0, 17, 99],
        };
        let mut buf = BytesMut::new();
        req.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[4, 31, 0, 17, 99]);
        assert_eq!(SignalQualityRequest::decode(&buf).unwrap(), req);
    }

    #[test]
    fn too_many_ports() {
        let req = SignalQualityRequest {
            levels: vec![0; 256],
        };
        let mut buf = BytesMut::new();
        assert!(matches!(
            req.encode(&mut buf),
            Err(DwgError::FieldTooLong { .. })
        ));
    }
}
