//! Packet framing: 2-byte category, 2-byte operation, body.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ensure_remaining, WireDecode, WireEncode};
use crate::WireError;

/// A body type bound to its (category, operation) pair.
pub trait WireMessage: WireEncode + WireDecode {
    /// Service category code written in the packet header.
    const CATEGORY: u16;
    /// Operation code written in the packet header.
    const OPERATION: u16;

    /// The header pair as a dispatch key.
    fn kind() -> PacketKind {
        PacketKind::new(Self::CATEGORY, Self::OPERATION)
    }
}

/// The (category, operation) pair that identifies a body schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketKind {
    pub category: u16,
    pub operation: u16,
}

impl PacketKind {
    pub const fn new(category: u16, operation: u16) -> Self {
        Self {
            category,
            operation,
        }
    }
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.operation)
    }
}

/// A framed packet with its body still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub body: Bytes,
}

impl Packet {
    /// Size of the category + operation header.
    pub const HEADER_LEN: usize = 4;

    /// Frame a message.
    pub fn from_message<M: WireMessage>(message: &M) -> Self {
        Self {
            kind: M::kind(),
            body: encode_body(message),
        }
    }

    /// Serialize header and body into one buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::HEADER_LEN + self.body.len());
        buf.put_u16_le(self.kind.category);
        buf.put_u16_le(self.kind.operation);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Split raw bytes into header and body. The body is not interpreted.
    pub fn parse(data: &[u8]) -> Result<Self, WireError> {
        let mut buf = data;
        ensure_remaining(&buf, Self::HEADER_LEN)?;
        let category = buf.get_u16_le();
        let operation = buf.get_u16_le();
        Ok(Self {
            kind: PacketKind::new(category, operation),
            body: Bytes::copy_from_slice(buf),
        })
    }

    /// Decode the body as `M`, checking the header matches.
    ///
    /// Trailing bytes after the last field are ignored so that servers can
    /// append fields without breaking older clients.
    pub fn decode_body<M: WireMessage>(&self) -> Result<M, WireError> {
        if self.kind != M::kind() {
            return Err(WireError::KindMismatch {
                expected_category: M::CATEGORY,
                expected_operation: M::OPERATION,
                category: self.kind.category,
                operation: self.kind.operation,
            });
        }
        decode_body(&self.body)
    }
}

/// Encode a bare body (no header).
pub fn encode_body<T: WireEncode>(value: &T) -> Bytes {
    let mut buf = BytesMut::new();
    value.encode(&mut buf);
    buf.freeze()
}

/// Decode a bare body (no header).
pub fn decode_body<T: WireDecode>(body: &[u8]) -> Result<T, WireError> {
    let mut buf = body;
    T::decode(&mut buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{LastmileRequest, LastmileResponse};
    use crate::uri;

    #[test]
    fn test_header_layout() {
        let packet = Packet::from_message(&LastmileRequest::default());
        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..2], &uri::AP_SERVICE.to_le_bytes());
        assert_eq!(&bytes[2..4], &uri::op::LASTMILE_REQ.to_le_bytes());
    }

    #[test]
    fn test_parse_short_packet_fails() {
        assert!(matches!(
            Packet::parse(&[1, 0, 2]),
            Err(WireError::UnexpectedEof { needed: 4, .. })
        ));
    }

    #[test]
    fn test_decode_body_checks_kind() {
        let packet = Packet::from_message(&LastmileRequest::default());
        let err = packet.decode_body::<LastmileResponse>().unwrap_err();
        assert!(matches!(err, WireError::KindMismatch { .. }));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let request = LastmileRequest {
            opid: 3,
            ..Default::default()
        };
        let mut raw = BytesMut::from(&Packet::from_message(&request).to_bytes()[..]);
        raw.put_u32_le(0xdead_beef);
        let parsed = Packet::parse(&raw).unwrap();
        assert_eq!(parsed.decode_body::<LastmileRequest>().unwrap(), request);
    }
}
