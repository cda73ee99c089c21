//! Datagram wire format

use serde::{Deserialize, Serialize};

use crate::{ControlError, Result};

/// Largest RGB payload carried by one datagram
pub const MAX_PAYLOAD: usize = 900;

/// Reserved bytes between token and fragment index
const RESERVED_LEN: usize = 2;

/// Protocol generation spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Version byte 1, 9-byte token
    Legacy,
    /// Version byte 3, 12-byte token
    #[default]
    Current,
}

impl ProtocolVersion {
    /// Version byte on the wire
    pub fn byte(self) -> u8 {
        match self {
            ProtocolVersion::Legacy => 1,
            ProtocolVersion::Current => 3,
        }
    }

    /// Length of the token field
    pub fn token_len(self) -> usize {
        match self {
            ProtocolVersion::Legacy => 9,
            ProtocolVersion::Current => 12,
        }
    }

    /// Bytes before the payload
    pub fn header_len(self) -> usize {
        1 + self.token_len() + RESERVED_LEN + 1
    }

    /// Version for a wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ProtocolVersion::Legacy),
            3 => Some(ProtocolVersion::Current),
            _ => None,
        }
    }
}

/// Build one datagram.
///
/// The token is truncated or zero-padded to the field length of `version`.
pub fn build_datagram(
    version: ProtocolVersion,
    token: &[u8],
    fragment: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ControlError::TransportError(format!(
            "Payload of {} bytes exceeds {}",
            payload.len(),
            MAX_PAYLOAD
        )));
    }

    let mut packet = Vec::with_capacity(version.header_len() + payload.len());

    // Version (1 byte)
    packet.push(version.byte());

    // Token field (9 or 12 bytes)
    let mut field = vec![0u8; version.token_len()];
    let copy_len = token.len().min(field.len());
    field[..copy_len].copy_from_slice(&token[..copy_len]);
    packet.extend_from_slice(&field);

    // Reserved (2 bytes)
    packet.extend_from_slice(&[0u8; RESERVED_LEN]);

    // Fragment index (1 byte)
    packet.push(fragment);

    packet.extend_from_slice(payload);
    Ok(packet)
}

/// A parsed datagram borrowing from the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    pub version: ProtocolVersion,
    pub token: &'a [u8],
    pub fragment: u8,
    pub payload: &'a [u8],
}

/// Parse a datagram; `None` for unknown versions, short headers,
/// non-zero reserved bytes or oversized payloads.
pub fn parse_datagram(packet: &[u8]) -> Option<Datagram<'_>> {
    let version = ProtocolVersion::from_byte(*packet.first()?)?;
    let header_len = version.header_len();
    if packet.len() < header_len || packet.len() - header_len > MAX_PAYLOAD {
        return None;
    }
    let token_end = 1 + version.token_len();
    if packet[token_end..token_end + RESERVED_LEN] != [0, 0] {
        return None;
    }
    Some(Datagram {
        version,
        token: &packet[1..token_end],
        fragment: packet[header_len - 1],
        payload: &packet[header_len..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_header_layout() {
        let token: Vec<u8> = (1..=12).collect();
        let packet = build_datagram(ProtocolVersion::Current, &token, 2, &[9, 8, 7]).unwrap();
        assert_eq!(packet.len(), 16 + 3);
        assert_eq!(packet[0], 3);
        assert_eq!(&packet[1..13], token.as_slice());
        assert_eq!(&packet[13..15], &[0, 0]);
        assert_eq!(packet[15], 2);
        assert_eq!(&packet[16..], &[9, 8, 7]);
    }

    #[test]
    fn test_legacy_header_layout() {
        let packet = build_datagram(ProtocolVersion::Legacy, b"abc", 0, &[]).unwrap();
        assert_eq!(packet.len(), 13);
        assert_eq!(packet[0], 1);
        assert_eq!(&packet[1..10], b"abc\0\0\0\0\0\0");
        assert_eq!(packet[12], 0);
    }

    #[test]
    fn test_long_token_is_truncated() {
        let token = [0xAB; 20];
        let packet = build_datagram(ProtocolVersion::Legacy, &token, 0, &[1]).unwrap();
        assert_eq!(packet.len(), 13 + 1);
        let parsed = parse_datagram(&packet).unwrap();
        assert_eq!(parsed.token, &[0xAB; 9]);
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let payload = vec![0; MAX_PAYLOAD + 1];
        assert!(build_datagram(ProtocolVersion::Current, &[], 0, &payload).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_datagram(&[]).is_none());
        assert!(parse_datagram(&[2, 0, 0]).is_none());
        assert!(parse_datagram(&[3, 0, 0]).is_none());
        let mut packet = build_datagram(ProtocolVersion::Current, &[], 0, &[1, 2, 3]).unwrap();
        packet[13] = 1;
        assert!(parse_datagram(&packet).is_none());
    }
}
