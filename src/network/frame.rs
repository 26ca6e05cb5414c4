//! Frame layout on the wire.
//!
//! ```text
//! [group id: 4][timestamp ns: u64 BE][session id: u64 BE][kind: u8][bincode payload]
//! ```

use thiserror::Error;

use super::{MsgKind, NetMessage};
use crate::config;

/// Length of everything before the payload
pub const HEADER_LEN: usize = 4 + 8 + 8 + 1;

/// Why a received datagram was not accepted as a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Fewer bytes than a header
    #[error("frame of {0} bytes is shorter than the header")]
    TooShort(usize),
    /// Sent by another deployment on the same segment
    #[error("foreign group id {0:?}")]
    ForeignGroup([u8; 4]),
    /// Discriminator byte with no registered kind
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
    /// Payload did not (de)serialize
    #[error("bad payload: {0}")]
    Payload(#[from] bincode::Error),
}

/// The fixed part of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Send time in ns since the UNIX epoch, strictly increasing per transmitter
    pub timestamp: u64,
    /// Random id of the sending process
    pub session: u64,
    /// What the payload is
    pub kind: MsgKind,
}

/// Builds a complete frame for `message`
pub fn encode(timestamp: u64, session: u64, message: &NetMessage) -> Result<Vec<u8>, FrameError> {
    let payload = message.encode_payload()?;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&config::GROUP_ID);
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(&session.to_be_bytes());
    buf.push(message.kind() as u8);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Splits a datagram into header and payload. The payload is not decoded.
pub fn decode_header(buf: &[u8]) -> Result<(FrameHeader, &[u8]), FrameError> {
    if buf.len() < HEADER_LEN {
        return Err(FrameError::TooShort(buf.len()));
    }
    let (group, rest) = buf.split_at(4);
    if group != config::GROUP_ID {
        let mut id = [0u8; 4];
        id.copy_from_slice(group);
        return Err(FrameError::ForeignGroup(id));
    }
    let (ts, rest) = rest.split_at(8);
    let (session, rest) = rest.split_at(8);
    let (kind, payload) = rest.split_at(1);

    let header = FrameHeader {
        timestamp: u64::from_be_bytes(to_array(ts)),
        session: u64::from_be_bytes(to_array(session)),
        kind: MsgKind::try_from(kind[0])?,
    };
    Ok((header, payload))
}

/// Decodes a whole frame
pub fn decode(buf: &[u8]) -> Result<(FrameHeader, NetMessage), FrameError> {
    let (header, payload) = decode_header(buf)?;
    let message = (header.kind.decoder())(payload)?;
    Ok((header, message))
}

fn to_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elev_types::{Order, OrderStatus, OrderType};
    use crate::network::Heartbeat;

    #[test]
    fn header_fields_are_big_endian_after_group_id() {
        let msg = NetMessage::Heartbeat(Heartbeat::new(15657));
        let buf = encode(0x0102_0304_0506_0708, 42, &msg).unwrap();

        assert_eq!(&buf[..4], b"4242");
        assert_eq!(&buf[4..12], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&buf[12..20], &42u64.to_be_bytes());
        assert_eq!(buf[20], MsgKind::Heartbeat as u8);

        let (header, decoded) = decode(&buf).unwrap();
        assert_eq!(header.timestamp, 0x0102_0304_0506_0708);
        assert_eq!(header.session, 42);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rejects_short_foreign_and_unknown_frames() {
        assert!(matches!(decode(b"4242"), Err(FrameError::TooShort(4))));

        let msg = NetMessage::Order(Order::new(1, OrderType::HallUp, OrderStatus::NotTaken));
        let mut buf = encode(1, 1, &msg).unwrap();

        let mut foreign = buf.clone();
        foreign[..4].copy_from_slice(b"1337");
        assert!(matches!(decode(&foreign), Err(FrameError::ForeignGroup(_))));

        buf[20] = 99;
        assert!(matches!(decode(&buf), Err(FrameError::UnknownKind(99))));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let msg = NetMessage::Order(Order::new(1, OrderType::HallUp, OrderStatus::NotTaken));
        let buf = encode(1, 1, &msg).unwrap();
        assert!(matches!(decode(&buf[..HEADER_LEN + 1]), Err(FrameError::Payload(_))));
    }
}
