//! LAN binding wire format: announce/leave messages, length-prefix framing.
//! The core defines no wire format; this is daemon-local.

use serde::{Deserialize, Serialize};

use scout_core::{PeerId, PeerStatus};

/// Current beacon protocol version. Mismatched frames are ignored.
pub const PROTOCOL_VERSION: u8 = 1;

const LEN_SIZE: usize = 4;
const MAX_FRAME_LEN: u32 = 64 * 1024; // 64 KiB; beacons are tiny

/// All binding wire messages. Encoding is bincode; framing is length-prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Advertise presence: identity, display name, availability.
    Announce {
        protocol_version: u8,
        peer_id: PeerId,
        display_name: String,
        status: PeerStatus,
    },
    /// Graceful departure; the peer drops from sightings immediately.
    Leave { peer_id: PeerId },
}

/// Encode a message into a single frame: 4 bytes LE length + bincode payload.
pub fn encode_frame(msg: &Message) -> Result<Vec<u8>, FrameEncodeError> {
    let payload = bincode::serialize(msg).map_err(FrameEncodeError::Encode)?;
    let len = payload.len() as u32;
    if len > MAX_FRAME_LEN {
        return Err(FrameEncodeError::TooLarge);
    }
    let mut out = Vec::with_capacity(LEN_SIZE + payload.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum FrameEncodeError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("frame too large")]
    TooLarge,
}

/// Decode one frame from the front of `bytes`. Returns the message and the
/// number of bytes consumed.
pub fn decode_frame(bytes: &[u8]) -> Result<(Message, usize), FrameDecodeError> {
    if bytes.len() < LEN_SIZE {
        return Err(FrameDecodeError::NeedMore);
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len > MAX_FRAME_LEN as usize {
        return Err(FrameDecodeError::TooLarge);
    }
    if bytes.len() < LEN_SIZE + len {
        return Err(FrameDecodeError::NeedMore);
    }
    let msg: Message =
        bincode::deserialize(&bytes[LEN_SIZE..LEN_SIZE + len]).map_err(FrameDecodeError::Decode)?;
    Ok((msg, LEN_SIZE + len))
}

#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("need more bytes")]
    NeedMore,
    #[error("frame too large")]
    TooLarge,
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_announce() -> Message {
        Message::Announce {
            protocol_version: PROTOCOL_VERSION,
            peer_id: PeerId::new("aa:bb:cc:dd:ee:ff"),
            display_name: "workbench".to_string(),
            status: PeerStatus::Available,
        }
    }

    #[test]
    fn roundtrip_announce() {
        let msg = sample_announce();
        let frame = encode_frame(&msg).unwrap();
        let (decoded, n) = decode_frame(&frame).unwrap();
        assert_eq!(n, frame.len());
        match decoded {
            Message::Announce {
                protocol_version,
                peer_id,
                display_name,
                status,
            } => {
                assert_eq!(protocol_version, PROTOCOL_VERSION);
                assert_eq!(peer_id, PeerId::new("aa:bb:cc:dd:ee:ff"));
                assert_eq!(display_name, "workbench");
                assert_eq!(status, PeerStatus::Available);
            }
            _ => panic!("expected Announce"),
        }
    }

    #[test]
    fn roundtrip_leave() {
        let msg = Message::Leave {
            peer_id: PeerId::new("aa:01"),
        };
        let frame = encode_frame(&msg).unwrap();
        let (decoded, _) = decode_frame(&frame).unwrap();
        assert!(matches!(decoded, Message::Leave { peer_id } if peer_id == PeerId::new("aa:01")));
    }

    #[test]
    fn partial_read_need_more() {
        let frame = encode_frame(&sample_announce()).unwrap();
        assert!(matches!(
            decode_frame(&frame[..2]),
            Err(FrameDecodeError::NeedMore)
        ));
        assert!(matches!(
            decode_frame(&frame[..LEN_SIZE]),
            Err(FrameDecodeError::NeedMore)
        ));
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            decode_frame(&buf),
            Err(FrameDecodeError::TooLarge)
        ));
    }
}
