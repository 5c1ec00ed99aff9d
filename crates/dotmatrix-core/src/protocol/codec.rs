//! Binary codec for dot-matrix transmissions.
//!
//! Wire format (all multi-byte integers little-endian):
//! ```text
//! transmission header: [identifier:1][packet_count:2]
//! packet:              [crc16:2][payload_len:2][payload:N]
//! ```
//! The CRC and length always describe the payload that follows, never the
//! packet header itself.
//!
//! Every [`Message`] variant maps to bytes, but the 16-bit length and count
//! fields bound what can be represented.  Call [`check_encodable`] before
//! putting a message on the wire.  The decode helpers exist for the receiving
//! side and for tests that play the role of the display.

use thiserror::Error;

use crate::protocol::checksum::checksum16;
use crate::protocol::messages::{
    AnimationFramesMessage, CellularAutomatonMessage, Message, FRAME_HEADER_SIZE,
    MAX_PACKET_COUNT, MAX_PAYLOAD_LEN, PACKET_HEADER_SIZE, TRANSMISSION_HEADER_SIZE,
};

/// Errors raised while checking a message for encoding or decoding received bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The packet header declares more payload than is available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// The CRC in the packet header does not match the payload.
    #[error("checksum mismatch: header says 0x{declared:04X}, payload hashes to 0x{computed:04X}")]
    ChecksumMismatch { declared: u16, computed: u16 },

    /// A packet body does not fit the 16-bit payload length field.
    #[error("payload of {len} bytes exceeds the {max}-byte packet limit")]
    PayloadTooLarge { len: usize, max: usize },

    /// The message needs more packets than the transmission header can announce.
    #[error("{count} packets exceed the {max}-packet transmission limit")]
    TooManyPackets { count: usize, max: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds the 3-byte transmission header announcing `msg`.
///
/// # Examples
///
/// ```rust
/// use dotmatrix_core::{transmission_header, DisplayCommand, Message};
///
/// let header = transmission_header(&Message::Command(DisplayCommand::ScrollDate));
/// assert_eq!(header, [0x12, 0x01, 0x00]);
/// ```
pub fn transmission_header(msg: &Message) -> [u8; TRANSMISSION_HEADER_SIZE] {
    let [count_lo, count_hi] = msg.packet_count().to_le_bytes();
    [msg.identifier(), count_lo, count_hi]
}

/// Verifies that every packet of `msg` fits the wire's 16-bit fields.
///
/// # Errors
///
/// Returns [`ProtocolError::TooManyPackets`] for an animation with more than
/// 65 535 frames, and [`ProtocolError::PayloadTooLarge`] for a packet body
/// longer than 65 535 bytes.
pub fn check_encodable(msg: &Message) -> Result<(), ProtocolError> {
    let largest_body = match msg {
        Message::KeepAlive | Message::Command(_) => return Ok(()),
        Message::AnimationFrames(m) => {
            if m.frames.len() > MAX_PACKET_COUNT {
                return Err(ProtocolError::TooManyPackets {
                    count: m.frames.len(),
                    max: MAX_PACKET_COUNT,
                });
            }
            let largest_frame = m.frames.iter().map(|f| f.bytes.len()).max().unwrap_or(0);
            FRAME_HEADER_SIZE + largest_frame
        }
        Message::CellularAutomatonConfig(m) => 2 + 2 * m.live_cells.len(),
    };
    if largest_body > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            len: largest_body,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

/// Prefixes `body` with the common packet header `[crc lo, crc hi, len lo, len hi]`.
///
/// `body` must be at most [`MAX_PAYLOAD_LEN`] bytes long.
pub fn frame_packet(body: &[u8]) -> Vec<u8> {
    debug_assert!(
        body.len() <= MAX_PAYLOAD_LEN,
        "packet body of {} bytes overflows the length field",
        body.len()
    );
    let crc = checksum16(body);
    let len = body.len() as u16;

    let mut buf = Vec::with_capacity(PACKET_HEADER_SIZE + body.len());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Encodes packet `index` (0-based) of `msg`, header included.
///
/// Returns `None` when `index` is not below [`Message::packet_count`]; the
/// keep-alive probe therefore never yields a packet.
pub fn encode_packet(msg: &Message, index: usize) -> Option<Vec<u8>> {
    if index >= usize::from(msg.packet_count()) {
        return None;
    }
    let body = match msg {
        Message::KeepAlive => return None,
        Message::AnimationFrames(m) => animation_frame_body(m, index),
        Message::CellularAutomatonConfig(m) => cellular_automaton_body(m),
        Message::Command(cmd) => vec![cmd.code()],
    };
    Some(frame_packet(&body))
}

// ── Per-message body encoders ─────────────────────────────────────────────────

fn animation_frame_body(m: &AnimationFramesMessage, index: usize) -> Vec<u8> {
    let frame = &m.frames[index];
    let byte_count = frame.bytes.len() as u16;

    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + frame.bytes.len());
    buf.extend_from_slice(&(index as u16).to_le_bytes());
    buf.extend_from_slice(&byte_count.to_le_bytes());
    buf.push(m.rows);
    buf.push(m.columns);
    buf.extend_from_slice(&frame.duration_ms.to_le_bytes());
    buf.push(m.repeat_count);
    buf.extend_from_slice(&frame.bytes);
    buf
}

fn cellular_automaton_body(m: &CellularAutomatonMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + m.live_cells.len() * 2);
    buf.extend_from_slice(&m.tick_interval_ms.to_le_bytes());
    for &(x, y) in &m.live_cells {
        buf.push(x);
        buf.push(y);
    }
    buf
}

// ── Decoding (receiver side) ──────────────────────────────────────────────────

/// Parsed common packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub crc: u16,
    pub payload_len: u16,
}

impl PacketHeader {
    /// Parses the first four bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InsufficientData`] for fewer than four bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        require_len(bytes, PACKET_HEADER_SIZE)?;
        Ok(Self {
            crc: u16::from_le_bytes([bytes[0], bytes[1]]),
            payload_len: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

/// Splits one framed packet into its header and payload and verifies the CRC.
///
/// Returns the header, the payload, and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are truncated or the CRC does not
/// match the payload.
pub fn decode_packet(bytes: &[u8]) -> Result<(PacketHeader, &[u8], usize), ProtocolError> {
    let header = PacketHeader::parse(bytes)?;
    let declared = usize::from(header.payload_len);
    let available = bytes.len() - PACKET_HEADER_SIZE;
    if available < declared {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared,
            available,
        });
    }

    let payload = &bytes[PACKET_HEADER_SIZE..PACKET_HEADER_SIZE + declared];
    let computed = checksum16(payload);
    if computed != header.crc {
        return Err(ProtocolError::ChecksumMismatch {
            declared: header.crc,
            computed,
        });
    }
    Ok((header, payload, PACKET_HEADER_SIZE + declared))
}

/// Per-frame header at the start of an animation-frames packet body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub index: u16,
    pub byte_count: u16,
    pub rows: u8,
    pub columns: u8,
    pub duration_ms: u16,
    pub repeat_count: u8,
}

/// Parses the 9-byte frame header of an animation-frames packet body.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] if the body is shorter than
/// the frame header, or [`ProtocolError::PayloadLengthMismatch`] if it holds
/// fewer frame bytes than the header declares.
pub fn decode_frame_header(body: &[u8]) -> Result<FrameHeader, ProtocolError> {
    require_len(body, FRAME_HEADER_SIZE)?;
    let header = FrameHeader {
        index: u16::from_le_bytes([body[0], body[1]]),
        byte_count: u16::from_le_bytes([body[2], body[3]]),
        rows: body[4],
        columns: body[5],
        duration_ms: u16::from_le_bytes([body[6], body[7]]),
        repeat_count: body[8],
    };
    let available = body.len() - FRAME_HEADER_SIZE;
    if usize::from(header.byte_count) > available {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: usize::from(header.byte_count),
            available,
        });
    }
    Ok(header)
}

fn require_len(bytes: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if bytes.len() < needed {
        return Err(ProtocolError::InsufficientData {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
