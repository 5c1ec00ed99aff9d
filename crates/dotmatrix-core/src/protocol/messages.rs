//! All dot-matrix protocol message types and response codes.
//!
//! A [`Message`] is built fresh for every transmission from the current
//! frame-source data, is immutable once built, and is dropped when the
//! transmission completes or aborts.  The set of variants is closed, so the
//! codec dispatches with a single `match` instead of trait objects.

use std::fmt;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Identifier byte of the keep-alive probe.
pub const KEEP_ALIVE_IDENTIFIER: u8 = 0xFF;

/// Identifier byte of an animation-frames transmission.
pub const ANIMATION_FRAMES_IDENTIFIER: u8 = 0x10;

/// Identifier byte of a cellular-automaton configuration transmission.
pub const CELLULAR_AUTOMATON_IDENTIFIER: u8 = 0x11;

/// Identifier byte of a device command transmission.
pub const COMMAND_IDENTIFIER: u8 = 0x12;

/// Size of the transmission header: identifier (1) + packet count (2).
pub const TRANSMISSION_HEADER_SIZE: usize = 3;

/// Size of the common packet header: CRC (2) + payload length (2).
pub const PACKET_HEADER_SIZE: usize = 4;

/// Size of the per-frame header inside an animation-frames packet body.
pub const FRAME_HEADER_SIZE: usize = 9;

/// Largest packet payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest packet count the 16-bit transmission header can announce.
pub const MAX_PACKET_COUNT: usize = u16::MAX as usize;

// ── Response codes ────────────────────────────────────────────────────────────

/// Single-byte status the display returns after every header or packet.
///
/// [`ResponseCode::TimeoutAccessPoint`] never travels over the wire: it is the
/// local stand-in for "the socket failed or nothing came back in time".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    Ok = 0x01,
    TargetInternalError = 0x02,
    ChecksumMismatch = 0x03,
    TargetTimeout = 0x04,
    TargetUnexpectedResponse = 0x05,
    TargetUnexpectedPacket = 0x06,
    TimeoutAccessPoint = 0xFF,
}

impl ResponseCode {
    /// Resolves a raw reply read from the socket.
    ///
    /// Anything other than exactly one byte holding a defined wire code is
    /// normalised to [`ResponseCode::TargetUnexpectedPacket`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotmatrix_core::ResponseCode;
    ///
    /// assert_eq!(ResponseCode::from_reply(&[0x01]), ResponseCode::Ok);
    /// assert_eq!(ResponseCode::from_reply(&[0x01, 0x01]), ResponseCode::TargetUnexpectedPacket);
    /// assert_eq!(ResponseCode::from_reply(&[0x7F]), ResponseCode::TargetUnexpectedPacket);
    /// ```
    pub fn from_reply(reply: &[u8]) -> Self {
        match reply {
            [byte] => Self::try_from(*byte).unwrap_or(Self::TargetUnexpectedPacket),
            _ => Self::TargetUnexpectedPacket,
        }
    }

    /// Returns `true` for [`ResponseCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Returns the variant name as shown in progress messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::TargetInternalError => "TargetInternalError",
            Self::ChecksumMismatch => "ChecksumMismatch",
            Self::TargetTimeout => "TargetTimeout",
            Self::TargetUnexpectedResponse => "TargetUnexpectedResponse",
            Self::TargetUnexpectedPacket => "TargetUnexpectedPacket",
            Self::TimeoutAccessPoint => "TimeoutAccessPoint",
        }
    }
}

/// Converts a wire byte.  The local-only `TimeoutAccessPoint` value (0xFF) is
/// rejected because the display never sends it.
impl TryFrom<u8> for ResponseCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Ok),
            0x02 => Ok(Self::TargetInternalError),
            0x03 => Ok(Self::ChecksumMismatch),
            0x04 => Ok(Self::TargetTimeout),
            0x05 => Ok(Self::TargetUnexpectedResponse),
            0x06 => Ok(Self::TargetUnexpectedPacket),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Device commands ───────────────────────────────────────────────────────────

/// Commands understood by the display firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisplayCommand {
    SetClockMode = 0x01,
    SecondAnimationActive = 0x02,
    SecondAnimationInactive = 0x03,
    ScrollDate = 0x04,
}

impl DisplayCommand {
    /// The numeric command code carried as the single packet byte.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DisplayCommand {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::SetClockMode),
            0x02 => Ok(Self::SecondAnimationActive),
            0x03 => Ok(Self::SecondAnimationInactive),
            0x04 => Ok(Self::ScrollDate),
            _ => Err(()),
        }
    }
}

// ── Message kinds ─────────────────────────────────────────────────────────────

/// Discriminant of a [`Message`], used for logging and progress text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    KeepAlive,
    AnimationFrames,
    CellularAutomatonConfig,
    Command,
}

impl MessageKind {
    /// The identifier byte that opens the transmission header.
    pub fn identifier(self) -> u8 {
        match self {
            Self::KeepAlive => KEEP_ALIVE_IDENTIFIER,
            Self::AnimationFrames => ANIMATION_FRAMES_IDENTIFIER,
            Self::CellularAutomatonConfig => CELLULAR_AUTOMATON_IDENTIFIER,
            Self::Command => COMMAND_IDENTIFIER,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeepAlive => "KeepAlive",
            Self::AnimationFrames => "AnimationFrames",
            Self::CellularAutomatonConfig => "CellularAutomatonConfig",
            Self::Command => "Command",
        };
        f.write_str(name)
    }
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// One frame of an animation: how long it stays on screen and its packed pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Display time in milliseconds.
    pub duration_ms: u16,
    /// Row-major, MSB-first bitmap; each row padded to a whole byte.
    pub bytes: Vec<u8>,
}

/// A sequence of frames sent one packet per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFramesMessage {
    pub frames: Vec<AnimationFrame>,
    /// How many times the display replays the animation (0 = play once).
    pub repeat_count: u8,
    pub rows: u8,
    pub columns: u8,
}

/// Seed for the display's cellular automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellularAutomatonMessage {
    /// Time between generations in milliseconds.
    pub tick_interval_ms: u16,
    /// Live cells as `(x, y)` pairs, in row-major order as produced by the
    /// frame source.  The order is preserved byte-for-byte on the wire.
    pub live_cells: Vec<(u8, u8)>,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Every outbound message the editor can transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Zero-packet liveness probe; only its header is ever sent.
    KeepAlive,
    AnimationFrames(AnimationFramesMessage),
    CellularAutomatonConfig(CellularAutomatonMessage),
    Command(DisplayCommand),
}

impl Message {
    /// Returns the kind discriminant of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::KeepAlive => MessageKind::KeepAlive,
            Self::AnimationFrames(_) => MessageKind::AnimationFrames,
            Self::CellularAutomatonConfig(_) => MessageKind::CellularAutomatonConfig,
            Self::Command(_) => MessageKind::Command,
        }
    }

    /// The identifier byte of this message.
    pub fn identifier(&self) -> u8 {
        self.kind().identifier()
    }

    /// Number of packets that follow the transmission header on the happy path.
    ///
    /// Checksum-mismatch retries resend an index and are not counted.  Only
    /// meaningful for messages that pass [`crate::protocol::codec::check_encodable`].
    pub fn packet_count(&self) -> u16 {
        match self {
            Self::KeepAlive => 0,
            Self::AnimationFrames(m) => m.frames.len() as u16,
            Self::CellularAutomatonConfig(_) | Self::Command(_) => 1,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_try_from_accepts_all_wire_codes() {
        for byte in 0x01..=0x06u8 {
            let code = ResponseCode::try_from(byte).expect("defined wire code");
            assert_eq!(code as u8, byte);
        }
    }

    #[test]
    fn test_response_code_try_from_rejects_local_timeout_value() {
        assert!(ResponseCode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_response_code_from_reply_normalises_unknown_byte() {
        assert_eq!(
            ResponseCode::from_reply(&[0x00]),
            ResponseCode::TargetUnexpectedPacket
        );
        assert_eq!(
            ResponseCode::from_reply(&[0xFF]),
            ResponseCode::TargetUnexpectedPacket
        );
    }

    #[test]
    fn test_response_code_from_reply_rejects_wrong_length() {
        assert_eq!(
            ResponseCode::from_reply(&[]),
            ResponseCode::TargetUnexpectedPacket
        );
        assert_eq!(
            ResponseCode::from_reply(&[0x01, 0x03]),
            ResponseCode::TargetUnexpectedPacket
        );
    }

    #[test]
    fn test_response_code_from_reply_returns_checksum_mismatch() {
        assert_eq!(
            ResponseCode::from_reply(&[0x03]),
            ResponseCode::ChecksumMismatch
        );
    }

    #[test]
    fn test_response_code_display_uses_variant_name() {
        assert_eq!(ResponseCode::ChecksumMismatch.to_string(), "ChecksumMismatch");
        assert_eq!(ResponseCode::TimeoutAccessPoint.to_string(), "TimeoutAccessPoint");
    }

    #[test]
    fn test_display_command_codes_match_firmware_values() {
        assert_eq!(DisplayCommand::SetClockMode.code(), 1);
        assert_eq!(DisplayCommand::SecondAnimationActive.code(), 2);
        assert_eq!(DisplayCommand::SecondAnimationInactive.code(), 3);
        assert_eq!(DisplayCommand::ScrollDate.code(), 4);
        assert_eq!(DisplayCommand::try_from(4), Ok(DisplayCommand::ScrollDate));
        assert!(DisplayCommand::try_from(5).is_err());
    }

    #[test]
    fn test_message_identifiers() {
        assert_eq!(Message::KeepAlive.identifier(), 0xFF);
        assert_eq!(Message::Command(DisplayCommand::ScrollDate).identifier(), 0x12);
        let ca = Message::CellularAutomatonConfig(CellularAutomatonMessage {
            tick_interval_ms: 100,
            live_cells: vec![],
        });
        assert_eq!(ca.identifier(), 0x11);
    }

    #[test]
    fn test_message_packet_counts() {
        // Arrange
        let frames = Message::AnimationFrames(AnimationFramesMessage {
            frames: vec![
                AnimationFrame { duration_ms: 10, bytes: vec![0] },
                AnimationFrame { duration_ms: 20, bytes: vec![0] },
                AnimationFrame { duration_ms: 30, bytes: vec![0] },
            ],
            repeat_count: 0,
            rows: 1,
            columns: 8,
        });

        // Assert
        assert_eq!(Message::KeepAlive.packet_count(), 0);
        assert_eq!(Message::Command(DisplayCommand::SetClockMode).packet_count(), 1);
        assert_eq!(frames.packet_count(), 3);
        assert_eq!(frames.identifier(), 0x10);
    }
}
