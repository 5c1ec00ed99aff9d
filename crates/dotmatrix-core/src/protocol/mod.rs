//! Protocol module containing message types, the checksum, and the binary codec.

pub mod checksum;
pub mod codec;
pub mod discovery;
pub mod messages;

pub use checksum::checksum16;
pub use codec::{
    check_encodable, decode_frame_header, decode_packet, encode_packet, frame_packet,
    transmission_header, FrameHeader, PacketHeader, ProtocolError,
};
pub use discovery::{parse_announcement, AnnouncementError, ANNOUNCEMENT_SIZE};
pub use messages::*;
