//! # dotmatrix-core
//!
//! Shared library for talking to a networked dot-matrix display. It contains
//! the CRC-16 checksum, the message codec that turns animation frames,
//! cellular-automaton seeds, and device commands into wire bytes, and the
//! frame-source contract the codec reads pixel data through.
//!
//! This crate has zero dependencies on sockets, timers, or async runtimes.
//! All network I/O lives in `dotmatrix-link`.
//!
//! # Architecture overview
//!
//! A transmission to the display is a strict request/response exchange over
//! one TCP connection:
//!
//! ```text
//! editor                                display
//! ──────                                ───────
//! [id, count lo, count hi]   ────────►
//!                            ◄────────  response byte (0x01 = Ok)
//! [crc lo, crc hi, len lo, len hi, payload...]  (packet 0)
//!                            ◄────────  response byte
//! ...one exchange per packet...
//! ```
//!
//! - **`protocol`** – How bytes travel over the wire: the checksum, the
//!   transmission header, packet framing, per-message packet bodies, response
//!   codes, and the UDP discovery announcement.
//!
//! - **`domain`** – The connection endpoint value and the frame store: a
//!   grid of pixels per frame, bit-packed on demand for the codec.

pub mod domain;
pub mod protocol;

pub use domain::endpoint::ConnectionEndpoint;
pub use domain::frames::{FrameError, FrameSource, FrameStore};
pub use protocol::checksum::checksum16;
pub use protocol::codec::{check_encodable, encode_packet, transmission_header, ProtocolError};
pub use protocol::messages::{DisplayCommand, Message, MessageKind, ResponseCode};
