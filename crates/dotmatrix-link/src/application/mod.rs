//! Application layer: decides *what* to send, never *how*.
//!
//! - **`transmit`** – Turns a user's transmit request plus the current frame
//!   source into a ready-to-encode [`dotmatrix_core::Message`].

pub mod transmit;

pub use transmit::{build_message, TransmitRequest};
