//! Domain types with no I/O.
//!
//! - **`endpoint`** – The `ip:port` the display accepts TCP connections on.
//! - **`frames`** – The [`frames::FrameSource`] contract the codec pulls pixel
//!   data through, and [`frames::FrameStore`], the in-memory grid of frames
//!   that implements it.

pub mod endpoint;
pub mod frames;
