//! Network infrastructure for the display link.
//!
//! # Sub-modules
//!
//! - **`connection_manager`** – Owns the single TCP socket to the display.
//!   A worker task serializes connect, disconnect, transmit, and keep-alive
//!   probes so no two exchanges ever share the socket's read stream.
//!
//! - **`discovery`** – Waits for the display's 6-byte UDP announcement and
//!   turns it into the endpoint the connection manager connects to.

pub mod connection_manager;
pub mod discovery;

pub use connection_manager::{ConnectionManager, LinkError, LinkState, LinkStatus, LinkTimings};
pub use discovery::{discover, receive_announcement, DiscoveryError};
