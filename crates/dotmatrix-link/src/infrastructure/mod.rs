//! Infrastructure layer for the display link.
//!
//! Contains OS-facing adapters: the TCP connection to the display, the UDP
//! discovery listener, and file-system settings storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `dotmatrix_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
