//! Parsing of the display's UDP discovery announcement.
//!
//! The display broadcasts a 6-byte datagram naming the TCP endpoint it
//! accepts connections on:
//!
//! ```text
//! [port hi][port lo][ip0][ip1][ip2][ip3]
//! ```
//!
//! Note the port is **big-endian** here, unlike the TCP protocol.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;

use crate::domain::endpoint::ConnectionEndpoint;

/// Exact size of a well-formed announcement datagram.
pub const ANNOUNCEMENT_SIZE: usize = 6;

/// Error returned for a datagram that is not a valid announcement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnouncementError {
    #[error("message had unexpected number of bytes ({actual}, expected {ANNOUNCEMENT_SIZE})")]
    UnexpectedLength { actual: usize },
}

/// Parses an announcement datagram into the endpoint it advertises.
///
/// # Errors
///
/// Returns [`AnnouncementError::UnexpectedLength`] for any length other than
/// [`ANNOUNCEMENT_SIZE`].
///
/// # Examples
///
/// ```rust
/// use dotmatrix_core::protocol::parse_announcement;
///
/// let endpoint = parse_announcement(&[0x23, 0x28, 192, 168, 1, 40]).unwrap();
/// assert_eq!(endpoint.to_string(), "192.168.1.40:9000");
/// ```
pub fn parse_announcement(datagram: &[u8]) -> Result<ConnectionEndpoint, AnnouncementError> {
    let [port_hi, port_lo, a, b, c, d] = <[u8; ANNOUNCEMENT_SIZE]>::try_from(datagram)
        .map_err(|_| AnnouncementError::UnexpectedLength {
            actual: datagram.len(),
        })?;
    Ok(ConnectionEndpoint::new(
        IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
        u16::from_be_bytes([port_hi, port_lo]),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_announcement_reads_big_endian_port() {
        // Arrange
        let datagram = [0x15, 0xCA, 10, 0, 0, 7];

        // Act
        let endpoint = parse_announcement(&datagram).unwrap();

        // Assert
        assert_eq!(endpoint.port, 5578);
        assert_eq!(endpoint.address, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
    }

    #[test]
    fn test_parse_announcement_rejects_short_datagram() {
        assert_eq!(
            parse_announcement(&[1, 2, 3]),
            Err(AnnouncementError::UnexpectedLength { actual: 3 })
        );
    }

    #[test]
    fn test_parse_announcement_rejects_long_datagram() {
        let result = parse_announcement(&[0; 7]);
        assert_eq!(result, Err(AnnouncementError::UnexpectedLength { actual: 7 }));
    }

    #[test]
    fn test_announcement_error_message_names_expected_size() {
        let err = AnnouncementError::UnexpectedLength { actual: 2 };
        assert_eq!(
            err.to_string(),
            "message had unexpected number of bytes (2, expected 6)"
        );
    }
}
