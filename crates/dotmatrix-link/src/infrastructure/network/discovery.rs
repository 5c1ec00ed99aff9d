//! UDP discovery of the display.
//!
//! On power-up the display broadcasts a 6-byte announcement naming the TCP
//! endpoint it listens on (see [`dotmatrix_core::protocol::parse_announcement`]).
//! Discovery is a single blocking receive on the configured port: the first
//! datagram decides the outcome, there is no retry loop.
//!
//! The receive runs on Tokio's blocking thread pool so it never stalls the
//! async runtime.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use dotmatrix_core::protocol::{parse_announcement, AnnouncementError};
use dotmatrix_core::ConnectionEndpoint;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::storage::config::DiscoveryConfig;

/// Large enough to see (and reject) datagrams longer than an announcement.
const RECEIVE_BUFFER_SIZE: usize = 512;

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The configured bind address is not an IP address.
    #[error("invalid discovery bind address '{0}'")]
    InvalidBindAddress(String),

    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Nothing arrived before the timeout.
    #[error("UDP listener timed-out")]
    TimedOut,

    /// An I/O error occurred while receiving.
    #[error("UDP receive failed: {0}")]
    Recv(#[source] std::io::Error),

    /// A datagram arrived but was not a valid announcement.
    #[error("Received message from {from}, but the {source}")]
    Malformed {
        from: IpAddr,
        #[source]
        source: AnnouncementError,
    },

    /// The blocking receive task panicked or was cancelled.
    #[error("discovery task failed: {0}")]
    Task(String),
}

/// Binds the UDP listener socket.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the port is unavailable.
pub fn bind_listener(addr: SocketAddr) -> Result<UdpSocket, DiscoveryError> {
    UdpSocket::bind(addr).map_err(|source| DiscoveryError::BindFailed { addr, source })
}

/// Blocks until one datagram arrives on `socket` or `timeout` elapses, and
/// parses it as an announcement.
///
/// # Errors
///
/// [`DiscoveryError::TimedOut`] when nothing arrives in time,
/// [`DiscoveryError::Malformed`] for a datagram of the wrong length, or
/// [`DiscoveryError::Recv`] for other socket errors.
pub fn receive_announcement(
    socket: &UdpSocket,
    timeout: Duration,
) -> Result<ConnectionEndpoint, DiscoveryError> {
    // A zero read timeout is rejected by the OS.
    let timeout = timeout.max(Duration::from_millis(1));
    socket
        .set_read_timeout(Some(timeout))
        .map_err(DiscoveryError::Recv)?;

    let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
    let (len, src) = match socket.recv_from(&mut buf) {
        Ok(pair) => pair,
        Err(e) if is_timeout_error(&e) => return Err(DiscoveryError::TimedOut),
        Err(e) => return Err(DiscoveryError::Recv(e)),
    };

    debug!("discovery datagram of {len} byte(s) from {src}");
    parse_announcement(&buf[..len]).map_err(|source| DiscoveryError::Malformed {
        from: src.ip(),
        source,
    })
}

/// Listens once on the configured discovery port and returns the announced
/// endpoint.
///
/// # Errors
///
/// Any [`DiscoveryError`]; each is a discovery failure, never a protocol error.
pub async fn discover(config: &DiscoveryConfig) -> Result<ConnectionEndpoint, DiscoveryError> {
    let ip: IpAddr = config
        .bind_address
        .parse()
        .map_err(|_| DiscoveryError::InvalidBindAddress(config.bind_address.clone()))?;
    let addr = SocketAddr::new(ip, config.port);
    let timeout = Duration::from_millis(config.timeout_ms);

    let socket = bind_listener(addr)?;
    info!("waiting up to {} ms for a display announcement on UDP {addr}", config.timeout_ms);

    let result = tokio::task::spawn_blocking(move || receive_announcement(&socket, timeout))
        .await
        .map_err(|e| DiscoveryError::Task(e.to_string()))?;

    match &result {
        Ok(endpoint) => info!("display announced itself at {endpoint}"),
        Err(e) => warn!("discovery failed: {e}"),
    }
    result
}

/// Returns `true` for OS timeout / would-block errors.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
