//! The TCP endpoint of the display.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Address and port the connection manager opens every new socket against.
///
/// Set once through an explicit configuration call and immutable until the
/// caller reconfigures it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionEndpoint {
    pub address: IpAddr,
    pub port: u16,
}

impl ConnectionEndpoint {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }

    /// Returns the endpoint as a socket address, with IPv4-mapped IPv6
    /// addresses folded back to plain IPv4.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address.to_canonical(), self.port)
    }
}

impl From<SocketAddr> for ConnectionEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

/// Formats as `ip:port`, the connection string shown to the user.
impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}
