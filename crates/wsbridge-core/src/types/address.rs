//! Remote endpoint projection.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Remote endpoint of a connection as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Remote port.
    pub port: u16,
    /// Remote address in textual form.
    pub address: String,
    /// Address family, `"IPv4"` or `"IPv6"`.
    pub family: String,
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        let family = if addr.is_ipv4() { "IPv4" } else { "IPv6" };
        Self {
            port: addr.port(),
            address: addr.ip().to_string(),
            family: family.to_string(),
        }
    }
}
