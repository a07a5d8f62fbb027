//! Connection roles.
//!
//! The same operation set works for server-accepting and client-initiating
//! groups. [`RoleKind`] is the runtime tag handed to the engine; the marker
//! types [`Server`] and [`Client`] let the bridge pin a role at compile time
//! so that, for example, only server groups can receive upgrades.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime role tag for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Accepts inbound connections.
    Server,
    /// Initiates outbound connections.
    Client,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Server {}
    impl Sealed for super::Client {}
}

/// Compile-time role marker. Implemented only by [`Server`] and [`Client`].
pub trait Role: sealed::Sealed + Copy + fmt::Debug + 'static {
    /// The runtime tag for this role.
    const KIND: RoleKind;
}

/// Marker for server-accepting groups and connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Server;

/// Marker for client-initiating groups and connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Client;

impl Role for Server {
    const KIND: RoleKind = RoleKind::Server;
}

impl Role for Client {
    const KIND: RoleKind = RoleKind::Client;
}
