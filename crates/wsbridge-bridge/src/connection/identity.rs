//! Connection identity bridge.
//!
//! The engine identifies a connection by a [`SocketHandle`]. The host sees an
//! opaque external carrying that handle and the role of the owning group, so
//! wrapping the same connection twice yields equal references. A reference
//! does not keep the connection alive and must not be used after the
//! disconnection event for it.

use std::fmt;
use std::marker::PhantomData;

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{Role, SocketHandle};

use crate::host::{External, HostValue};

/// A typed reference to a live connection of role `R`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionRef<R: Role> {
    socket: SocketHandle,
    _role: PhantomData<R>,
}

impl<R: Role> ConnectionRef<R> {
    /// Wrap an engine connection handle.
    pub fn wrap(socket: SocketHandle) -> Self {
        Self {
            socket,
            _role: PhantomData,
        }
    }

    /// The engine connection handle.
    pub fn unwrap(self) -> SocketHandle {
        self.socket
    }

    /// Expose the reference to the host.
    pub fn to_host(self) -> HostValue {
        HostValue::External(External::Connection {
            socket: self.socket,
            role: R::KIND,
        })
    }

    /// Recover a reference from a host value, checking its role.
    pub fn from_host(value: &HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::External(External::Connection { socket, role }) if *role == R::KIND => {
                Ok(Self::wrap(*socket))
            }
            HostValue::External(External::Connection { role, .. }) => {
                Err(BridgeError::role_mismatch(format!(
                    "expected a {} connection, got {role}",
                    R::KIND
                )))
            }
            other => Err(BridgeError::validation(format!(
                "expected a connection, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<R: Role> TryFrom<&HostValue> for ConnectionRef<R> {
    type Error = BridgeError;

    fn try_from(value: &HostValue) -> Result<Self, Self::Error> {
        Self::from_host(value)
    }
}

impl<R: Role> fmt::Debug for ConnectionRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionRef<{}>({})", R::KIND, self.socket)
    }
}
