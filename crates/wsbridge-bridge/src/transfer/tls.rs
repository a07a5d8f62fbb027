//! Shared TLS sessions carried by tickets.
//!
//! The bridge never establishes or drives TLS. A session arrives from the
//! acceptor already negotiated, rides along inside a ticket, and is handed to
//! the engine on upgrade. Ownership is shared through an atomic reference
//! count so that exactly one of redemption or discard drops the ticket's
//! reference, whichever thread that happens on.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::host::{External, HostValue};

/// A reference-counted, opaque TLS session.
#[derive(Clone)]
pub struct TlsSession {
    inner: Arc<dyn Any + Send + Sync>,
}

impl TlsSession {
    /// Wrap an established session of any type.
    pub fn new<T: Any + Send + Sync>(session: T) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }

    /// Number of live references to the session, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns true if both handles share the same session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Borrow the session as its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Read the optional session argument of `transfer`.
    ///
    /// Anything that is not an external TLS session means "no TLS".
    pub fn from_host(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::External(External::Tls(session)) => Some(session.clone()),
            _ => None,
        }
    }

    /// Expose the session to the host.
    pub fn to_host(&self) -> HostValue {
        HostValue::External(External::Tls(self.clone()))
    }
}

impl fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSession")
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(feature = "tls-rustls")]
mod rustls_session {
    use std::sync::Mutex;

    use rustls::ServerConnection;

    use wsbridge_core::error::BridgeError;
    use wsbridge_core::result::BridgeResult;

    use super::TlsSession;

    impl TlsSession {
        /// Wrap a server-side rustls connection that finished its handshake
        /// on the acceptor.
        pub fn from_rustls(conn: ServerConnection) -> Self {
            Self::new(Mutex::new(conn))
        }

        /// Run `f` against the wrapped rustls connection.
        pub fn with_rustls<R>(
            &self,
            f: impl FnOnce(&mut ServerConnection) -> R,
        ) -> BridgeResult<R> {
            let cell = self
                .downcast_ref::<Mutex<ServerConnection>>()
                .ok_or_else(|| BridgeError::validation("TLS session is not a rustls connection"))?;
            let mut conn = cell
                .lock()
                .map_err(|_| BridgeError::internal("rustls session lock poisoned"))?;
            Ok(f(&mut conn))
        }
    }
}
