//! Socket sources for `transfer`.
//!
//! A source is either a raw descriptor number or a host-side socket wrapper.
//! Wrappers must expose their descriptor through [`NativeHandle`]; the bridge
//! never digs through a wrapper's memory to find one.

use std::fmt;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;

use crate::host::{External, HostValue};

/// Descriptor value that never refers to an open file.
pub const INVALID_FD: RawFd = -1;

/// Accessor a host socket wrapper implements to expose its descriptor.
pub trait NativeHandle {
    /// The underlying descriptor, or `None` if the wrapper is closed.
    fn raw_fd(&self) -> Option<RawFd>;
}

impl NativeHandle for TcpStream {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

impl NativeHandle for TcpListener {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

impl NativeHandle for UnixStream {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

impl NativeHandle for OwnedFd {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

/// Where `transfer` takes its descriptor from.
#[derive(Clone)]
pub enum SocketSource {
    /// A descriptor number passed by value.
    Raw(RawFd),
    /// A host socket wrapper.
    Handle(Rc<dyn NativeHandle>),
}

impl SocketSource {
    /// Interpret the first argument of `transfer`.
    ///
    /// Numbers are taken as descriptors and native wrappers are asked for
    /// theirs. Any other value is rejected.
    pub fn from_host(value: &HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Number(n) if n.fract() == 0.0 => {
                let fd = RawFd::try_from(*n as i64).unwrap_or(INVALID_FD);
                Ok(Self::Raw(fd))
            }
            HostValue::External(External::Native(handle)) => Ok(Self::Handle(handle.clone())),
            other => Err(BridgeError::validation(format!(
                "transfer expects a descriptor or socket handle, got {}",
                other.type_name()
            ))),
        }
    }

    /// The descriptor this source names, or [`INVALID_FD`].
    pub fn raw_fd(&self) -> RawFd {
        match self {
            Self::Raw(fd) => *fd,
            Self::Handle(handle) => handle.raw_fd().unwrap_or(INVALID_FD),
        }
    }
}

impl fmt::Debug for SocketSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(fd) => write!(f, "SocketSource::Raw({fd})"),
            Self::Handle(handle) => write!(f, "SocketSource::Handle(fd={:?})", handle.raw_fd()),
        }
    }
}

impl From<RawFd> for SocketSource {
    fn from(fd: RawFd) -> Self {
        Self::Raw(fd)
    }
}

/// Duplicate `fd` into a new close-on-exec descriptor owned by the caller.
///
/// Negative input is a validation error; a kernel refusal (closed or
/// exhausted descriptors) is an I/O error carrying the OS cause.
pub fn duplicate(fd: RawFd) -> BridgeResult<OwnedFd> {
    if fd < 0 {
        return Err(BridgeError::validation(format!("descriptor {fd} is not valid")));
    }
    // SAFETY: fcntl only reads `fd`. A closed or foreign number makes it fail
    // with EBADF, which is reported through the return value.
    let dup = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if dup < 0 {
        return Err(io::Error::last_os_error().into());
    }
    // SAFETY: `dup` is a fresh descriptor returned by fcntl and owned by no one else.
    Ok(unsafe { OwnedFd::from_raw_fd(dup) })
}
