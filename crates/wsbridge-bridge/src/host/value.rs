//! Host-visible values.
//!
//! This is the slice of the host runtime's object model that crosses the
//! bridge: payload carriers (text, buffers, views), callables, opaque
//! references to bridge objects, and arbitrary objects attached as user data.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;

use wsbridge_core::types::{GroupHandle, RoleKind, SocketHandle};

use crate::transfer::socket::NativeHandle;
use crate::transfer::ticket::TicketCell;
use crate::transfer::tls::TlsSession;

use super::function::HostFunction;

/// A typed view over a region of a binary buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteView {
    /// Backing storage shared with the host.
    pub buffer: Bytes,
    /// Byte offset of the view into `buffer`.
    pub offset: usize,
    /// Length of the view in bytes.
    pub length: usize,
}

impl ByteView {
    /// A view over the whole of `buffer`.
    pub fn whole(buffer: Bytes) -> Self {
        let length = buffer.len();
        Self {
            buffer,
            offset: 0,
            length,
        }
    }

    /// A view over `length` bytes starting at `offset`.
    pub fn new(buffer: Bytes, offset: usize, length: usize) -> Self {
        Self {
            buffer,
            offset,
            length,
        }
    }

    /// The viewed bytes without copying, clamped to the backing buffer.
    pub fn bytes(&self) -> Bytes {
        let start = self.offset.min(self.buffer.len());
        let end = start.saturating_add(self.length).min(self.buffer.len());
        self.buffer.slice(start..end)
    }
}

/// Opaque host-visible references to bridge objects.
#[derive(Clone)]
pub enum External {
    /// A connection group.
    Group {
        /// Engine handle.
        handle: GroupHandle,
        /// Role the group was created with.
        role: RoleKind,
    },
    /// A live connection.
    Connection {
        /// Engine handle.
        socket: SocketHandle,
        /// Role of the owning group.
        role: RoleKind,
    },
    /// A transfer ticket awaiting redemption.
    Ticket(TicketCell),
    /// A shared TLS session.
    Tls(TlsSession),
    /// A host socket wrapper exposing its descriptor.
    Native(Rc<dyn NativeHandle>),
}

impl PartialEq for External {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Group { handle: a, role: ra },
                Self::Group { handle: b, role: rb },
            ) => a == b && ra == rb,
            (
                Self::Connection { socket: a, role: ra },
                Self::Connection { socket: b, role: rb },
            ) => a == b && ra == rb,
            (Self::Ticket(a), Self::Ticket(b)) => a.ptr_eq(b),
            (Self::Tls(a), Self::Tls(b)) => a.ptr_eq(b),
            (Self::Native(a), Self::Native(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group { handle, role } => write!(f, "External::Group({handle}, {role})"),
            Self::Connection { socket, role } => {
                write!(f, "External::Connection({socket}, {role})")
            }
            Self::Ticket(cell) => write!(f, "External::Ticket({cell:?})"),
            Self::Tls(session) => write!(f, "External::Tls({session:?})"),
            Self::Native(handle) => write!(f, "External::Native(fd={:?})", handle.raw_fd()),
        }
    }
}

/// A value owned by the host runtime.
#[derive(Clone, Default)]
pub enum HostValue {
    /// The host's "no value" marker.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (the host has a single numeric type).
    Number(f64),
    /// String.
    Text(String),
    /// Owned byte buffer.
    Buffer(Bytes),
    /// Raw binary buffer.
    ArrayBuffer(Bytes),
    /// Typed view over a binary buffer.
    TypedArray(ByteView),
    /// Callable.
    Function(HostFunction),
    /// Opaque reference to a bridge object.
    External(External),
    /// Any other host object.
    Object(Rc<dyn Any>),
}

impl HostValue {
    /// Returns true for [`HostValue::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Borrow the string contents, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the callable, if this is a function.
    pub fn as_function(&self) -> Option<&HostFunction> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Borrow the external reference, if this is one.
    pub fn as_external(&self) -> Option<&External> {
        match self {
            Self::External(e) => Some(e),
            _ => None,
        }
    }

    /// Number value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Buffer(_) => "Buffer",
            Self::ArrayBuffer(_) => "ArrayBuffer",
            Self::TypedArray(_) => "TypedArray",
            Self::Function(_) => "function",
            Self::External(_) => "external",
            Self::Object(_) => "object",
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Buffer(a), Self::Buffer(b)) => a == b,
            (Self::ArrayBuffer(a), Self::ArrayBuffer(b)) => a == b,
            (Self::TypedArray(a), Self::TypedArray(b)) => a.bytes() == b.bytes(),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::External(a), Self::External(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Buffer(b) => write!(f, "Buffer({} bytes)", b.len()),
            Self::ArrayBuffer(b) => write!(f, "ArrayBuffer({} bytes)", b.len()),
            Self::TypedArray(v) => write!(f, "TypedArray({} bytes)", v.length),
            Self::Function(func) => write!(f, "{func:?}"),
            Self::External(e) => write!(f, "{e:?}"),
            Self::Object(obj) => write!(f, "Object({:p})", Rc::as_ptr(obj) as *const ()),
        }
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<HostFunction> for HostValue {
    fn from(f: HostFunction) -> Self {
        Self::Function(f)
    }
}

impl From<External> for HostValue {
    fn from(e: External) -> Self {
        Self::External(e)
    }
}
