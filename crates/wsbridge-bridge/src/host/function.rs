//! Callable host values.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use wsbridge_core::error::{BridgeError, ErrorKind};

use super::value::HostValue;

/// An exception raised by host code while a callback was running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host exception: {message}")]
pub struct HostException {
    /// Message carried by the exception.
    pub message: String,
}

impl HostException {
    /// Create a new exception with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<HostException> for BridgeError {
    fn from(err: HostException) -> Self {
        BridgeError::new(ErrorKind::HostException, err.message)
    }
}

type Callable = dyn Fn(&[HostValue]) -> Result<HostValue, HostException>;

/// A reference-counted host function.
///
/// Cloning shares the same underlying callable; equality is identity.
#[derive(Clone)]
pub struct HostFunction {
    inner: Rc<Callable>,
}

impl HostFunction {
    /// Wrap a closure as a host function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue, HostException> + 'static,
    {
        Self { inner: Rc::new(f) }
    }

    /// Invoke the function with the given arguments.
    pub fn call(&self, args: &[HostValue]) -> Result<HostValue, HostException> {
        (self.inner)(args)
    }

    /// Number of live references to the underlying callable.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Returns true if both values refer to the same callable.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction({:p})", Rc::as_ptr(&self.inner) as *const ())
    }
}
