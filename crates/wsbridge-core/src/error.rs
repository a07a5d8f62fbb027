//! Unified error types for WsBridge.
//!
//! Every fallible bridge operation maps its failure into [`BridgeError`] so
//! callers can propagate with `?` and inspect the [`ErrorKind`] when they need
//! to branch.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A group, connection or ticket reference is unknown or already consumed.
    InvalidHandle,
    /// The operation requires a group of the other role.
    RoleMismatch,
    /// An argument from the host had the wrong shape or value.
    Validation,
    /// An OS-level operation failed (descriptor duplication).
    Io,
    /// Configuration could not be loaded or is inconsistent.
    Configuration,
    /// A host callback raised while being invoked.
    HostException,
    /// The hub is in the wrong lifecycle state for the request.
    Lifecycle,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "INVALID_HANDLE"),
            Self::RoleMismatch => write!(f, "ROLE_MISMATCH"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Io => write!(f, "IO"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::HostException => write!(f, "HOST_EXCEPTION"),
            Self::Lifecycle => write!(f, "LIFECYCLE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout WsBridge.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct BridgeError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BridgeError {
    /// Create a new bridge error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new bridge error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-handle error.
    pub fn invalid_handle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidHandle, message)
    }

    /// Create a role-mismatch error.
    pub fn role_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RoleMismatch, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a lifecycle error.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lifecycle, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns true if this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for BridgeError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
