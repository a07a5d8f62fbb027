//! Connection groups: handler slots, the registry of live groups, and
//! delivery of engine events to host handlers.

pub mod dispatch;
pub mod handlers;
pub mod registry;

use std::fmt;
use std::marker::PhantomData;

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{GroupHandle, Role};

use crate::host::{External, HostValue};

pub use handlers::{EventKind, HandlerSlot, HandlerTable};
pub use registry::{GroupData, GroupRegistry};

/// A typed reference to a group of role `R`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupRef<R: Role> {
    handle: GroupHandle,
    _role: PhantomData<R>,
}

impl<R: Role> GroupRef<R> {
    pub(crate) fn new(handle: GroupHandle) -> Self {
        Self {
            handle,
            _role: PhantomData,
        }
    }

    /// The engine group handle.
    pub fn handle(self) -> GroupHandle {
        self.handle
    }

    /// Expose the reference to the host.
    pub fn to_host(self) -> HostValue {
        HostValue::External(External::Group {
            handle: self.handle,
            role: R::KIND,
        })
    }

    /// Recover a reference from a host value, checking its role.
    ///
    /// Whether the group is still alive is checked when it is used.
    pub fn from_host(value: &HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::External(External::Group { handle, role }) if *role == R::KIND => {
                Ok(Self::new(*handle))
            }
            HostValue::External(External::Group { role, .. }) => Err(BridgeError::role_mismatch(
                format!("expected a {} group, got {role}", R::KIND),
            )),
            other => Err(BridgeError::validation(format!(
                "expected a group, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<R: Role> TryFrom<&HostValue> for GroupRef<R> {
    type Error = BridgeError;

    fn try_from(value: &HostValue) -> Result<Self, Self::Error> {
        Self::from_host(value)
    }
}

impl<R: Role> fmt::Debug for GroupRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupRef<{}>({})", R::KIND, self.handle)
    }
}
