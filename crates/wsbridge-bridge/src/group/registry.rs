//! Registry of live groups.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{GroupHandle, RoleKind};

use super::handlers::HandlerTable;

/// The bridge's record for one group.
#[derive(Debug)]
pub struct GroupData {
    /// Role the group was created with
    pub role: RoleKind,
    /// Handler slots
    pub handlers: HandlerTable,
    /// When the group was created
    pub created_at: DateTime<Utc>,
}

impl GroupData {
    fn new(role: RoleKind) -> Self {
        Self {
            role,
            handlers: HandlerTable::new(),
            created_at: Utc::now(),
        }
    }
}

/// Live groups keyed by engine handle.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RefCell<HashMap<GroupHandle, Rc<GroupData>>>,
}

impl GroupRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly created engine group.
    pub fn insert(&self, handle: GroupHandle, role: RoleKind) -> Rc<GroupData> {
        let data = Rc::new(GroupData::new(role));
        self.groups.borrow_mut().insert(handle, data.clone());
        data
    }

    /// Look up a live group, checking its role.
    pub fn get(&self, handle: GroupHandle, role: RoleKind) -> BridgeResult<Rc<GroupData>> {
        let data = self
            .groups
            .borrow()
            .get(&handle)
            .cloned()
            .ok_or_else(|| BridgeError::invalid_handle(format!("unknown group {handle}")))?;
        if data.role != role {
            return Err(BridgeError::role_mismatch(format!(
                "{handle} is a {} group, not {role}",
                data.role
            )));
        }
        Ok(data)
    }

    /// Remove a live group, checking its role.
    pub fn remove(&self, handle: GroupHandle, role: RoleKind) -> BridgeResult<Rc<GroupData>> {
        self.get(handle, role)?;
        self.groups
            .borrow_mut()
            .remove(&handle)
            .ok_or_else(|| BridgeError::invalid_handle(format!("unknown group {handle}")))
    }

    /// Number of live groups.
    pub fn len(&self) -> usize {
        self.groups.borrow().len()
    }

    /// Returns true if no group is alive.
    pub fn is_empty(&self) -> bool {
        self.groups.borrow().is_empty()
    }
}
