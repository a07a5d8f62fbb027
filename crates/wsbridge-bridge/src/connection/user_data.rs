//! Per-connection user data.
//!
//! A connection's engine user pointer, when set by the bridge, is a
//! [`UserDataSlot`]. The slot is allocated on the first `set`, refilled in
//! place on later ones and released on `clear`. If the host never clears it,
//! the engine drops the pointer on teardown, which releases the value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use wsbridge_core::types::SocketHandle;

use crate::engine::{Engine, UserPointer};
use crate::host::{HostValue, Persistent};

/// The single host value attached to a connection.
pub struct UserDataSlot {
    value: RefCell<Persistent<HostValue>>,
}

impl UserDataSlot {
    /// A slot holding `value`.
    pub fn new(value: HostValue) -> Self {
        Self {
            value: RefCell::new(Persistent::new(value)),
        }
    }

    /// A slot wrapped as an engine user pointer.
    pub fn attach(value: HostValue) -> UserPointer {
        Rc::new(Self::new(value))
    }

    /// Current value, or `Undefined` once released.
    pub fn get(&self) -> HostValue {
        self.value.borrow().cloned().unwrap_or_default()
    }

    /// Replace the held value. Returns true if a previous value was released.
    pub fn replace(&self, value: HostValue) -> bool {
        self.value.borrow_mut().reset(value)
    }

    /// Release the held value.
    pub fn release(&self) -> bool {
        self.value.borrow_mut().release()
    }
}

impl fmt::Debug for UserDataSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.try_borrow() {
            Ok(value) => write!(f, "UserDataSlot({:?})", value.get()),
            Err(_) => write!(f, "UserDataSlot(<borrowed>)"),
        }
    }
}

/// The bridge slot attached to `socket`, if any.
pub fn slot_of<E: Engine + ?Sized>(engine: &E, socket: SocketHandle) -> Option<Rc<UserDataSlot>> {
    engine.user_pointer(socket)?.downcast::<UserDataSlot>().ok()
}

/// Attach `value`, reusing the connection's slot when one exists.
pub fn set<E: Engine + ?Sized>(engine: &E, socket: SocketHandle, value: HostValue) {
    match slot_of(engine, socket) {
        Some(slot) => {
            slot.replace(value);
        }
        None => {
            engine.set_user_pointer(socket, Some(UserDataSlot::attach(value)));
        }
    }
}

/// The attached value, or `Undefined`.
pub fn get<E: Engine + ?Sized>(engine: &E, socket: SocketHandle) -> HostValue {
    slot_of(engine, socket)
        .map(|slot| slot.get())
        .unwrap_or_default()
}

/// Release and detach the connection's slot.
///
/// Returns false, and does nothing, when no slot was attached.
pub fn clear<E: Engine + ?Sized>(engine: &E, socket: SocketHandle) -> bool {
    match engine.set_user_pointer(socket, None) {
        Some(previous) => {
            if let Ok(slot) = previous.downcast::<UserDataSlot>() {
                slot.release();
            }
            true
        }
        None => {
            debug!(socket = %socket, "clearUserData on a connection without user data");
            false
        }
    }
}
