//! Per-group handler slots.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::host::{HostFunction, Persistent};

/// Event kinds a group can have a handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A connection joined the group.
    Connection,
    /// A data frame arrived.
    Message,
    /// A connection closed.
    Disconnection,
    /// A ping arrived.
    Ping,
    /// A pong arrived.
    Pong,
}

impl EventKind {
    /// Every event kind, in slot order.
    pub const ALL: [EventKind; 5] = [
        Self::Connection,
        Self::Message,
        Self::Disconnection,
        Self::Ping,
        Self::Pong,
    ];

    fn index(self) -> usize {
        match self {
            Self::Connection => 0,
            Self::Message => 1,
            Self::Disconnection => 2,
            Self::Ping => 3,
            Self::Pong => 4,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Message => write!(f, "message"),
            Self::Disconnection => write!(f, "disconnection"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
        }
    }
}

/// One handler slot, shared between the group record and the closure the
/// engine holds for that event kind.
pub type HandlerSlot = Rc<RefCell<Persistent<HostFunction>>>;

/// The five handler slots of a group.
#[derive(Debug)]
pub struct HandlerTable {
    slots: [HandlerSlot; 5],
}

impl HandlerTable {
    /// A table with every slot empty.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Rc::new(RefCell::new(Persistent::empty()))),
        }
    }

    /// Shared handle to the slot for `kind`.
    pub fn slot(&self, kind: EventKind) -> HandlerSlot {
        self.slots[kind.index()].clone()
    }

    /// Install `handler` for `kind`. Returns true if a previous handler was
    /// released.
    pub fn replace(&self, kind: EventKind, handler: HostFunction) -> bool {
        self.slots[kind.index()].borrow_mut().reset(handler)
    }

    /// The handler currently installed for `kind`.
    pub fn current(&self, kind: EventKind) -> Option<HostFunction> {
        self.slots[kind.index()].borrow().cloned()
    }

    /// Number of slots holding a handler.
    pub fn registered(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.borrow().is_empty()).count()
    }

    /// Release every slot, set or not. Returns the number of slots released.
    pub fn release_all(&self) -> usize {
        for slot in &self.slots {
            slot.borrow_mut().release();
        }
        self.slots.len()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
