//! In-memory engine.
//!
//! [`MockEngine`] keeps groups and connections in plain maps, records every
//! call the bridge makes, and lets the caller play the network: accept
//! connections, deliver frames, flush or cancel pending sends, complete
//! outbound connects. Handlers are cloned out before they run and no borrow
//! is held across a call, so handlers may re-enter the engine freely.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::net::SocketAddr;
use std::os::fd::OwnedFd;
use std::time::Duration;

use tracing::trace;

use wsbridge_core::types::{Address, GroupHandle, OpCode, RoleKind, SocketHandle};

use crate::transfer::tls::TlsSession;

use super::{
    ConnectionHandler, DisconnectionHandler, Engine, FrameHandler, MessageHandler,
    SendCompletion, SendOutcome, UserPointer,
};

/// Close code reported when a connection is terminated.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code used when a whole group is closed gracefully.
pub const NORMAL_CLOSURE: u16 = 1000;

/// A frame the bridge queued on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Target connection.
    pub socket: SocketHandle,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Whether a completion hook came with it.
    pub tracked: bool,
}

/// A group broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRecord {
    /// Target group.
    pub group: GroupHandle,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Connections that were members at the time.
    pub recipients: Vec<SocketHandle>,
}

/// How a connection was torn down at the bridge's request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// Closing handshake with code and reason.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: Vec<u8>,
    },
    /// Immediate termination.
    Terminated,
}

/// An upgrade the bridge delegated.
#[derive(Debug)]
pub struct UpgradeRecord {
    /// Descriptor handed over by the ticket.
    pub fd: OwnedFd,
    /// Handshake key.
    pub sec_key: Vec<u8>,
    /// TLS session handed over by the ticket.
    pub tls: Option<TlsSession>,
    /// Negotiated extensions.
    pub extensions: Vec<u8>,
    /// Target group.
    pub group: GroupHandle,
    /// Connection created for it.
    pub socket: SocketHandle,
}

/// An outbound connect the bridge requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    /// Target URI.
    pub uri: String,
    /// Connect timeout.
    pub timeout: Duration,
    /// Client group.
    pub group: GroupHandle,
    /// Whether an initial user pointer was supplied.
    pub with_user_data: bool,
}

#[derive(Default)]
struct MockGroup {
    role: Option<RoleKind>,
    connection: Option<ConnectionHandler>,
    message: Option<MessageHandler>,
    disconnection: Option<DisconnectionHandler>,
    ping: Option<FrameHandler>,
    pong: Option<FrameHandler>,
    members: BTreeSet<SocketHandle>,
}

struct MockSocket {
    group: GroupHandle,
    address: Address,
    user: Option<UserPointer>,
    pending: VecDeque<SendCompletion>,
    closing: bool,
}

struct PendingConnect {
    group: GroupHandle,
    user: Option<UserPointer>,
}

/// In-memory [`Engine`].
#[derive(Default)]
pub struct MockEngine {
    next_id: Cell<u64>,
    groups: RefCell<HashMap<GroupHandle, MockGroup>>,
    sockets: RefCell<HashMap<SocketHandle, MockSocket>>,
    sent: RefCell<Vec<SentFrame>>,
    broadcasts: RefCell<Vec<BroadcastRecord>>,
    teardowns: RefCell<Vec<(SocketHandle, Teardown)>>,
    group_closes: RefCell<Vec<GroupHandle>>,
    group_terminations: RefCell<Vec<GroupHandle>>,
    upgrades: RefCell<Vec<UpgradeRecord>>,
    connects: RefCell<Vec<ConnectRecord>>,
    pending_connects: RefCell<VecDeque<PendingConnect>>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("groups", &self.groups.borrow().len())
            .field("sockets", &self.sockets.borrow().len())
            .finish()
    }
}

impl MockEngine {
    /// An engine with no groups.
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn open_socket(
        &self,
        group: GroupHandle,
        address: Address,
        user: Option<UserPointer>,
    ) -> SocketHandle {
        let socket = SocketHandle::from_raw(self.mint());
        self.sockets.borrow_mut().insert(
            socket,
            MockSocket {
                group,
                address,
                user,
                pending: VecDeque::new(),
                closing: false,
            },
        );
        if let Some(entry) = self.groups.borrow_mut().get_mut(&group) {
            entry.members.insert(socket);
        }
        socket
    }

    fn default_address(socket_hint: u64) -> Address {
        let port = 40_000u16.wrapping_add(socket_hint as u16);
        Address::from(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn group_of(&self, socket: SocketHandle) -> Option<GroupHandle> {
        self.sockets.borrow().get(&socket).map(|s| s.group)
    }

    /// Mark `socket` as closing. Returns its group, or `None` when the socket
    /// is unknown or already on its way out.
    fn begin_close(&self, socket: SocketHandle) -> Option<GroupHandle> {
        let mut sockets = self.sockets.borrow_mut();
        let state = sockets.get_mut(&socket)?;
        if state.closing {
            return None;
        }
        state.closing = true;
        Some(state.group)
    }

    fn fire_connection(&self, socket: SocketHandle) {
        let Some(group) = self.group_of(socket) else {
            return;
        };
        let handler = self.groups.borrow().get(&group).and_then(|g| g.connection.clone());
        if let Some(handler) = handler {
            handler(socket);
        }
    }

    /// Accept an inbound connection on `group` and run its connection handler.
    pub fn accept(&self, group: GroupHandle) -> SocketHandle {
        let address = Self::default_address(self.next_id.get() + 1);
        self.accept_from(group, address)
    }

    /// Accept an inbound connection with a specific remote address.
    pub fn accept_from(&self, group: GroupHandle, address: Address) -> SocketHandle {
        let socket = self.open_socket(group, address, None);
        trace!(socket = %socket, group = %group, "Mock accept");
        self.fire_connection(socket);
        socket
    }

    /// Complete the oldest pending outbound connect.
    pub fn establish_next(&self) -> Option<SocketHandle> {
        let pending = self.pending_connects.borrow_mut().pop_front()?;
        let address = Self::default_address(self.next_id.get() + 1);
        let socket = self.open_socket(pending.group, address, pending.user);
        self.fire_connection(socket);
        Some(socket)
    }

    /// Fail the oldest pending outbound connect. Its user pointer is dropped.
    pub fn fail_next_connect(&self) -> bool {
        self.pending_connects.borrow_mut().pop_front().is_some()
    }

    /// Deliver a data frame to the group's message handler.
    pub fn deliver_message(&self, socket: SocketHandle, payload: &[u8], opcode: OpCode) {
        let Some(group) = self.group_of(socket) else {
            return;
        };
        let handler = self.groups.borrow().get(&group).and_then(|g| g.message.clone());
        if let Some(handler) = handler {
            handler(socket, payload, opcode);
        }
    }

    /// Deliver a ping to the group's ping handler.
    pub fn deliver_ping(&self, socket: SocketHandle, payload: &[u8]) {
        let Some(group) = self.group_of(socket) else {
            return;
        };
        let handler = self.groups.borrow().get(&group).and_then(|g| g.ping.clone());
        if let Some(handler) = handler {
            handler(socket, payload);
        }
    }

    /// Deliver a pong to the group's pong handler.
    pub fn deliver_pong(&self, socket: SocketHandle, payload: &[u8]) {
        let Some(group) = self.group_of(socket) else {
            return;
        };
        let handler = self.groups.borrow().get(&group).and_then(|g| g.pong.clone());
        if let Some(handler) = handler {
            handler(socket, payload);
        }
    }

    /// Close a connection from the remote side.
    ///
    /// The socket is marked closing first, so closing it again from inside
    /// the disconnection handler is a no-op. The handler runs while user data
    /// is still attached; afterwards pending sends are cancelled and the user
    /// pointer dropped. Unknown or already closing sockets are ignored.
    pub fn disconnect(&self, socket: SocketHandle, code: u16, reason: &[u8]) {
        let Some(group) = self.begin_close(socket) else {
            return;
        };
        let handler = self
            .groups
            .borrow()
            .get(&group)
            .and_then(|g| g.disconnection.clone());
        if let Some(handler) = handler {
            handler(socket, code, reason);
        }
        self.destroy(socket);
    }

    fn destroy(&self, socket: SocketHandle) {
        let Some(state) = self.sockets.borrow_mut().remove(&socket) else {
            return;
        };
        if let Some(entry) = self.groups.borrow_mut().get_mut(&state.group) {
            entry.members.remove(&socket);
        }
        let MockSocket { pending, user, .. } = state;
        for completion in pending {
            completion(SendOutcome::Cancelled);
        }
        drop(user);
        trace!(socket = %socket, "Mock socket destroyed");
    }

    /// Flush every pending send on `socket`. Returns how many completed.
    pub fn flush(&self, socket: SocketHandle) -> usize {
        let pending: Vec<SendCompletion> = match self.sockets.borrow_mut().get_mut(&socket) {
            Some(state) => state.pending.drain(..).collect(),
            None => return 0,
        };
        let count = pending.len();
        for completion in pending {
            completion(SendOutcome::Completed);
        }
        count
    }

    /// Sends still waiting for a flush on `socket`.
    pub fn pending_sends(&self, socket: SocketHandle) -> usize {
        self.sockets
            .borrow()
            .get(&socket)
            .map_or(0, |s| s.pending.len())
    }

    /// Returns true while `socket` is open and not closing.
    pub fn is_open(&self, socket: SocketHandle) -> bool {
        self.sockets.borrow().get(&socket).is_some_and(|s| !s.closing)
    }

    /// Returns true while `group` exists.
    pub fn has_group(&self, group: GroupHandle) -> bool {
        self.groups.borrow().contains_key(&group)
    }

    /// Role `group` was created with.
    pub fn group_role(&self, group: GroupHandle) -> Option<RoleKind> {
        self.groups.borrow().get(&group).and_then(|g| g.role)
    }

    /// Open connections in `group`.
    pub fn members(&self, group: GroupHandle) -> Vec<SocketHandle> {
        self.groups
            .borrow()
            .get(&group)
            .map(|g| g.members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every frame queued so far, broadcasts included per recipient.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.borrow().clone()
    }

    /// Frames queued on `socket`.
    pub fn sent_to(&self, socket: SocketHandle) -> Vec<SentFrame> {
        self.sent
            .borrow()
            .iter()
            .filter(|f| f.socket == socket)
            .cloned()
            .collect()
    }

    /// Every broadcast so far.
    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.broadcasts.borrow().clone()
    }

    /// Connections closed or terminated by the bridge.
    pub fn teardowns(&self) -> Vec<(SocketHandle, Teardown)> {
        self.teardowns.borrow().clone()
    }

    /// Groups closed by the bridge.
    pub fn group_closes(&self) -> Vec<GroupHandle> {
        self.group_closes.borrow().clone()
    }

    /// Groups terminated by the bridge.
    pub fn group_terminations(&self) -> Vec<GroupHandle> {
        self.group_terminations.borrow().clone()
    }

    /// Number of upgrades delegated so far and not yet taken.
    pub fn upgrade_count(&self) -> usize {
        self.upgrades.borrow().len()
    }

    /// Take the recorded upgrades, releasing nothing.
    pub fn take_upgrades(&self) -> Vec<UpgradeRecord> {
        std::mem::take(&mut *self.upgrades.borrow_mut())
    }

    /// Every outbound connect requested so far.
    pub fn connects(&self) -> Vec<ConnectRecord> {
        self.connects.borrow().clone()
    }
}

impl Engine for MockEngine {
    fn create_group(&self, role: RoleKind) -> GroupHandle {
        let group = GroupHandle::from_raw(self.mint());
        self.groups.borrow_mut().insert(
            group,
            MockGroup {
                role: Some(role),
                ..MockGroup::default()
            },
        );
        group
    }

    fn delete_group(&self, group: GroupHandle) {
        let Some(entry) = self.groups.borrow_mut().remove(&group) else {
            return;
        };
        for socket in entry.members.iter().copied() {
            self.destroy(socket);
        }
        drop(entry);
    }

    fn on_connection(&self, group: GroupHandle, handler: ConnectionHandler) {
        let previous = self
            .groups
            .borrow_mut()
            .get_mut(&group)
            .and_then(|g| g.connection.replace(handler));
        drop(previous);
    }

    fn on_message(&self, group: GroupHandle, handler: MessageHandler) {
        let previous = self
            .groups
            .borrow_mut()
            .get_mut(&group)
            .and_then(|g| g.message.replace(handler));
        drop(previous);
    }

    fn on_disconnection(&self, group: GroupHandle, handler: DisconnectionHandler) {
        let previous = self
            .groups
            .borrow_mut()
            .get_mut(&group)
            .and_then(|g| g.disconnection.replace(handler));
        drop(previous);
    }

    fn on_ping(&self, group: GroupHandle, handler: FrameHandler) {
        let previous = self
            .groups
            .borrow_mut()
            .get_mut(&group)
            .and_then(|g| g.ping.replace(handler));
        drop(previous);
    }

    fn on_pong(&self, group: GroupHandle, handler: FrameHandler) {
        let previous = self
            .groups
            .borrow_mut()
            .get_mut(&group)
            .and_then(|g| g.pong.replace(handler));
        drop(previous);
    }

    fn send(
        &self,
        socket: SocketHandle,
        payload: &[u8],
        opcode: OpCode,
        completion: Option<SendCompletion>,
    ) {
        self.sent.borrow_mut().push(SentFrame {
            socket,
            payload: payload.to_vec(),
            opcode,
            tracked: completion.is_some(),
        });
        let Some(completion) = completion else {
            return;
        };
        let rejected = match self.sockets.borrow_mut().get_mut(&socket) {
            Some(state) => {
                state.pending.push_back(completion);
                None
            }
            None => Some(completion),
        };
        if let Some(completion) = rejected {
            completion(SendOutcome::Cancelled);
        }
    }

    fn close(&self, socket: SocketHandle, code: u16, reason: &[u8]) {
        if !self.is_open(socket) {
            return;
        }
        self.teardowns.borrow_mut().push((
            socket,
            Teardown::Closed {
                code,
                reason: reason.to_vec(),
            },
        ));
        self.disconnect(socket, code, reason);
    }

    fn terminate(&self, socket: SocketHandle) {
        if !self.is_open(socket) {
            return;
        }
        self.teardowns
            .borrow_mut()
            .push((socket, Teardown::Terminated));
        self.disconnect(socket, ABNORMAL_CLOSURE, b"");
    }

    fn close_group(&self, group: GroupHandle) {
        self.group_closes.borrow_mut().push(group);
        for socket in self.members(group) {
            self.disconnect(socket, NORMAL_CLOSURE, b"");
        }
    }

    fn terminate_group(&self, group: GroupHandle) {
        self.group_terminations.borrow_mut().push(group);
        for socket in self.members(group) {
            self.disconnect(socket, ABNORMAL_CLOSURE, b"");
        }
    }

    fn broadcast(&self, group: GroupHandle, payload: &[u8], opcode: OpCode) {
        let recipients = self.members(group);
        {
            let mut sent = self.sent.borrow_mut();
            for socket in &recipients {
                sent.push(SentFrame {
                    socket: *socket,
                    payload: payload.to_vec(),
                    opcode,
                    tracked: false,
                });
            }
        }
        self.broadcasts.borrow_mut().push(BroadcastRecord {
            group,
            payload: payload.to_vec(),
            opcode,
            recipients,
        });
    }

    fn address(&self, socket: SocketHandle) -> Address {
        self.sockets
            .borrow()
            .get(&socket)
            .map(|s| s.address.clone())
            .unwrap_or_else(|| Address {
                port: 0,
                address: String::new(),
                family: String::new(),
            })
    }

    fn user_pointer(&self, socket: SocketHandle) -> Option<UserPointer> {
        self.sockets
            .borrow()
            .get(&socket)
            .and_then(|s| s.user.clone())
    }

    fn set_user_pointer(
        &self,
        socket: SocketHandle,
        pointer: Option<UserPointer>,
    ) -> Option<UserPointer> {
        let mut sockets = self.sockets.borrow_mut();
        let state = sockets.get_mut(&socket)?;
        std::mem::replace(&mut state.user, pointer)
    }

    fn connect(
        &self,
        uri: &str,
        user: Option<UserPointer>,
        timeout: Duration,
        group: GroupHandle,
    ) {
        self.connects.borrow_mut().push(ConnectRecord {
            uri: uri.to_string(),
            timeout,
            group,
            with_user_data: user.is_some(),
        });
        self.pending_connects
            .borrow_mut()
            .push_back(PendingConnect { group, user });
    }

    fn upgrade(
        &self,
        fd: OwnedFd,
        sec_key: &[u8],
        tls: Option<TlsSession>,
        extensions: &[u8],
        group: GroupHandle,
    ) {
        let address = Self::default_address(self.next_id.get() + 1);
        let socket = self.open_socket(group, address, None);
        self.upgrades.borrow_mut().push(UpgradeRecord {
            fd,
            sec_key: sec_key.to_vec(),
            tls,
            extensions: extensions.to_vec(),
            group,
            socket,
        });
        self.fire_connection(socket);
    }
}
