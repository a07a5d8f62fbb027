//! The WebSocket engine collaborator.
//!
//! The engine owns handshakes, framing, I/O multiplexing and group
//! scheduling. The bridge consumes it through [`Engine`] and never
//! reimplements any of it.
//!
//! All methods take `&self`: the engine runs on a single event-delivery
//! thread and invokes registered handlers from inside its own loop, and a
//! handler is allowed to call straight back into the engine (send, close,
//! user data) while it runs.

#[cfg(feature = "mock")]
pub mod mock;

use std::any::Any;
use std::os::fd::OwnedFd;
use std::rc::Rc;
use std::time::Duration;

use wsbridge_core::types::{Address, GroupHandle, OpCode, RoleKind, SocketHandle};

use crate::transfer::tls::TlsSession;

/// Handler for a new connection in a group.
pub type ConnectionHandler = Rc<dyn Fn(SocketHandle)>;

/// Handler for a data message: `(socket, payload, opcode)`.
pub type MessageHandler = Rc<dyn Fn(SocketHandle, &[u8], OpCode)>;

/// Handler for a ping or pong control frame: `(socket, payload)`.
pub type FrameHandler = Rc<dyn Fn(SocketHandle, &[u8])>;

/// Handler for a closed connection: `(socket, code, reason)`.
pub type DisconnectionHandler = Rc<dyn Fn(SocketHandle, u16, &[u8])>;

/// Completion hook for a single send. The engine calls it exactly once.
pub type SendCompletion = Box<dyn FnOnce(SendOutcome)>;

/// Opaque per-connection pointer stored by the engine and dropped by it when
/// the connection is torn down.
pub type UserPointer = Rc<dyn Any>;

/// How an individual send finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The payload was flushed to the socket.
    Completed,
    /// The connection went away before the payload was flushed.
    Cancelled,
}

impl SendOutcome {
    /// Map the engine's `cancelled` flag to an outcome.
    pub fn from_cancelled(cancelled: bool) -> Self {
        if cancelled { Self::Cancelled } else { Self::Completed }
    }
}

/// Operations the bridge needs from the WebSocket engine.
pub trait Engine {
    /// Allocate a group with the given role.
    fn create_group(&self, role: RoleKind) -> GroupHandle;

    /// Free a group and every handler registered on it.
    fn delete_group(&self, group: GroupHandle);

    /// Install the connection handler, replacing any previous one.
    fn on_connection(&self, group: GroupHandle, handler: ConnectionHandler);

    /// Install the message handler, replacing any previous one.
    fn on_message(&self, group: GroupHandle, handler: MessageHandler);

    /// Install the disconnection handler, replacing any previous one.
    fn on_disconnection(&self, group: GroupHandle, handler: DisconnectionHandler);

    /// Install the ping handler, replacing any previous one.
    fn on_ping(&self, group: GroupHandle, handler: FrameHandler);

    /// Install the pong handler, replacing any previous one.
    fn on_pong(&self, group: GroupHandle, handler: FrameHandler);

    /// Queue a frame on a connection.
    fn send(
        &self,
        socket: SocketHandle,
        payload: &[u8],
        opcode: OpCode,
        completion: Option<SendCompletion>,
    );

    /// Start the closing handshake on a connection.
    fn close(&self, socket: SocketHandle, code: u16, reason: &[u8]);

    /// Tear a connection down immediately.
    fn terminate(&self, socket: SocketHandle);

    /// Gracefully close every connection in a group.
    fn close_group(&self, group: GroupHandle);

    /// Immediately tear down every connection in a group.
    fn terminate_group(&self, group: GroupHandle);

    /// Send the same frame to every connection in a group.
    fn broadcast(&self, group: GroupHandle, payload: &[u8], opcode: OpCode);

    /// Remote endpoint of a connection.
    fn address(&self, socket: SocketHandle) -> Address;

    /// The pointer currently attached to a connection.
    fn user_pointer(&self, socket: SocketHandle) -> Option<UserPointer>;

    /// Attach (or detach, with `None`) a pointer, returning the previous one.
    fn set_user_pointer(
        &self,
        socket: SocketHandle,
        pointer: Option<UserPointer>,
    ) -> Option<UserPointer>;

    /// Open an outbound connection on a client group.
    fn connect(
        &self,
        uri: &str,
        user: Option<UserPointer>,
        timeout: Duration,
        group: GroupHandle,
    );

    /// Take over an accepted socket and finish the WebSocket handshake on it.
    fn upgrade(
        &self,
        fd: OwnedFd,
        sec_key: &[u8],
        tls: Option<TlsSession>,
        extensions: &[u8],
        group: GroupHandle,
    );
}
