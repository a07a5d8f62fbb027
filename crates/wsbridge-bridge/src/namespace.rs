//! Role-parameterized operations.
//!
//! Server and client groups share one operation set. A [`Namespace`] pins the
//! role at compile time, so a server group reference cannot be handed to a
//! client operation and vice versa.

use std::marker::PhantomData;

use tracing::{debug, info};

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{OpCode, Role};

use crate::connection::ConnectionRef;
use crate::engine::Engine;
use crate::group::{EventKind, GroupRef, dispatch};
use crate::host::{HostFunction, HostValue};
use crate::hub::Hub;
use crate::message::codec;
use crate::metrics::{groups, sends};
use crate::send::SendOperation;

/// Group and connection operations for role `R`.
pub struct Namespace<'h, R: Role, E: Engine> {
    hub: &'h Hub<E>,
    _role: PhantomData<R>,
}

impl<'h, R: Role, E: Engine + 'static> Namespace<'h, R, E> {
    pub(crate) fn new(hub: &'h Hub<E>) -> Self {
        Self {
            hub,
            _role: PhantomData,
        }
    }

    /// Allocate a group with empty handler slots.
    pub fn create_group(&self) -> BridgeResult<GroupRef<R>> {
        self.hub.ensure_running()?;
        let handle = self.hub.engine.create_group(R::KIND);
        self.hub.groups.insert(handle, R::KIND);
        groups::record_created(&self.hub.metrics);
        info!(group = %handle, role = %R::KIND, "Group created");
        Ok(GroupRef::new(handle))
    }

    /// Release all five handler slots, then free the group.
    ///
    /// Returns the number of slots released.
    pub fn delete_group(&self, group: GroupRef<R>) -> BridgeResult<usize> {
        let data = self.hub.groups.remove(group.handle(), R::KIND)?;
        let registered = data.handlers.registered();
        let released = data.handlers.release_all();
        self.hub.engine.delete_group(group.handle());
        groups::record_deleted(&self.hub.metrics, released);
        info!(group = %group.handle(), role = %R::KIND, registered, "Group deleted");
        Ok(released)
    }

    /// Install `handler` for `kind`, releasing the previous one.
    pub fn on(
        &self,
        group: GroupRef<R>,
        kind: EventKind,
        handler: HostFunction,
    ) -> BridgeResult<()> {
        let data = self.hub.groups.get(group.handle(), R::KIND)?;
        if data.handlers.replace(kind, handler) {
            groups::record_handler_released(&self.hub.metrics);
            debug!(group = %group.handle(), event = %kind, "Handler replaced");
        }
        dispatch::install(
            &self.hub.engine,
            group.handle(),
            R::KIND,
            kind,
            data.handlers.slot(kind),
            self.hub.metrics.clone(),
        );
        Ok(())
    }

    /// `on` for host arguments; the handler must be a function.
    pub fn on_host(
        &self,
        group: &HostValue,
        kind: EventKind,
        handler: &HostValue,
    ) -> BridgeResult<()> {
        let group = GroupRef::<R>::from_host(group)?;
        let handler = handler.as_function().cloned().ok_or_else(|| {
            BridgeError::validation(format!(
                "{kind} handler must be a function, got {}",
                handler.type_name()
            ))
        })?;
        self.on(group, kind, handler)
    }

    /// Handler called with `(connection)`.
    pub fn on_connection(&self, group: GroupRef<R>, handler: HostFunction) -> BridgeResult<()> {
        self.on(group, EventKind::Connection, handler)
    }

    /// Handler called with `(message, userData)`.
    pub fn on_message(&self, group: GroupRef<R>, handler: HostFunction) -> BridgeResult<()> {
        self.on(group, EventKind::Message, handler)
    }

    /// Handler called with `(connection, code, reason, userData)`.
    pub fn on_disconnection(&self, group: GroupRef<R>, handler: HostFunction) -> BridgeResult<()> {
        self.on(group, EventKind::Disconnection, handler)
    }

    /// Handler called with `(payload, userData)`.
    pub fn on_ping(&self, group: GroupRef<R>, handler: HostFunction) -> BridgeResult<()> {
        self.on(group, EventKind::Ping, handler)
    }

    /// Handler called with `(payload, userData)`.
    pub fn on_pong(&self, group: GroupRef<R>, handler: HostFunction) -> BridgeResult<()> {
        self.on(group, EventKind::Pong, handler)
    }

    /// Gracefully close every connection in the group.
    pub fn close_group(&self, group: GroupRef<R>) -> BridgeResult<()> {
        self.hub.groups.get(group.handle(), R::KIND)?;
        self.hub.engine.close_group(group.handle());
        debug!(group = %group.handle(), "Group closing");
        Ok(())
    }

    /// Immediately tear down every connection in the group.
    pub fn terminate_group(&self, group: GroupRef<R>) -> BridgeResult<()> {
        self.hub.groups.get(group.handle(), R::KIND)?;
        self.hub.engine.terminate_group(group.handle());
        debug!(group = %group.handle(), "Group terminated");
        Ok(())
    }

    /// Send `data` to every connection in the group. No completion is tracked.
    pub fn broadcast(
        &self,
        group: GroupRef<R>,
        data: &HostValue,
        binary: bool,
    ) -> BridgeResult<()> {
        self.hub.groups.get(group.handle(), R::KIND)?;
        let payload = codec::decode_input(data);
        self.hub
            .engine
            .broadcast(group.handle(), &payload, OpCode::from_binary_flag(binary));
        sends::record_broadcast(&self.hub.metrics);
        Ok(())
    }

    /// Queue `data` on a connection.
    ///
    /// With a callback, it runs once the payload is flushed, or is released
    /// unrun if the connection goes away first.
    pub fn send(
        &self,
        conn: ConnectionRef<R>,
        data: &HostValue,
        opcode: OpCode,
        callback: Option<HostFunction>,
    ) {
        let socket = conn.unwrap();
        let payload = codec::decode_input(data);
        sends::record_issued(&self.hub.metrics, callback.is_some());
        let completion = callback.map(|callback| {
            SendOperation::new(socket, callback, self.hub.metrics.clone()).into_completion()
        });
        self.hub.engine.send(socket, &payload, opcode, completion);
    }

    /// `send` for host arguments. A non-function callback means none.
    pub fn send_host(
        &self,
        conn: &HostValue,
        data: &HostValue,
        opcode: &HostValue,
        callback: &HostValue,
    ) -> BridgeResult<()> {
        let conn = ConnectionRef::<R>::from_host(conn)?;
        let opcode = opcode
            .as_number()
            .ok_or_else(|| BridgeError::validation("opcode must be a number"))?;
        let opcode = OpCode::try_from(opcode as i64)?;
        self.send(conn, data, opcode, callback.as_function().cloned());
        Ok(())
    }

    /// Start the closing handshake on a connection.
    pub fn close(&self, conn: ConnectionRef<R>, code: u16, reason: &HostValue) {
        let reason = codec::decode_input(reason);
        self.hub.engine.close(conn.unwrap(), code, &reason);
    }

    /// Tear a connection down immediately.
    pub fn terminate(&self, conn: ConnectionRef<R>) {
        self.hub.engine.terminate(conn.unwrap());
    }
}
