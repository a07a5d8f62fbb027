//! Delivery of engine events to host handlers.
//!
//! Each registration installs a closure on the engine that reads the group's
//! handler slot at delivery time. The handler is cloned out of the slot
//! before it runs, so a handler that replaces itself, or deletes its group,
//! keeps running to completion on the reference it started with.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{trace, warn};

use wsbridge_core::types::{GroupHandle, OpCode, RoleKind, SocketHandle};

use crate::connection::user_data;
use crate::engine::{Engine, FrameHandler};
use crate::host::{External, HostValue};
use crate::message::codec;
use crate::metrics::{BridgeMetrics, groups};

use super::handlers::{EventKind, HandlerSlot};

/// Install the engine closure that forwards `kind` events on `group` to the
/// handler in `slot`.
pub(crate) fn install<E: Engine + 'static>(
    engine: &Rc<E>,
    group: GroupHandle,
    role: RoleKind,
    kind: EventKind,
    slot: HandlerSlot,
    metrics: Arc<BridgeMetrics>,
) {
    let target = Delivery {
        engine: Rc::downgrade(engine),
        role,
        kind,
        slot,
        metrics,
    };

    match kind {
        EventKind::Connection => engine.on_connection(
            group,
            Rc::new(move |socket: SocketHandle| {
                target.invoke(&[connection_value(socket, target.role)]);
            }),
        ),
        EventKind::Message => engine.on_message(
            group,
            Rc::new(move |socket: SocketHandle, payload: &[u8], opcode: OpCode| {
                let user = target.user_data(socket);
                target.invoke(&[codec::encode_output(payload, opcode), user]);
            }),
        ),
        EventKind::Ping | EventKind::Pong => {
            let opcode = if kind == EventKind::Ping {
                OpCode::Ping
            } else {
                OpCode::Pong
            };
            let handler: FrameHandler = Rc::new(move |socket: SocketHandle, payload: &[u8]| {
                let user = target.user_data(socket);
                target.invoke(&[codec::encode_output(payload, opcode), user]);
            });
            if kind == EventKind::Ping {
                engine.on_ping(group, handler);
            } else {
                engine.on_pong(group, handler);
            }
        }
        EventKind::Disconnection => engine.on_disconnection(
            group,
            Rc::new(move |socket: SocketHandle, code: u16, reason: &[u8]| {
                let user = target.user_data(socket);
                target.invoke(&[
                    connection_value(socket, target.role),
                    HostValue::Number(f64::from(code)),
                    codec::encode_output(reason, OpCode::Close),
                    user,
                ]);
            }),
        ),
    }
}

fn connection_value(socket: SocketHandle, role: RoleKind) -> HostValue {
    HostValue::External(External::Connection { socket, role })
}

struct Delivery<E> {
    engine: Weak<E>,
    role: RoleKind,
    kind: EventKind,
    slot: HandlerSlot,
    metrics: Arc<BridgeMetrics>,
}

impl<E: Engine> Delivery<E> {
    fn user_data(&self, socket: SocketHandle) -> HostValue {
        match self.engine.upgrade() {
            Some(engine) => user_data::get(engine.as_ref(), socket),
            None => HostValue::Undefined,
        }
    }

    fn invoke(&self, args: &[HostValue]) {
        let Some(handler) = self.slot.borrow().cloned() else {
            trace!(event = %self.kind, "No handler installed");
            return;
        };
        let result = handler.call(args);
        groups::record_invocation(&self.metrics, result.is_err());
        if let Err(e) = result {
            warn!(event = %self.kind, role = %self.role, error = %e, "Host handler raised");
        }
    }
}
