//! Send completion and connection teardown.

use std::cell::Cell;
use std::rc::Rc;

use wsbridge::wsbridge_bridge::engine::mock::Teardown;
use wsbridge::wsbridge_core::error::ErrorKind;
use wsbridge::{ConnectionRef, HostFunction, HostValue, OpCode, Server};

use crate::helpers;

fn counting() -> (HostFunction, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let function = HostFunction::new(move |_| {
        seen.set(seen.get() + 1);
        Ok(HostValue::Undefined)
    });
    (function, calls)
}

#[test]
fn test_callback_runs_once_after_flush() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let socket = hub.engine().accept(group.handle());
    let (callback, calls) = counting();

    server.send(
        ConnectionRef::wrap(socket),
        &HostValue::from("payload"),
        OpCode::Text,
        Some(callback.clone()),
    );
    assert_eq!(calls.get(), 0);
    assert_eq!(callback.ref_count(), 2);

    assert_eq!(hub.engine().flush(socket), 1);
    assert_eq!(hub.engine().flush(socket), 0);
    assert_eq!(calls.get(), 1);
    assert_eq!(callback.ref_count(), 1);

    let metrics = hub.metrics();
    assert_eq!(metrics.sends_completed, 1);
    assert_eq!(metrics.sends_pending(), 0);
}

#[test]
fn test_disconnect_before_flush_releases_without_calling() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let socket = hub.engine().accept(group.handle());
    let (callback, calls) = counting();

    server.send(
        ConnectionRef::wrap(socket),
        &HostValue::from("late"),
        OpCode::Text,
        Some(callback.clone()),
    );
    hub.engine().disconnect(socket, 1006, b"");

    assert_eq!(calls.get(), 0);
    assert_eq!(callback.ref_count(), 1);
    assert_eq!(hub.metrics().sends_cancelled, 1);
}

#[test]
fn test_send_without_callback_is_untracked() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let socket = hub.engine().accept(group.handle());

    server.send(ConnectionRef::wrap(socket), &HostValue::Undefined, OpCode::Binary, None);

    assert_eq!(hub.engine().pending_sends(socket), 0);
    let frames = hub.engine().sent_to(socket);
    assert!(frames[0].payload.is_empty());
    assert!(!frames[0].tracked);
    let metrics = hub.metrics();
    assert_eq!(metrics.sends_issued, 1);
    assert_eq!(metrics.sends_tracked, 0);
}

#[test]
fn test_send_host_validates_opcode_and_ignores_non_function_callback() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let conn = ConnectionRef::<Server>::wrap(hub.engine().accept(group.handle())).to_host();

    let err = server
        .send_host(&conn, &HostValue::from("x"), &HostValue::Number(3.0), &HostValue::Null)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    server
        .send_host(&conn, &HostValue::from("x"), &HostValue::Number(2.0), &HostValue::from("cb"))
        .unwrap();
    assert_eq!(hub.metrics().sends_tracked, 0);
}

#[test]
fn test_close_and_terminate_delegate() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let closed = hub.engine().accept(group.handle());
    let killed = hub.engine().accept(group.handle());

    server.close(ConnectionRef::wrap(closed), 4000, &HostValue::from("bye"));
    server.terminate(ConnectionRef::wrap(killed));

    assert_eq!(
        hub.engine().teardowns(),
        vec![
            (
                closed,
                Teardown::Closed {
                    code: 4000,
                    reason: b"bye".to_vec()
                }
            ),
            (killed, Teardown::Terminated),
        ]
    );
    assert!(!hub.engine().is_open(closed));
    assert!(!hub.engine().is_open(killed));
}
