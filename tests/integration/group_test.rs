//! Group lifecycle and handler delivery.

use std::cell::RefCell;
use std::rc::Rc;

use wsbridge::wsbridge_core::error::ErrorKind;
use wsbridge::{ConnectionRef, EventKind, GroupRef, HostFunction, HostValue, OpCode, Server};

use crate::helpers::{self, Recorder};

#[test]
fn test_message_handler_receives_text_once() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let echo = Recorder::new();
    server.on_message(group, echo.function.clone()).unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_message(socket, b"ping", OpCode::Text);

    assert_eq!(echo.count(), 1);
    let args = echo.call(0);
    assert_eq!(args[0], HostValue::from("ping"));
    assert!(args[1].is_undefined());
}

#[test]
fn test_echo_handler_sends_back() {
    let hub = Rc::new(helpers::hub());
    let group = hub.server().create_group().unwrap();
    let last_socket: Rc<RefCell<Option<HostValue>>> = Rc::new(RefCell::new(None));

    let seen = last_socket.clone();
    hub.server()
        .on_connection(
            group,
            HostFunction::new(move |args| {
                *seen.borrow_mut() = Some(args[0].clone());
                Ok(HostValue::Undefined)
            }),
        )
        .unwrap();

    let weak = Rc::downgrade(&hub);
    let target = last_socket.clone();
    hub.server()
        .on_message(
            group,
            HostFunction::new(move |args| {
                let hub = weak.upgrade().expect("hub alive");
                let conn = target.borrow().clone().expect("connected");
                hub.server()
                    .send_host(&conn, &args[0], &HostValue::Number(1.0), &HostValue::Undefined)
                    .map_err(|e| wsbridge::HostException::new(e.to_string()))?;
                Ok(HostValue::Undefined)
            }),
        )
        .unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_message(socket, b"ping", OpCode::Text);

    let frames = hub.engine().sent_to(socket);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, b"ping");
    assert_eq!(frames[0].opcode, OpCode::Text);
    assert!(!frames[0].tracked);
}

#[test]
fn test_binary_message_is_array_buffer() {
    let hub = helpers::hub();
    let group = hub.client().create_group().unwrap();
    let handler = Recorder::new();
    hub.client().on_message(group, handler.function.clone()).unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_message(socket, &[0, 159, 146, 150], OpCode::Binary);

    match &handler.call(0)[0] {
        HostValue::ArrayBuffer(bytes) => assert_eq!(&bytes[..], &[0, 159, 146, 150]),
        other => panic!("expected ArrayBuffer, got {other:?}"),
    }
}

#[test]
fn test_replacing_handler_releases_previous() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let first = Recorder::new();
    let second = Recorder::new();

    server.on_ping(group, first.function.clone()).unwrap();
    assert_eq!(first.function.ref_count(), 2);

    server.on_ping(group, second.function.clone()).unwrap();
    assert_eq!(first.function.ref_count(), 1);

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_ping(socket, b"hb");
    assert_eq!(first.count(), 0);
    assert_eq!(second.count(), 1);
    assert_eq!(second.call(0)[0], HostValue::from("hb"));
    assert_eq!(hub.metrics().handler_releases, 1);
}

#[test]
fn test_delete_releases_five_slots() {
    let hub = helpers::hub();
    let server = hub.server();

    let empty = server.create_group().unwrap();
    assert_eq!(server.delete_group(empty).unwrap(), 5);

    let full = server.create_group().unwrap();
    let handler = Recorder::new();
    for kind in EventKind::ALL {
        server.on(full, kind, handler.function.clone()).unwrap();
    }
    // one reference per slot
    assert_eq!(handler.function.ref_count(), 6);

    assert_eq!(server.delete_group(full).unwrap(), 5);
    assert_eq!(handler.function.ref_count(), 1);
    assert!(!hub.engine().has_group(full.handle()));
    assert_eq!(hub.metrics().handler_releases, 10);
}

#[test]
fn test_deleted_group_is_invalid_handle() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    server.delete_group(group).unwrap();

    let err = server.delete_group(group).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidHandle);
    let err = server
        .on_message(group, Recorder::new().function)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidHandle);
    let err = server.broadcast(group, &HostValue::from("x"), false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidHandle);
}

#[test]
fn test_host_group_reference_checks_role() {
    let hub = helpers::hub();
    let client_group = hub.client().create_group().unwrap();

    let err = hub
        .server()
        .on_host(&client_group.to_host(), EventKind::Message, &Recorder::new().function.into())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RoleMismatch);

    let err = hub
        .client()
        .on_host(&client_group.to_host(), EventKind::Message, &HostValue::from("nope"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[test]
fn test_disconnection_arguments() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let handler = Recorder::new();
    server.on_disconnection(group, handler.function.clone()).unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.set_user_data(ConnectionRef::<Server>::wrap(socket), HostValue::from("alice"));
    hub.engine().disconnect(socket, 1001, b"going away");

    let args = handler.call(0);
    assert_eq!(args.len(), 4);
    assert_eq!(ConnectionRef::<Server>::from_host(&args[0]).unwrap().unwrap(), socket);
    assert_eq!(args[1], HostValue::Number(1001.0));
    assert_eq!(args[2], HostValue::from("going away"));
    assert_eq!(args[3], HostValue::from("alice"));
}

#[test]
fn test_raising_handler_is_contained() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    server.on_pong(group, helpers::raising("bad pong")).unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_pong(socket, b"");
    hub.engine().deliver_pong(socket, b"");

    let metrics = hub.metrics();
    assert_eq!(metrics.handler_invocations, 2);
    assert_eq!(metrics.host_exceptions, 2);
    assert!(hub.engine().is_open(socket));
}

#[test]
fn test_handler_replacing_itself_finishes_on_old_reference() {
    let hub = Rc::new(helpers::hub());
    let group: GroupRef<Server> = hub.server().create_group().unwrap();
    let later = Recorder::new();
    let ran = Rc::new(RefCell::new(0));

    let weak = Rc::downgrade(&hub);
    let replacement = later.function.clone();
    let counter = ran.clone();
    hub.server()
        .on_message(
            group,
            HostFunction::new(move |_| {
                let hub = weak.upgrade().expect("hub alive");
                hub.server()
                    .on_message(group, replacement.clone())
                    .map_err(|e| wsbridge::HostException::new(e.to_string()))?;
                *counter.borrow_mut() += 1;
                Ok(HostValue::Undefined)
            }),
        )
        .unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_message(socket, b"one", OpCode::Text);
    hub.engine().deliver_message(socket, b"two", OpCode::Text);

    assert_eq!(*ran.borrow(), 1);
    assert_eq!(later.count(), 1);
    assert_eq!(later.call(0)[0], HostValue::from("two"));
}

#[test]
fn test_pong_arguments_carry_payload_and_user_data() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let handler = Recorder::new();
    server.on_pong(group, handler.function.clone()).unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.engine().deliver_pong(socket, b"rtt-17");
    hub.set_user_data(ConnectionRef::<Server>::wrap(socket), HostValue::from("bob"));
    hub.engine().deliver_pong(socket, b"");

    assert_eq!(handler.count(), 2);
    let first = handler.call(0);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0], HostValue::from("rtt-17"));
    assert!(first[1].is_undefined());
    let second = handler.call(1);
    assert_eq!(second[0], HostValue::from(""));
    assert_eq!(second[1], HostValue::from("bob"));
}

#[test]
fn test_terminate_inside_disconnection_handler_runs_once() {
    let hub = Rc::new(helpers::hub());
    let group = hub.server().create_group().unwrap();
    let ran = Rc::new(RefCell::new(0));

    let weak = Rc::downgrade(&hub);
    let counter = ran.clone();
    hub.server()
        .on_disconnection(
            group,
            HostFunction::new(move |args| {
                *counter.borrow_mut() += 1;
                let hub = weak.upgrade().expect("hub alive");
                let conn = ConnectionRef::<Server>::from_host(&args[0])
                    .map_err(|e| wsbridge::HostException::new(e.to_string()))?;
                assert_eq!(hub.get_user_data(conn), HostValue::from("carol"));
                hub.server().terminate(conn);
                hub.server().close(conn, 1000, &HostValue::from("again"));
                Ok(HostValue::Undefined)
            }),
        )
        .unwrap();

    let socket = hub.engine().accept(group.handle());
    hub.set_user_data(ConnectionRef::<Server>::wrap(socket), HostValue::from("carol"));
    hub.engine().disconnect(socket, 1000, b"");

    assert_eq!(*ran.borrow(), 1);
    assert!(hub.engine().teardowns().is_empty());
    assert!(!hub.engine().is_open(socket));
    assert_eq!(hub.metrics().handler_invocations, 1);
    assert_eq!(hub.metrics().host_exceptions, 0);
}
