//! Group-wide operations.

use wsbridge::{HostValue, OpCode};

use crate::helpers::{self, Recorder};

#[test]
fn test_binary_broadcast_reaches_every_member() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let sockets: Vec<_> = (0..3).map(|_| hub.engine().accept(group.handle())).collect();

    let payload = HostValue::ArrayBuffer(bytes::Bytes::from_static(&[1, 2, 3, 4, 5]));
    server.broadcast(group, &payload, true).unwrap();

    for socket in &sockets {
        let frames = hub.engine().sent_to(*socket);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, vec![1, 2, 3, 4, 5]);
        assert_eq!(frames[0].opcode, OpCode::Binary);
        assert!(!frames[0].tracked);
        assert_eq!(hub.engine().pending_sends(*socket), 0);
    }

    let broadcasts = hub.engine().broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].recipients, sockets);
    assert_eq!(hub.metrics().broadcasts, 1);
    assert_eq!(hub.metrics().sends_tracked, 0);
}

#[test]
fn test_text_broadcast_from_string() {
    let hub = helpers::hub();
    let client = hub.client();
    let group = client.create_group().unwrap();
    hub.engine().accept(group.handle());

    client.broadcast(group, &HostValue::from("hello"), false).unwrap();
    let broadcasts = hub.engine().broadcasts();
    let record = &broadcasts[0];
    assert_eq!(record.opcode, OpCode::Text);
    assert_eq!(record.payload, b"hello");
}

#[test]
fn test_close_group_disconnects_members() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let gone = Recorder::new();
    server.on_disconnection(group, gone.function.clone()).unwrap();
    for _ in 0..2 {
        hub.engine().accept(group.handle());
    }

    server.close_group(group).unwrap();
    assert_eq!(hub.engine().group_closes(), vec![group.handle()]);
    assert_eq!(gone.count(), 2);
    assert_eq!(gone.call(0)[1], HostValue::Number(1000.0));
    assert!(hub.engine().members(group.handle()).is_empty());
}

#[test]
fn test_terminate_group_disconnects_members() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let gone = Recorder::new();
    server.on_disconnection(group, gone.function.clone()).unwrap();
    let socket = hub.engine().accept(group.handle());

    server.terminate_group(group).unwrap();
    assert_eq!(hub.engine().group_terminations(), vec![group.handle()]);
    assert_eq!(gone.call(0)[1], HostValue::Number(1006.0));
    assert!(!hub.engine().is_open(socket));
}
