//! Socket transfer and upgrade.

use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::rc::Rc;

use wsbridge::wsbridge_bridge::host::External;
use wsbridge::wsbridge_bridge::transfer::{INVALID_FD, NativeHandle, SocketSource};
use wsbridge::wsbridge_core::error::ErrorKind;
use wsbridge::{HostValue, TicketCell, TlsSession, UpgradeOutcome};

use crate::helpers::{self, Recorder};

fn loopback_pair() -> (TcpListener, TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (accepted, _) = listener.accept().unwrap();
    (listener, client, accepted)
}

struct ClosedHandle;

impl NativeHandle for ClosedHandle {
    fn raw_fd(&self) -> Option<std::os::fd::RawFd> {
        None
    }
}

#[test]
fn test_valid_descriptor_upgrades_once() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    let connected = Recorder::new();
    server.on_connection(group, connected.function.clone()).unwrap();
    let (_listener, _client, accepted) = loopback_pair();

    let ticket = hub.transfer(&SocketSource::Raw(accepted.as_raw_fd()), None);
    assert!(ticket.is_valid());
    let outcome = hub.upgrade(group, ticket, b"key123", b"").unwrap();
    assert_eq!(outcome, UpgradeOutcome::Redeemed);

    let upgrades = hub.engine().take_upgrades();
    assert_eq!(upgrades.len(), 1);
    let record = &upgrades[0];
    assert_ne!(record.fd.as_raw_fd(), accepted.as_raw_fd());
    assert_eq!(record.sec_key, b"key123");
    assert!(record.tls.is_none());
    assert!(record.extensions.is_empty());
    assert_eq!(record.group, group.handle());
    assert_eq!(connected.count(), 1);

    let metrics = hub.metrics();
    assert_eq!(metrics.tickets_redeemed, 1);
    assert_eq!(metrics.tickets_discarded, 0);
}

#[test]
fn test_invalid_descriptor_discards_and_releases_tls() {
    let hub = helpers::hub();
    let group = hub.server().create_group().unwrap();
    let session = TlsSession::new("established");

    let ticket = hub.transfer(&SocketSource::Raw(INVALID_FD), Some(session.clone()));
    assert_eq!(session.ref_count(), 2);

    let outcome = hub.upgrade(group, ticket, b"key123", b"").unwrap();
    assert_eq!(outcome, UpgradeOutcome::Discarded);
    assert_eq!(hub.engine().upgrade_count(), 0);
    assert_eq!(session.ref_count(), 1);
    assert_eq!(hub.metrics().tickets_discarded, 1);
}

#[test]
fn test_tls_session_moves_to_engine_on_redeem() {
    let hub = helpers::hub();
    let group = hub.server().create_group().unwrap();
    let (_listener, _client, accepted) = loopback_pair();
    let session = TlsSession::new(42u32);

    let ticket = hub.transfer(&SocketSource::Raw(accepted.as_raw_fd()), Some(session.clone()));
    assert_eq!(session.ref_count(), 2);
    hub.upgrade(group, ticket, b"k", b"permessage-deflate").unwrap();
    assert_eq!(session.ref_count(), 2);

    let upgrades = hub.engine().take_upgrades();
    assert!(upgrades[0].tls.as_ref().unwrap().ptr_eq(&session));
    assert_eq!(upgrades[0].extensions, b"permessage-deflate");
    drop(upgrades);
    assert_eq!(session.ref_count(), 1);
}

#[test]
fn test_host_ticket_is_consumed_once() {
    let hub = helpers::hub();
    let group = hub.server().create_group().unwrap();
    let (_listener, _client, accepted) = loopback_pair();
    let handle: Rc<dyn NativeHandle> = Rc::new(accepted);

    let ticket = hub
        .transfer_host(&HostValue::External(External::Native(handle)), &HostValue::Undefined)
        .unwrap();
    let key = HostValue::from("dGhlIHNhbXBsZSBub25jZQ==");

    let outcome = hub
        .upgrade_host(&group.to_host(), &ticket, &key, &HostValue::Undefined)
        .unwrap();
    assert_eq!(outcome, UpgradeOutcome::Redeemed);
    assert!(TicketCell::from_host(&ticket).unwrap().is_consumed());

    let err = hub
        .upgrade_host(&group.to_host(), &ticket, &key, &HostValue::Undefined)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidHandle);
    assert_eq!(hub.engine().upgrade_count(), 1);
}

#[test]
fn test_closed_native_handle_yields_discarded_ticket() {
    let hub = helpers::hub();
    let group = hub.server().create_group().unwrap();
    let session = TlsSession::new(());
    let ticket = hub
        .transfer_host(
            &HostValue::External(External::Native(Rc::new(ClosedHandle))),
            &session.to_host(),
        )
        .unwrap();
    assert_eq!(session.ref_count(), 2);

    let outcome = hub
        .upgrade_host(&group.to_host(), &ticket, &HostValue::from("k"), &HostValue::from(""))
        .unwrap();
    assert_eq!(outcome, UpgradeOutcome::Discarded);
    assert_eq!(session.ref_count(), 1);
}

#[test]
fn test_upgrade_into_deleted_group_fails_and_discards() {
    let hub = helpers::hub();
    let server = hub.server();
    let group = server.create_group().unwrap();
    server.delete_group(group).unwrap();
    let (_listener, _client, accepted) = loopback_pair();
    let session = TlsSession::new(());

    let ticket = hub.transfer(&SocketSource::Raw(accepted.as_raw_fd()), Some(session.clone()));
    let err = hub.upgrade(group, ticket, b"k", b"").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidHandle);
    assert_eq!(session.ref_count(), 1);
    assert_eq!(hub.engine().upgrade_count(), 0);
    assert_eq!(hub.metrics().tickets_discarded, 1);
}

#[test]
fn test_client_group_reference_rejected_for_upgrade() {
    let hub = helpers::hub();
    let client_group = hub.client().create_group().unwrap();
    let ticket = hub
        .transfer_host(&HostValue::Number(-1.0), &HostValue::Null)
        .unwrap();

    let err = hub
        .upgrade_host(
            &client_group.to_host(),
            &ticket,
            &HostValue::from("k"),
            &HostValue::Undefined,
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RoleMismatch);
    // the ticket was never taken
    assert!(!TicketCell::from_host(&ticket).unwrap().is_consumed());
}
