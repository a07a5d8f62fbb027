//! The hub: one engine instance and the bridge state around it.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info};

use wsbridge_core::config::BridgeConfig;
use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{Address, Client, Role, Server};

use crate::connection::{ConnectionRef, UserDataSlot, user_data};
use crate::engine::Engine;
use crate::group::{GroupRef, GroupRegistry};
use crate::host::HostValue;
use crate::message::codec;
use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::namespace::Namespace;
use crate::transfer::{
    SocketSource, Ticket, TicketCell, TicketInbox, TicketSender, TlsSession, UpgradeOutcome,
    handoff,
};

/// Bridge entry point.
///
/// Owns the engine and every group created through it. All calls happen on
/// the engine's event-delivery thread; only tickets and the handoff sender
/// leave it.
pub struct Hub<E: Engine> {
    pub(crate) engine: Rc<E>,
    pub(crate) groups: GroupRegistry,
    pub(crate) metrics: Arc<BridgeMetrics>,
    config: BridgeConfig,
    shut_down: Cell<bool>,
}

impl<E: Engine> std::fmt::Debug for Hub<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("groups", &self.groups.len())
            .field("shut_down", &self.shut_down.get())
            .finish()
    }
}

impl<E: Engine + 'static> Hub<E> {
    /// Initialise the bridge over `engine`.
    pub fn new(engine: E, config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        info!(
            connect_timeout_ms = config.connect_timeout_ms,
            handoff_capacity = ?config.transfer.handoff_capacity,
            "Bridge hub initialized"
        );
        Ok(Self {
            engine: Rc::new(engine),
            groups: GroupRegistry::new(),
            metrics: Arc::new(BridgeMetrics::new()),
            config,
            shut_down: Cell::new(false),
        })
    }

    /// Operations on server-accepting groups and connections.
    pub fn server(&self) -> Namespace<'_, Server, E> {
        Namespace::new(self)
    }

    /// Operations on client-initiating groups and connections.
    pub fn client(&self) -> Namespace<'_, Client, E> {
        Namespace::new(self)
    }

    /// The engine.
    pub fn engine(&self) -> &Rc<E> {
        &self.engine
    }

    /// Active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Snapshot of bridge metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn ensure_running(&self) -> BridgeResult<()> {
        if self.shut_down.get() {
            return Err(BridgeError::lifecycle("hub has been shut down"));
        }
        Ok(())
    }

    /// Attach `value` to a connection, releasing any previous value.
    pub fn set_user_data<R: Role>(&self, conn: ConnectionRef<R>, value: HostValue) {
        user_data::set(self.engine.as_ref(), conn.unwrap(), value);
    }

    /// The value attached to a connection, or `Undefined`.
    pub fn get_user_data<R: Role>(&self, conn: ConnectionRef<R>) -> HostValue {
        user_data::get(self.engine.as_ref(), conn.unwrap())
    }

    /// Release and detach a connection's value. A no-op returning false when
    /// nothing is attached.
    pub fn clear_user_data<R: Role>(&self, conn: ConnectionRef<R>) -> bool {
        user_data::clear(self.engine.as_ref(), conn.unwrap())
    }

    /// Remote endpoint of a connection.
    pub fn get_address<R: Role>(&self, conn: ConnectionRef<R>) -> Address {
        self.engine.address(conn.unwrap())
    }

    /// Package a socket, and optionally a TLS session, into a ticket.
    pub fn transfer(&self, source: &SocketSource, tls: Option<TlsSession>) -> Ticket {
        Ticket::create(source, tls, self.metrics.clone())
    }

    /// `transfer` for host arguments: a descriptor number or socket handle,
    /// and an optional TLS session.
    pub fn transfer_host(&self, source: &HostValue, tls: &HostValue) -> BridgeResult<HostValue> {
        let source = SocketSource::from_host(source)?;
        let ticket = self.transfer(&source, TlsSession::from_host(tls));
        Ok(TicketCell::new(ticket).to_host())
    }

    /// Redeem a ticket into a WebSocket connection on a server group.
    ///
    /// A ticket without a valid descriptor is discarded and the engine is not
    /// called. An unknown group is an error; the ticket is discarded then too.
    pub fn upgrade(
        &self,
        group: GroupRef<Server>,
        ticket: Ticket,
        sec_key: &[u8],
        extensions: &[u8],
    ) -> BridgeResult<UpgradeOutcome> {
        self.ensure_running()?;
        self.groups.get(group.handle(), Server::KIND)?;

        let ticket_id = ticket.id();
        match ticket.redeem() {
            Some((fd, tls)) => {
                self.engine.upgrade(fd, sec_key, tls, extensions, group.handle());
                debug!(
                    ticket_id = %ticket_id,
                    group = %group.handle(),
                    "Upgrade delegated to engine"
                );
                Ok(UpgradeOutcome::Redeemed)
            }
            None => Ok(UpgradeOutcome::Discarded),
        }
    }

    /// `upgrade` for host arguments.
    pub fn upgrade_host(
        &self,
        group: &HostValue,
        ticket: &HostValue,
        sec_key: &HostValue,
        extensions: &HostValue,
    ) -> BridgeResult<UpgradeOutcome> {
        let group = GroupRef::<Server>::from_host(group)?;
        let ticket = TicketCell::from_host(ticket)?.take()?;
        self.upgrade(
            group,
            ticket,
            &codec::decode_input(sec_key),
            &codec::decode_input(extensions),
        )
    }

    /// Open an outbound connection on a client group.
    ///
    /// `user_data` becomes the new connection's attached value and the
    /// configured connect timeout applies.
    pub fn connect(
        &self,
        group: GroupRef<Client>,
        uri: &str,
        user_data: HostValue,
    ) -> BridgeResult<()> {
        self.ensure_running()?;
        self.groups.get(group.handle(), Client::KIND)?;
        let timeout = self.config.connect_timeout();
        debug!(group = %group.handle(), uri, timeout_ms = timeout.as_millis() as u64, "Connecting");
        self.engine.connect(
            uri,
            Some(UserDataSlot::attach(user_data)),
            timeout,
            group.handle(),
        );
        Ok(())
    }

    /// `connect` for host arguments.
    pub fn connect_host(
        &self,
        group: &HostValue,
        uri: &HostValue,
        user_data: &HostValue,
    ) -> BridgeResult<()> {
        let group = GroupRef::<Client>::from_host(group)?;
        let uri = codec::decode_text(&codec::decode_input(uri));
        self.connect(group, &uri, user_data.clone())
    }

    /// A ticket queue for acceptor threads, sized from configuration.
    pub fn handoff_channel(&self) -> (TicketSender, TicketInbox) {
        handoff::channel(self.config.transfer.handoff_capacity, self.metrics.clone())
    }

    /// Stop accepting new work. Fails while any group is still alive.
    pub fn shutdown(&self) -> BridgeResult<()> {
        if !self.groups.is_empty() {
            return Err(BridgeError::lifecycle(format!(
                "{} group(s) still alive",
                self.groups.len()
            )));
        }
        if !self.shut_down.replace(true) {
            let snapshot = self.metrics.snapshot();
            info!(
                groups_created = snapshot.groups_created,
                tickets_in_flight = snapshot.tickets_in_flight(),
                sends_pending = snapshot.sends_pending(),
                "Bridge hub shut down"
            );
        }
        Ok(())
    }
}
