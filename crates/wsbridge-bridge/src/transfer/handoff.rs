//! Ticket handoff between acceptor contexts and the loop thread.
//!
//! Acceptors create tickets wherever they accept sockets and push them
//! through a [`TicketSender`]. The loop thread owns the [`TicketInbox`] and
//! redeems what arrives. Dropping either end, or anything still queued,
//! discards the affected tickets.

use std::os::fd::RawFd;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::{Server, TicketId};

use crate::engine::Engine;
use crate::group::GroupRef;
use crate::hub::Hub;
use crate::metrics::BridgeMetrics;

use super::socket::SocketSource;
use super::ticket::{Ticket, UpgradeOutcome};
use super::tls::TlsSession;

/// A ticket plus the handshake parameters needed to redeem it.
#[derive(Debug)]
pub struct Handoff {
    /// The ticket in transit.
    pub ticket: Ticket,
    /// Client `Sec-WebSocket-Key`.
    pub sec_key: String,
    /// Negotiated `Sec-WebSocket-Extensions`, possibly empty.
    pub extensions: String,
}

impl Handoff {
    /// Bundle a ticket with its handshake parameters.
    pub fn new(ticket: Ticket, sec_key: impl Into<String>, extensions: impl Into<String>) -> Self {
        Self {
            ticket,
            sec_key: sec_key.into(),
            extensions: extensions.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum SenderInner {
    Bounded(mpsc::Sender<Handoff>),
    Unbounded(mpsc::UnboundedSender<Handoff>),
}

/// Sending half, cloneable and usable from any thread.
#[derive(Debug, Clone)]
pub struct TicketSender {
    inner: SenderInner,
    metrics: Arc<BridgeMetrics>,
}

#[derive(Debug)]
enum InboxInner {
    Bounded(mpsc::Receiver<Handoff>),
    Unbounded(mpsc::UnboundedReceiver<Handoff>),
}

/// Receiving half, owned by the loop thread.
#[derive(Debug)]
pub struct TicketInbox {
    inner: InboxInner,
}

/// Create a handoff queue. `None` means unbounded.
///
/// Tickets created through the sender record into `metrics`.
pub fn channel(
    capacity: Option<usize>,
    metrics: Arc<BridgeMetrics>,
) -> (TicketSender, TicketInbox) {
    match capacity {
        Some(cap) => {
            let (tx, rx) = mpsc::channel(cap.max(1));
            (
                TicketSender {
                    inner: SenderInner::Bounded(tx),
                    metrics,
                },
                TicketInbox {
                    inner: InboxInner::Bounded(rx),
                },
            )
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                TicketSender {
                    inner: SenderInner::Unbounded(tx),
                    metrics,
                },
                TicketInbox {
                    inner: InboxInner::Unbounded(rx),
                },
            )
        }
    }
}

impl TicketSender {
    /// Create a ticket for an accepted descriptor and queue it.
    ///
    /// The caller keeps its own descriptor; the ticket holds a duplicate.
    pub fn transfer(
        &self,
        fd: RawFd,
        tls: Option<TlsSession>,
        sec_key: impl Into<String>,
        extensions: impl Into<String>,
    ) -> BridgeResult<TicketId> {
        let ticket = Ticket::create(&SocketSource::Raw(fd), tls, self.metrics.clone());
        let id = ticket.id();
        self.send(Handoff::new(ticket, sec_key, extensions))?;
        Ok(id)
    }

    /// Queue a handoff without waiting.
    ///
    /// Fails if the inbox is gone or a bounded queue is full; the rejected
    /// ticket is discarded.
    pub fn send(&self, handoff: Handoff) -> BridgeResult<()> {
        let ticket_id = handoff.ticket.id();
        let result = match &self.inner {
            SenderInner::Bounded(tx) => tx.try_send(handoff).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    BridgeError::lifecycle("ticket handoff queue is full")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    BridgeError::lifecycle("ticket inbox closed")
                }
            }),
            SenderInner::Unbounded(tx) => tx
                .send(handoff)
                .map_err(|_| BridgeError::lifecycle("ticket inbox closed")),
        };
        if let Err(ref e) = result {
            warn!(ticket_id = %ticket_id, error = %e, "Ticket handoff rejected");
        }
        result
    }

    /// Queue a handoff, waiting for room on a bounded queue.
    pub async fn send_async(&self, handoff: Handoff) -> BridgeResult<()> {
        let ticket_id = handoff.ticket.id();
        let result = match &self.inner {
            SenderInner::Bounded(tx) => tx
                .send(handoff)
                .await
                .map_err(|_| BridgeError::lifecycle("ticket inbox closed")),
            SenderInner::Unbounded(tx) => tx
                .send(handoff)
                .map_err(|_| BridgeError::lifecycle("ticket inbox closed")),
        };
        if let Err(ref e) = result {
            warn!(ticket_id = %ticket_id, error = %e, "Ticket handoff rejected");
        }
        result
    }

    /// Returns true once the inbox has been dropped.
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.is_closed(),
            SenderInner::Unbounded(tx) => tx.is_closed(),
        }
    }
}

impl TicketInbox {
    /// Wait for the next handoff. `None` once every sender is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<Handoff> {
        match &mut self.inner {
            InboxInner::Bounded(rx) => rx.recv().await,
            InboxInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Take the next handoff if one is queued.
    pub fn try_recv(&mut self) -> Option<Handoff> {
        match &mut self.inner {
            InboxInner::Bounded(rx) => rx.try_recv().ok(),
            InboxInner::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Number of queued handoffs.
    pub fn len(&self) -> usize {
        match &self.inner {
            InboxInner::Bounded(rx) => rx.len(),
            InboxInner::Unbounded(rx) => rx.len(),
        }
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Redeem every queued ticket into `group`.
    ///
    /// Stops at the first hub error; tickets after it stay queued.
    pub fn drain_into<E: Engine + 'static>(
        &mut self,
        hub: &Hub<E>,
        group: GroupRef<Server>,
    ) -> BridgeResult<Vec<(TicketId, UpgradeOutcome)>> {
        let mut outcomes = Vec::new();
        while let Some(handoff) = self.try_recv() {
            let id = handoff.ticket.id();
            let outcome = hub.upgrade(
                group,
                handoff.ticket,
                handoff.sec_key.as_bytes(),
                handoff.extensions.as_bytes(),
            )?;
            outcomes.push((id, outcome));
        }
        debug!(group = %group.handle(), drained = outcomes.len(), "Ticket inbox drained");
        Ok(outcomes)
    }
}
