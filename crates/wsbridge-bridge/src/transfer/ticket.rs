//! Transfer tickets.
//!
//! A ticket owns a duplicated descriptor and, optionally, one reference to a
//! TLS session. It reaches exactly one terminal state: redeemed (both handed
//! to the engine) or discarded (both released here). Discard happens on
//! `Drop`, so a ticket lost in a queue or abandoned by the host still
//! releases what it owns.

use std::cell::RefCell;
use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use wsbridge_core::error::BridgeError;
use wsbridge_core::result::BridgeResult;
use wsbridge_core::types::TicketId;

use crate::host::{External, HostValue};
use crate::metrics::{BridgeMetrics, tickets};

use super::socket::{self, SocketSource};
use super::tls::TlsSession;

/// Terminal state a ticket reached on `upgrade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The descriptor was handed to the engine.
    Redeemed,
    /// The descriptor was invalid; the ticket released its resources.
    Discarded,
}

/// A socket, and optional TLS session, in transit to the engine.
pub struct Ticket {
    id: TicketId,
    fd: Option<OwnedFd>,
    tls: Option<TlsSession>,
    metrics: Arc<BridgeMetrics>,
    redeemed: bool,
}

impl Ticket {
    /// Duplicate the source's descriptor and take a reference to `tls`.
    ///
    /// A source that does not name an open descriptor still yields a ticket;
    /// it will be discarded on upgrade.
    pub fn create(
        source: &SocketSource,
        tls: Option<TlsSession>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        let id = TicketId::new();
        let fd = match socket::duplicate(source.raw_fd()) {
            Ok(fd) => Some(fd),
            Err(e) => {
                debug!(
                    ticket_id = %id,
                    source_fd = source.raw_fd(),
                    error = %e,
                    "Descriptor not duplicated"
                );
                None
            }
        };
        tickets::record_created(&metrics);

        debug!(
            ticket_id = %id,
            source_fd = source.raw_fd(),
            fd = ?fd.as_ref().map(|fd| fd.as_raw_fd()),
            tls = tls.is_some(),
            "Ticket created"
        );

        Self {
            id,
            fd,
            tls,
            metrics,
            redeemed: false,
        }
    }

    /// Ticket ID.
    pub fn id(&self) -> TicketId {
        self.id
    }

    /// Returns true if the ticket holds an open descriptor.
    pub fn is_valid(&self) -> bool {
        self.fd.is_some()
    }

    /// The held descriptor, if any.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// The held TLS session, if any.
    pub fn tls(&self) -> Option<&TlsSession> {
        self.tls.as_ref()
    }

    /// Consume the ticket for an upgrade.
    ///
    /// Returns the descriptor and TLS session to hand to the engine, or
    /// `None` when the descriptor is invalid, in which case the ticket has
    /// been discarded.
    pub(crate) fn redeem(mut self) -> Option<(OwnedFd, Option<TlsSession>)> {
        let fd = self.fd.take()?;
        let tls = self.tls.take();
        self.redeemed = true;
        tickets::record_redeemed(&self.metrics);
        info!(ticket_id = %self.id, fd = fd.as_raw_fd(), tls = tls.is_some(), "Ticket redeemed");
        Some((fd, tls))
    }

    /// Release the descriptor and TLS session without upgrading.
    pub fn discard(self) {
        drop(self);
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.redeemed {
            return;
        }
        tickets::record_discarded(&self.metrics);
        if self.fd.is_some() {
            debug!(ticket_id = %self.id, tls = self.tls.is_some(), "Ticket discarded");
        } else {
            warn!(
                ticket_id = %self.id,
                tls = self.tls.is_some(),
                "Ticket discarded: descriptor invalid"
            );
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("id", &self.id)
            .field("fd", &self.raw_fd())
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

/// Host-visible holder of a ticket.
///
/// The host may keep the reference after the upgrade; the cell is empty from
/// then on and a second upgrade is rejected.
#[derive(Clone)]
pub struct TicketCell {
    inner: Rc<RefCell<Option<Ticket>>>,
}

impl TicketCell {
    /// Wrap a fresh ticket.
    pub fn new(ticket: Ticket) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(ticket))),
        }
    }

    /// Take the ticket out, failing if it was already consumed.
    pub fn take(&self) -> BridgeResult<Ticket> {
        self.inner
            .borrow_mut()
            .take()
            .ok_or_else(|| BridgeError::invalid_handle("ticket already consumed"))
    }

    /// Returns true once the ticket has been taken.
    pub fn is_consumed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    /// Returns true if both cells hold the same ticket.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Expose the cell to the host.
    pub fn to_host(&self) -> HostValue {
        HostValue::External(External::Ticket(self.clone()))
    }

    /// Find the ticket cell behind a host value.
    pub fn from_host(value: &HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::External(External::Ticket(cell)) => Ok(cell.clone()),
            other => Err(BridgeError::validation(format!(
                "expected a ticket, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Debug for TicketCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(slot) => match slot.as_ref() {
                Some(ticket) => write!(f, "TicketCell({ticket:?})"),
                None => write!(f, "TicketCell(consumed)"),
            },
            Err(_) => write!(f, "TicketCell(<borrowed>)"),
        }
    }
}
