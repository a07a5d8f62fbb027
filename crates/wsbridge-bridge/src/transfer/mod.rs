//! Socket transfer: tickets, their sources, TLS sessions and the handoff
//! queue between acceptor contexts and the loop.

pub mod handoff;
pub mod socket;
pub mod ticket;
pub mod tls;

pub use handoff::{Handoff, TicketInbox, TicketSender, channel};
pub use socket::{INVALID_FD, NativeHandle, SocketSource};
pub use ticket::{Ticket, TicketCell, UpgradeOutcome};
pub use tls::TlsSession;
