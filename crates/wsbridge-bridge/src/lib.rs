//! # wsbridge-bridge
//!
//! Boundary layer between an event-driven WebSocket engine and a
//! garbage-collected host runtime. Provides:
//!
//! - Connection groups with replaceable per-event host handlers
//! - Stable opaque connection references and per-connection user data
//! - Payload conversion between host values and engine byte spans
//! - Send-completion tracking with exactly-once callback disposal
//! - Socket transfer tickets redeemed into engine upgrades
//! - An in-memory engine for tests (feature `mock`)

pub mod connection;
pub mod engine;
pub mod group;
pub mod host;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod namespace;
pub mod send;
pub mod transfer;

pub use connection::ConnectionRef;
pub use engine::{Engine, SendOutcome};
pub use group::{EventKind, GroupRef};
pub use host::{HostException, HostFunction, HostValue};
pub use hub::Hub;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use namespace::Namespace;
pub use transfer::{Ticket, TicketCell, TicketInbox, TicketSender, TlsSession, UpgradeOutcome};

#[cfg(feature = "mock")]
pub use engine::mock::MockEngine;
