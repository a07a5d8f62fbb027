//! Bridge metrics.
//!
//! Counters are atomics so that tickets, which may be discarded on an
//! acceptor thread, can record into the same instance as the loop thread.

pub mod groups;
pub mod sends;
pub mod tickets;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wsbridge_core::error::{BridgeError, ErrorKind};
use wsbridge_core::result::BridgeResult;

/// Bridge-level metrics counters.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// Groups created
    pub groups_created: AtomicU64,
    /// Groups deleted
    pub groups_deleted: AtomicU64,
    /// Handler references released (replacement or group deletion)
    pub handler_releases: AtomicU64,
    /// Handler invocations delivered to the host
    pub handler_invocations: AtomicU64,
    /// Host callbacks that raised
    pub host_exceptions: AtomicU64,
    /// Sends issued, with or without a callback
    pub sends_issued: AtomicU64,
    /// Sends issued with a completion callback
    pub sends_tracked: AtomicU64,
    /// Tracked sends whose callback ran
    pub sends_completed: AtomicU64,
    /// Tracked sends released without running the callback
    pub sends_cancelled: AtomicU64,
    /// Broadcasts issued
    pub broadcasts: AtomicU64,
    /// Tickets created
    pub tickets_created: AtomicU64,
    /// Tickets handed to the engine
    pub tickets_redeemed: AtomicU64,
    /// Tickets dropped without an upgrade
    pub tickets_discarded: AtomicU64,
}

impl BridgeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            groups_created: self.groups_created.load(Ordering::Relaxed),
            groups_deleted: self.groups_deleted.load(Ordering::Relaxed),
            handler_releases: self.handler_releases.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            host_exceptions: self.host_exceptions.load(Ordering::Relaxed),
            sends_issued: self.sends_issued.load(Ordering::Relaxed),
            sends_tracked: self.sends_tracked.load(Ordering::Relaxed),
            sends_completed: self.sends_completed.load(Ordering::Relaxed),
            sends_cancelled: self.sends_cancelled.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            tickets_created: self.tickets_created.load(Ordering::Relaxed),
            tickets_redeemed: self.tickets_redeemed.load(Ordering::Relaxed),
            tickets_discarded: self.tickets_discarded.load(Ordering::Relaxed),
            captured_at: Utc::now(),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Groups created
    pub groups_created: u64,
    /// Groups deleted
    pub groups_deleted: u64,
    /// Handler references released
    pub handler_releases: u64,
    /// Handler invocations delivered
    pub handler_invocations: u64,
    /// Host callbacks that raised
    pub host_exceptions: u64,
    /// Sends issued
    pub sends_issued: u64,
    /// Sends with a completion callback
    pub sends_tracked: u64,
    /// Completion callbacks run
    pub sends_completed: u64,
    /// Completion callbacks released unrun
    pub sends_cancelled: u64,
    /// Broadcasts issued
    pub broadcasts: u64,
    /// Tickets created
    pub tickets_created: u64,
    /// Tickets redeemed
    pub tickets_redeemed: u64,
    /// Tickets discarded
    pub tickets_discarded: u64,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Tickets that have not reached a terminal state yet.
    pub fn tickets_in_flight(&self) -> u64 {
        self.tickets_created
            .saturating_sub(self.tickets_redeemed + self.tickets_discarded)
    }

    /// Tracked sends still waiting for the engine's completion hook.
    pub fn sends_pending(&self) -> u64 {
        self.sends_tracked
            .saturating_sub(self.sends_completed + self.sends_cancelled)
    }

    /// Render the snapshot as JSON.
    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(|e| {
            BridgeError::with_source(ErrorKind::Internal, "failed to serialize metrics", e)
        })
    }
}
