//! Ticket metrics helpers.

use std::sync::atomic::Ordering;

use super::BridgeMetrics;

/// Record a ticket creation
pub fn record_created(metrics: &BridgeMetrics) {
    metrics.tickets_created.fetch_add(1, Ordering::Relaxed);
}

/// Record a ticket handed to the engine
pub fn record_redeemed(metrics: &BridgeMetrics) {
    metrics.tickets_redeemed.fetch_add(1, Ordering::Relaxed);
}

/// Record a ticket discarded without an upgrade
pub fn record_discarded(metrics: &BridgeMetrics) {
    metrics.tickets_discarded.fetch_add(1, Ordering::Relaxed);
}
