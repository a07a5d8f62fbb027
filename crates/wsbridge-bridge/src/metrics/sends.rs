//! Send metrics helpers.

use std::sync::atomic::Ordering;

use super::BridgeMetrics;

/// Record a send, tracked when a completion callback was supplied
pub fn record_issued(metrics: &BridgeMetrics, tracked: bool) {
    metrics.sends_issued.fetch_add(1, Ordering::Relaxed);
    if tracked {
        metrics.sends_tracked.fetch_add(1, Ordering::Relaxed);
    }
}

/// Record a completion callback that ran
pub fn record_completed(metrics: &BridgeMetrics) {
    metrics.sends_completed.fetch_add(1, Ordering::Relaxed);
}

/// Record a completion callback released without running
pub fn record_cancelled(metrics: &BridgeMetrics) {
    metrics.sends_cancelled.fetch_add(1, Ordering::Relaxed);
}

/// Record a group broadcast
pub fn record_broadcast(metrics: &BridgeMetrics) {
    metrics.broadcasts.fetch_add(1, Ordering::Relaxed);
}

/// Record a completion callback that raised
pub fn record_callback_raised(metrics: &BridgeMetrics) {
    metrics.host_exceptions.fetch_add(1, Ordering::Relaxed);
}
