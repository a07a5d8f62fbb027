//! Group and handler metrics helpers.

use std::sync::atomic::Ordering;

use super::BridgeMetrics;

/// Record a group creation
pub fn record_created(metrics: &BridgeMetrics) {
    metrics.groups_created.fetch_add(1, Ordering::Relaxed);
}

/// Record a group deletion and the handler slots it released
pub fn record_deleted(metrics: &BridgeMetrics, released: usize) {
    metrics.groups_deleted.fetch_add(1, Ordering::Relaxed);
    metrics
        .handler_releases
        .fetch_add(released as u64, Ordering::Relaxed);
}

/// Record a handler replaced in place
pub fn record_handler_released(metrics: &BridgeMetrics) {
    metrics.handler_releases.fetch_add(1, Ordering::Relaxed);
}

/// Record a handler invocation and whether the host raised
pub fn record_invocation(metrics: &BridgeMetrics, raised: bool) {
    metrics.handler_invocations.fetch_add(1, Ordering::Relaxed);
    if raised {
        metrics.host_exceptions.fetch_add(1, Ordering::Relaxed);
    }
}
