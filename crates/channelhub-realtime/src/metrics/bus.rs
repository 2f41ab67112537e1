//! Bus metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record a bus message received
pub fn record_message(metrics: &EngineMetrics) {
    metrics.bus_messages.fetch_add(1, Ordering::Relaxed);
}

/// Record a bus message dropped as malformed
pub fn record_dropped(metrics: &EngineMetrics) {
    metrics.bus_messages_dropped.fetch_add(1, Ordering::Relaxed);
}
