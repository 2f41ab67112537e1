//! Message metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record frames queued to clients
pub fn record_sent(metrics: &EngineMetrics, count: u64) {
    metrics.messages_sent.fetch_add(count, Ordering::Relaxed);
}

/// Record frames that could not be queued
pub fn record_send_failures(metrics: &EngineMetrics, count: u64) {
    if count > 0 {
        metrics.send_failures.fetch_add(count, Ordering::Relaxed);
    }
}

/// Record a message received from a client
pub fn record_received(metrics: &EngineMetrics) {
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
}

/// Record a client message dropped as malformed
pub fn record_rejected(metrics: &EngineMetrics) {
    metrics.messages_rejected.fetch_add(1, Ordering::Relaxed);
}
