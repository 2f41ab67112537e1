//! Channel metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record a confirmed subscription
pub fn record_subscribe(metrics: &EngineMetrics) {
    metrics.subscriptions_total.fetch_add(1, Ordering::Relaxed);
}

/// Record a subscription refused by authorization
pub fn record_rejected(metrics: &EngineMetrics) {
    metrics.subscriptions_rejected.fetch_add(1, Ordering::Relaxed);
}
