//! Authorization cache metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record a decision served from the cache
pub fn record_cache_hit(metrics: &EngineMetrics) {
    metrics.auth_cache_hits.fetch_add(1, Ordering::Relaxed);
}

/// Record a decision fetched from the service
pub fn record_cache_miss(metrics: &EngineMetrics) {
    metrics.auth_cache_misses.fetch_add(1, Ordering::Relaxed);
}
