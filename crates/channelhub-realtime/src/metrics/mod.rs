//! Gateway metrics.

pub mod auth;
pub mod bus;
pub mod channels;
pub mod connections;
pub mod messages;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Frames queued to clients
    pub messages_sent: AtomicU64,
    /// Frames that could not be queued to a client
    pub send_failures: AtomicU64,
    /// Inbound client messages
    pub messages_received: AtomicU64,
    /// Inbound client messages dropped as malformed
    pub messages_rejected: AtomicU64,
    /// Connections ever established
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Confirmed subscriptions
    pub subscriptions_total: AtomicU64,
    /// Subscriptions refused by authorization
    pub subscriptions_rejected: AtomicU64,
    /// Authorization decisions served from the cache
    pub auth_cache_hits: AtomicU64,
    /// Authorization decisions that went to the service
    pub auth_cache_misses: AtomicU64,
    /// Bus messages received
    pub bus_messages: AtomicU64,
    /// Bus messages dropped as malformed
    pub bus_messages_dropped: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            subscriptions_total: self.subscriptions_total.load(Ordering::Relaxed),
            subscriptions_rejected: self.subscriptions_rejected.load(Ordering::Relaxed),
            auth_cache_hits: self.auth_cache_hits.load(Ordering::Relaxed),
            auth_cache_misses: self.auth_cache_misses.load(Ordering::Relaxed),
            bus_messages: self.bus_messages.load(Ordering::Relaxed),
            bus_messages_dropped: self.bus_messages_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Frames queued to clients
    pub messages_sent: u64,
    /// Frames that could not be queued
    pub send_failures: u64,
    /// Inbound client messages
    pub messages_received: u64,
    /// Inbound client messages dropped
    pub messages_rejected: u64,
    /// Connections ever established
    pub connections_total: u64,
    /// Connections currently open
    pub connections_active: u64,
    /// Confirmed subscriptions
    pub subscriptions_total: u64,
    /// Refused subscriptions
    pub subscriptions_rejected: u64,
    /// Authorization cache hits
    pub auth_cache_hits: u64,
    /// Authorization cache misses
    pub auth_cache_misses: u64,
    /// Bus messages received
    pub bus_messages: u64,
    /// Bus messages dropped
    pub bus_messages_dropped: u64,
}
