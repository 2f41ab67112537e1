//! Response DTOs.

use serde::{Deserialize, Serialize};

use channelhub_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "shutting_down".
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// "ok", "degraded", or "shutting_down".
    pub status: String,
    /// "connected" or "unavailable".
    pub cache: String,
    /// Open client connections.
    pub connections: usize,
    /// Channels with at least one subscriber.
    pub channels: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
