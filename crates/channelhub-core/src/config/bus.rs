//! Backend publish-subscribe bus configuration.

use serde::{Deserialize, Serialize};

/// Settings for the bus that delivers backend-originated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus provider: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL used for the pattern subscription.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Channel pattern to subscribe to.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Delay before re-subscribing after the bus connection drops, in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the queue between the bus reader and the fan-out engine.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            pattern: default_pattern(),
            reconnect_delay_ms: default_reconnect_delay(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_buffer_size() -> usize {
    1024
}
