//! Channel gateway configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound queue size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum channel subscriptions per connection.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Send `<channel>:subscription_error` to a client whose subscribe was refused.
    #[serde(default)]
    pub report_subscription_errors: bool,
    /// Upgrade request headers forwarded to the authorization service.
    #[serde(default = "default_forward_headers")]
    pub forward_headers: Vec<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            max_subscriptions_per_connection: default_max_subscriptions(),
            max_message_size: default_max_message_size(),
            report_subscription_errors: false,
            forward_headers: default_forward_headers(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_subscriptions() -> usize {
    100
}

fn default_max_message_size() -> usize {
    65_536
}

fn default_forward_headers() -> Vec<String> {
    vec!["cookie".to_string(), "authorization".to_string()]
}
