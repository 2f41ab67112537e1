//! Authorization service configuration.

use serde::{Deserialize, Serialize};

/// Settings for the external authorization/identity HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the application that answers authorization requests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the channel authorization endpoint.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    /// Path of the identity binding endpoint.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// Request timeout for every call to the service, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// TTL of cached authorization decisions (positive and negative), in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_path: default_auth_path(),
            socket_path: default_socket_path(),
            timeout_seconds: default_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_auth_path() -> String {
    "/broadcasting/auth".to_string()
}

fn default_socket_path() -> String {
    "/broadcasting/socket".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    86_400
}
