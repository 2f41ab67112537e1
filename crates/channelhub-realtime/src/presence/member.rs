//! Member identity and per-channel authorization payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authorization payload returned by the authorization service for one
/// (channel, member) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAuth {
    /// Member ID the authorization was granted to.
    pub id: String,
    /// Opaque member info exposed to presence peers.
    #[serde(default)]
    pub info: Value,
}

impl ChannelAuth {
    /// Creates a payload.
    pub fn new(id: impl Into<String>, info: Value) -> Self {
        Self {
            id: id.into(),
            info,
        }
    }
}

/// An authenticated application identity bound to a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Member {
    /// Application-level member ID.
    pub id: String,
    /// Channel name → authorization payload held for that channel.
    pub channels: HashMap<String, ChannelAuth>,
}

impl Member {
    /// Creates a member with no channel authorizations.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channels: HashMap::new(),
        }
    }
}

/// Normalizes a JSON member identifier (string or number) to a string.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
