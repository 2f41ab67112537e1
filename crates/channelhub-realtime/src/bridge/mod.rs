//! Backend bus adapters and fan-out to subscribed connections.

pub mod fanout;
pub mod memory_pubsub;
#[cfg(feature = "redis-pubsub")]
pub mod redis_pubsub;

pub use fanout::FanoutEngine;
pub use memory_pubsub::MemoryBus;

/// A message received from the backend bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Bus channel, used verbatim as the gateway channel name.
    pub channel: String,
    /// Raw JSON payload.
    pub payload: String,
}

impl BusMessage {
    /// Creates a message for `channel`.
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}
