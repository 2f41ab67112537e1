//! In-process bus for single-node deployments and tests.

use tokio::sync::mpsc;

use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;

use super::BusMessage;

/// In-process bus. Publishing hands the message straight to the fan-out
/// engine's receiver.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    /// Sender feeding the fan-out engine
    tx: mpsc::Sender<BusMessage>,
}

impl MemoryBus {
    /// Create a bus publishing into `tx`
    pub fn new(tx: mpsc::Sender<BusMessage>) -> Self {
        Self { tx }
    }

    /// Publish a raw JSON payload to a channel
    pub async fn publish(&self, channel: &str, payload: impl Into<String>) -> AppResult<()> {
        self.tx
            .send(BusMessage::new(channel, payload))
            .await
            .map_err(|_| AppError::transport("Fan-out engine is no longer receiving"))
    }
}
