//! Redis pattern-subscription bus for multi-node deployments.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use channelhub_core::config::BusConfig;
use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;

use super::BusMessage;

/// Outcome of one subscription session.
enum Session {
    /// Shutdown was requested.
    Shutdown,
    /// The fan-out engine stopped receiving.
    ReceiverClosed,
}

/// Redis bus. Pattern-subscribes and forwards every message to the fan-out
/// engine, reconnecting after failures.
#[derive(Debug, Clone)]
pub struct RedisBus {
    /// Redis URL.
    url: String,
    /// Subscription pattern.
    pattern: String,
    /// Delay before reconnecting.
    reconnect_delay: Duration,
}

impl RedisBus {
    /// Creates a new Redis bus from configuration.
    pub fn new(config: &BusConfig) -> Self {
        Self {
            url: config.redis_url.clone(),
            pattern: config.pattern.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }

    /// Runs until shutdown or until the fan-out engine goes away.
    pub async fn run(self, tx: mpsc::Sender<BusMessage>, shutdown: CancellationToken) {
        loop {
            match self.subscribe_once(&tx, &shutdown).await {
                Ok(Session::Shutdown) => break,
                Ok(Session::ReceiverClosed) => {
                    warn!("Fan-out engine stopped receiving, closing Redis bus");
                    break;
                }
                Err(e) => error!(error = %e, "Redis bus subscription lost"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {
                    info!(pattern = %self.pattern, "Reconnecting Redis bus");
                }
            }
        }
        info!("Redis bus stopped");
    }

    async fn subscribe_once(
        &self,
        tx: &mpsc::Sender<BusMessage>,
        shutdown: &CancellationToken,
    ) -> AppResult<Session> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| AppError::configuration(format!("Invalid bus Redis URL: {e}")))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::service_unavailable(format!("Redis connection failed: {e}")))?;
        pubsub
            .psubscribe(&self.pattern)
            .await
            .map_err(|e| AppError::service_unavailable(format!("Redis PSUBSCRIBE failed: {e}")))?;
        info!(pattern = %self.pattern, "Subscribed to Redis bus");

        let mut messages = pubsub.on_message();
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => return Ok(Session::Shutdown),
                msg = messages.next() => msg,
            };
            let Some(msg) = msg else {
                return Err(AppError::transport("Redis pub/sub stream ended"));
            };

            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(channel = msg.get_channel_name(), error = %e, "Non-text bus payload");
                    continue;
                }
            };
            let message = BusMessage::new(msg.get_channel_name(), payload);
            if tx.send(message).await.is_err() {
                return Ok(Session::ReceiverClosed);
            }
        }
    }
}
