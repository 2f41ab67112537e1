//! Fan-out of bus messages to channel subscribers.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;

use super::BusMessage;
use crate::channel::registry::ChannelRegistry;
use crate::message::builder::channel_event;
use crate::metrics::{EngineMetrics, bus as bus_metrics, messages as message_metrics};

/// Delivers bus messages to every subscriber of their channel.
#[derive(Debug)]
pub struct FanoutEngine {
    registry: Arc<ChannelRegistry>,
    metrics: Arc<EngineMetrics>,
}

impl FanoutEngine {
    /// Creates a new fan-out engine.
    pub fn new(registry: Arc<ChannelRegistry>, metrics: Arc<EngineMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Delivers one bus message and returns how many connections it was
    /// queued to.
    ///
    /// The payload must be a JSON object. The channel name is injected,
    /// `event` is qualified as `<channel>:<event>`, and the connection
    /// named by `data.socket` (or a top-level `socket`) is skipped. The
    /// frame is serialized once; a failed write to one connection never
    /// affects the others.
    pub fn dispatch(&self, message: &BusMessage) -> AppResult<usize> {
        let (frame, excluded) = build_frame(&message.channel, &message.payload)?;

        let mut sent = 0;
        let mut failed = 0;
        for conn in self.registry.subscribers(&message.channel) {
            if excluded.as_deref() == Some(conn.id.as_str()) {
                continue;
            }
            if conn.send(frame.clone()) {
                sent += 1;
            } else {
                failed += 1;
            }
        }

        message_metrics::record_sent(&self.metrics, sent as u64);
        message_metrics::record_send_failures(&self.metrics, failed);
        trace!(channel = %message.channel, sent, failed, "Bus message fanned out");
        Ok(sent)
    }

    /// Consumes bus messages until the sender side closes or `shutdown`
    /// fires.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<BusMessage>, shutdown: CancellationToken) {
        info!("Fan-out engine started");
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            bus_metrics::record_message(&self.metrics);
            if let Err(e) = self.dispatch(&message) {
                bus_metrics::record_dropped(&self.metrics);
                warn!(channel = %message.channel, error = %e, "Dropping malformed bus message");
            }
        }
        debug!("Fan-out engine stopped");
    }
}

/// Rewrites a bus payload into the client frame. Returns the frame and the
/// connection to exclude.
fn build_frame(channel: &str, payload: &str) -> AppResult<(String, Option<String>)> {
    let mut value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::validation(format!("Bus payload is not JSON: {e}")))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| AppError::validation("Bus payload is not a JSON object"))?;

    let excluded = object
        .get("data")
        .and_then(|data| data.get("socket"))
        .or_else(|| object.get("socket"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    if let Some(event) = object.get("event").and_then(Value::as_str) {
        let qualified = channel_event(channel, event);
        object.insert("event".to_string(), Value::String(qualified));
    }
    object.insert("channel".to_string(), Value::String(channel.to_string()));

    Ok((serde_json::to_string(&value)?, excluded))
}
