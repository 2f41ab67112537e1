//! Connection manager. Handles connection lifecycle (register, inbound
//! dispatch, unregister).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use channelhub_core::config::RealtimeConfig;

use crate::channel::coordinator::SubscriptionCoordinator;
use crate::message::builder;
use crate::message::types::InboundMessage;
use crate::message::validator::validate_inbound;
use crate::metrics::{EngineMetrics, connections as conn_metrics, messages as message_metrics};

use super::authenticator::IdentityBinder;
use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// Manages all open client connections.
///
/// The transport calls [`register`](Self::register) on connect, feeds every
/// inbound text frame of a connection to
/// [`handle_inbound`](Self::handle_inbound) one at a time, and calls
/// [`unregister`](Self::unregister) exactly once on close.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Subscription coordinator.
    coordinator: Arc<SubscriptionCoordinator>,
    /// Identity binder.
    binder: IdentityBinder,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        coordinator: Arc<SubscriptionCoordinator>,
        binder: IdentityBinder,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            coordinator,
            binder,
            metrics,
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// Only the headers named in `forward_headers` are kept. The client is
    /// told its connection ID straight away. Returns the connection handle
    /// and a receiver for outbound text frames.
    pub fn register(
        &self,
        headers: Vec<(String, String)>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);

        let forwarded = headers
            .into_iter()
            .filter(|(name, _)| {
                self.config
                    .forward_headers
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(name))
            })
            .collect();

        let handle = Arc::new(ConnectionHandle::new(
            Uuid::new_v4().to_string(),
            forwarded,
            tx,
        ));

        self.pool.add(handle.clone());
        conn_metrics::record_connect(&self.metrics);
        handle.send_envelope(&builder::connection_established(&handle.id));

        info!(conn_id = %handle.id, "Connection registered");

        (handle, rx)
    }

    /// Unregisters a connection and cleans up its subscriptions.
    ///
    /// The connection is marked closed first, so any request still in
    /// flight for it is cancelled and cannot register anything afterwards.
    /// Returns the channels the connection was removed from.
    pub fn unregister(&self, conn_id: &str) -> Vec<String> {
        let Some(handle) = self.pool.remove(conn_id) else {
            return Vec::new();
        };

        handle.close();
        let channels = self.coordinator.disconnect(&handle);
        conn_metrics::record_disconnect(&self.metrics);

        info!(
            conn_id = %conn_id,
            channels = channels.len(),
            duration_secs = (Utc::now() - handle.connected_at).num_seconds(),
            "Connection unregistered"
        );
        channels
    }

    /// Handles one inbound text frame of a connection.
    ///
    /// Malformed frames and unknown events are dropped. If the connection
    /// closes while the request is waiting on the authorization service,
    /// the request is abandoned.
    pub async fn handle_inbound(&self, conn_id: &str, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            debug!(conn_id = %conn_id, "Frame for unknown connection");
            return;
        };
        message_metrics::record_received(&self.metrics);

        let message = match validate_inbound(raw, self.config.max_message_size)
            .and_then(|_| InboundMessage::parse(raw))
        {
            Ok(message) => message,
            Err(e) => {
                message_metrics::record_rejected(&self.metrics);
                debug!(conn_id = %conn_id, error = %e, "Dropping inbound frame");
                return;
            }
        };

        tokio::select! {
            _ = handle.closed() => {
                debug!(conn_id = %conn_id, "Connection closed while handling frame");
            }
            _ = self.dispatch(&handle, message) => {}
        }
    }

    async fn dispatch(&self, handle: &Arc<ConnectionHandle>, message: InboundMessage) {
        match message {
            InboundMessage::Bind { token } => {
                if let Err(e) = self.binder.bind(handle, token).await {
                    warn!(conn_id = %handle.id, error = %e, "Identity bind failed");
                }
            }
            InboundMessage::Subscribe { channel } => {
                match self.coordinator.subscribe(handle, &channel).await {
                    Ok(state) => {
                        debug!(conn_id = %handle.id, channel = %channel, state = ?state, "Subscribe finished");
                    }
                    Err(e) => {
                        debug!(conn_id = %handle.id, channel = %channel, error = %e, "Subscribe refused");
                    }
                }
            }
            InboundMessage::Leave { channel } => {
                self.coordinator.leave(handle, &channel);
            }
        }
    }

    /// Closes every connection, for shutdown.
    pub fn close_all(&self) {
        for handle in self.pool.all_connections() {
            self.unregister(&handle.id);
        }
    }

    /// Returns number of open connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }
}
