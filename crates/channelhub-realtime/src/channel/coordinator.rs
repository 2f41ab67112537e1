//! Subscription coordinator: the subscribe/leave/disconnect state machine.
//!
//! A subscribe request walks
//! `Requested → Authorizing → Authorized → Registered → Confirmed`, or ends
//! in `AuthorizationFailed`. A connection that closes at any point ends
//! the walk in `Discarded`, and nothing it reached is left behind in the
//! registry or on the connection.

use std::sync::Arc;

use tracing::{debug, info};

use channelhub_core::config::RealtimeConfig;
use channelhub_core::error::{AppError, ErrorKind};
use channelhub_core::result::AppResult;

use super::registry::ChannelRegistry;
use super::types::ChannelKind;
use crate::auth::authorizer::ChannelAuthorizer;
use crate::connection::handle::ConnectionHandle;
use crate::message::builder;
use crate::message::types::Envelope;
use crate::message::validator::validate_channel_name;
use crate::metrics::{EngineMetrics, channels as channel_metrics, messages as message_metrics};
use crate::presence::member::ChannelAuth;

/// State of one subscribe request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionState {
    /// Received from the client.
    Requested,
    /// Waiting on the authorizer.
    Authorizing,
    /// Authorization granted, or not needed.
    Authorized(Option<ChannelAuth>),
    /// Recorded in the registry.
    Registered(Option<ChannelAuth>),
    /// Confirmed to the client. Terminal.
    Confirmed,
    /// Refused by the authorizer. Terminal.
    AuthorizationFailed,
    /// The connection closed mid-flight. Terminal.
    Discarded,
}

impl SubscriptionState {
    /// Whether the walk has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::AuthorizationFailed | Self::Discarded
        )
    }
}

/// Coordinates subscriptions between the registry, the authorizer, and
/// the connections.
#[derive(Debug)]
pub struct SubscriptionCoordinator {
    registry: Arc<ChannelRegistry>,
    authorizer: ChannelAuthorizer,
    metrics: Arc<EngineMetrics>,
    max_subscriptions: usize,
    report_errors: bool,
}

impl SubscriptionCoordinator {
    /// Creates a new coordinator.
    pub fn new(
        registry: Arc<ChannelRegistry>,
        authorizer: ChannelAuthorizer,
        metrics: Arc<EngineMetrics>,
        config: &RealtimeConfig,
    ) -> Self {
        Self {
            registry,
            authorizer,
            metrics,
            max_subscriptions: config.max_subscriptions_per_connection,
            report_errors: config.report_subscription_errors,
        }
    }

    /// Returns the channel registry.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Runs a subscribe request to a terminal state.
    ///
    /// Invalid requests (bad channel name, subscription limit) are refused
    /// with an error before the walk starts.
    pub async fn subscribe(
        &self,
        conn: &Arc<ConnectionHandle>,
        channel: &str,
    ) -> AppResult<SubscriptionState> {
        validate_channel_name(channel)?;
        if !conn.is_subscribed(channel) && conn.subscription_count() >= self.max_subscriptions {
            return Err(AppError::validation(format!(
                "Connection {} reached the limit of {} subscriptions",
                conn.id, self.max_subscriptions
            )));
        }

        let kind = ChannelKind::of(channel);
        let mut state = SubscriptionState::Requested;

        while !state.is_terminal() {
            state = match state {
                SubscriptionState::Requested if kind.requires_authorization() => {
                    SubscriptionState::Authorizing
                }
                SubscriptionState::Requested => SubscriptionState::Authorized(None),
                SubscriptionState::Authorizing => {
                    match self.authorizer.authorize(channel, conn).await {
                        Ok(auth) => SubscriptionState::Authorized(auth),
                        Err(_) if !conn.is_alive() => SubscriptionState::Discarded,
                        Err(e) => {
                            self.reject(conn, channel, &e);
                            SubscriptionState::AuthorizationFailed
                        }
                    }
                }
                SubscriptionState::Authorized(auth) => self.register(conn, channel, auth),
                SubscriptionState::Registered(auth) => {
                    self.confirm(conn, channel, kind, auth);
                    SubscriptionState::Confirmed
                }
                terminal => terminal,
            };
        }

        Ok(state)
    }

    fn register(
        &self,
        conn: &Arc<ConnectionHandle>,
        channel: &str,
        auth: Option<ChannelAuth>,
    ) -> SubscriptionState {
        if !conn.is_alive() {
            return SubscriptionState::Discarded;
        }
        self.registry.add_subscriber(channel, conn);

        // A close that raced the insert has already swept the registry.
        if !conn.is_alive() {
            self.registry.remove_subscriber(channel, &conn.id);
            return SubscriptionState::Discarded;
        }
        SubscriptionState::Registered(auth)
    }

    fn confirm(
        &self,
        conn: &ConnectionHandle,
        channel: &str,
        kind: ChannelKind,
        auth: Option<ChannelAuth>,
    ) {
        channel_metrics::record_subscribe(&self.metrics);
        conn.send_envelope(&builder::subscription_succeeded(channel));
        info!(conn_id = %conn.id, channel, "Subscribed");

        if kind.is_presence() {
            let members = self.registry.presence_view(channel);
            self.broadcast(channel, &builder::member_added(channel, members, auth));
        }
    }

    fn reject(&self, conn: &ConnectionHandle, channel: &str, error: &AppError) {
        channel_metrics::record_rejected(&self.metrics);
        debug!(conn_id = %conn.id, channel, error = %error, "Subscription refused");

        if self.report_errors {
            let status = match error.kind {
                ErrorKind::Authentication => 401,
                ErrorKind::Authorization => 403,
                _ => 503,
            };
            conn.send_envelope(&builder::subscription_error(channel, status));
        }
    }

    /// Leaves a channel. Returns `false` when the connection was not
    /// subscribed, in which case nothing is sent.
    pub fn leave(&self, conn: &ConnectionHandle, channel: &str) -> bool {
        if !self.registry.is_subscribed(channel, &conn.id) {
            return false;
        }

        let kind = ChannelKind::of(channel);
        let auth = if kind.requires_authorization() {
            conn.take_channel_auth(channel)
        } else {
            None
        };
        self.registry.remove_subscriber(channel, &conn.id);
        conn.send_envelope(&builder::left(channel));
        info!(conn_id = %conn.id, channel, "Left channel");

        if kind.is_presence() {
            let members = self.registry.presence_view(channel);
            self.broadcast(channel, &builder::member_removed(channel, members, auth));
        }
        true
    }

    /// Removes a closed connection from every channel and tells the
    /// remaining presence peers. Returns the channels it was removed from.
    ///
    /// The departing member is reported with the authorization payload the
    /// connection last held for each channel.
    pub fn disconnect(&self, conn: &ConnectionHandle) -> Vec<String> {
        let removed = self.registry.remove_connection_everywhere(&conn.id);

        for channel in removed.iter().filter(|c| ChannelKind::of(c).is_presence()) {
            let members = self.registry.presence_view(channel);
            let frame = builder::member_removed(channel, members, conn.channel_auth(channel));
            self.broadcast(channel, &frame);
        }

        if !removed.is_empty() {
            debug!(conn_id = %conn.id, channels = removed.len(), "Connection swept from channels");
        }
        removed
    }

    /// Sends one frame to every current subscriber of `channel`.
    fn broadcast(&self, channel: &str, envelope: &Envelope) {
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(channel, error = %e, "Failed to serialize broadcast");
                return;
            }
        };

        let mut sent = 0;
        let mut failed = 0;
        for subscriber in self.registry.subscribers(channel) {
            if subscriber.send(frame.clone()) {
                sent += 1;
            } else {
                failed += 1;
            }
        }
        message_metrics::record_sent(&self.metrics, sent);
        message_metrics::record_send_failures(&self.metrics, failed);
    }
}
