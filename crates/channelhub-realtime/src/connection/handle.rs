//! Individual client connection handle.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::message::types::Envelope;
use crate::presence::member::{ChannelAuth, Member};

/// Unique connection identifier, opaque to clients.
pub type ConnectionId = String;

/// A handle to a single client connection.
///
/// Holds the sender channel for pushing frames to the client, the bound
/// member (if any), and the set of channels the connection is subscribed
/// to. Once closed, a handle never accepts new state.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Request headers forwarded to the authorization service
    pub forwarded_headers: Vec<(String, String)>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound text frames
    sender: mpsc::Sender<String>,
    /// Bound member, set by the first successful identity bind
    member: RwLock<Option<Member>>,
    /// Latest identity token presented by the client
    token: RwLock<Option<String>>,
    /// Channels this connection is subscribed to
    subscriptions: Mutex<BTreeSet<String>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Fires when the connection closes
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        id: impl Into<ConnectionId>,
        forwarded_headers: Vec<(String, String)>,
        sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            id: id.into(),
            forwarded_headers,
            connected_at: Utc::now(),
            sender,
            member: RwLock::new(None),
            token: RwLock::new(None),
            subscriptions: Mutex::new(BTreeSet::new()),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue a text frame for this connection
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Connection send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                false
            }
        }
    }

    /// Serialize and queue a frame for this connection
    pub fn send_envelope(&self, envelope: &Envelope) -> bool {
        match envelope.to_json() {
            Ok(frame) => self.send(frame),
            Err(e) => {
                tracing::error!(conn_id = %self.id, error = %e, "Failed to serialize frame");
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection closed and wake everything waiting on it
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed.cancel();
    }

    /// Resolves once the connection is closed
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Latest identity token, if any
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Replace the identity token
    pub fn set_token(&self, token: String) {
        *self.token.write() = Some(token);
    }

    /// Bind a member identity. Only the first bind takes effect.
    pub fn bind_member(&self, member_id: &str) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut member = self.member.write();
        if member.is_some() {
            return false;
        }
        *member = Some(Member::new(member_id));
        true
    }

    /// ID of the bound member, if any
    pub fn member_id(&self) -> Option<String> {
        self.member.read().as_ref().map(|m| m.id.clone())
    }

    /// Authorization payload held for a channel
    pub fn channel_auth(&self, channel: &str) -> Option<ChannelAuth> {
        self.member
            .read()
            .as_ref()
            .and_then(|m| m.channels.get(channel).cloned())
    }

    /// Store the authorization payload for a channel.
    ///
    /// Returns `false` when the connection is closed or has no member.
    pub fn set_channel_auth(&self, channel: &str, auth: ChannelAuth) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.member.write().as_mut() {
            Some(member) => {
                member.channels.insert(channel.to_string(), auth);
                true
            }
            None => false,
        }
    }

    /// Remove and return the authorization payload for a channel
    pub fn take_channel_auth(&self, channel: &str) -> Option<ChannelAuth> {
        self.member
            .write()
            .as_mut()
            .and_then(|m| m.channels.remove(channel))
    }

    /// Record a subscription. Returns `true` if it is new.
    pub(crate) fn subscribe(&self, channel: &str) -> bool {
        self.subscriptions.lock().insert(channel.to_string())
    }

    /// Forget a subscription. Returns `true` if it existed.
    pub(crate) fn unsubscribe(&self, channel: &str) -> bool {
        self.subscriptions.lock().remove(channel)
    }

    /// Get current subscription count
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Check if subscribed to a channel
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.lock().contains(channel)
    }
}
