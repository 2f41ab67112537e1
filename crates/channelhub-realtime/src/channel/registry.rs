//! Channel registry, the process-wide map of channels to subscribers.
//!
//! Every operation is atomic with respect to the others. Each channel's
//! subscriber set lives in one DashMap entry, and each connection's own
//! subscription set is updated while that entry is held, so the two views
//! never disagree for longer than a single call.

use std::sync::Arc;

use dashmap::DashMap;

use crate::connection::handle::ConnectionHandle;
use crate::presence::view::{PresenceView, build_view};

use super::channel::Channel;

/// Registry of all channels with at least one subscriber.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Channel name → Channel.
    channels: DashMap<String, Channel>,
}

impl ChannelRegistry {
    /// Creates a new channel registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a channel exists and returns its current subscribers.
    pub fn get_or_create(&self, channel_name: &str) -> Vec<Arc<ConnectionHandle>> {
        self.channels
            .entry(channel_name.to_string())
            .or_insert_with(|| Channel::new(channel_name.to_string()))
            .get_subscribers()
    }

    /// Subscribes a connection to a channel. Returns `true` if the
    /// connection was not subscribed yet.
    pub fn add_subscriber(&self, channel_name: &str, conn: &Arc<ConnectionHandle>) -> bool {
        let mut channel = self
            .channels
            .entry(channel_name.to_string())
            .or_insert_with(|| Channel::new(channel_name.to_string()));
        conn.subscribe(channel_name);
        channel.subscribe(conn.clone())
    }

    /// Unsubscribes a connection from a channel. Returns `true` if it was
    /// subscribed. The channel is dropped once empty.
    pub fn remove_subscriber(&self, channel_name: &str, conn_id: &str) -> bool {
        let removed = match self.channels.get_mut(channel_name) {
            Some(mut channel) => match channel.unsubscribe(conn_id) {
                Some(conn) => {
                    conn.unsubscribe(channel_name);
                    true
                }
                None => false,
            },
            None => false,
        };
        self.drop_if_empty(channel_name);
        removed
    }

    /// Unsubscribes a connection from every channel and returns the names
    /// of the channels it was removed from.
    pub fn remove_connection_everywhere(&self, conn_id: &str) -> Vec<String> {
        let mut removed = Vec::new();
        for mut channel in self.channels.iter_mut() {
            if let Some(conn) = channel.unsubscribe(conn_id) {
                conn.unsubscribe(&channel.name);
                removed.push(channel.name.clone());
            }
        }
        for channel_name in &removed {
            self.drop_if_empty(channel_name);
        }
        removed
    }

    /// Computes the presence roster of a channel from its subscribers.
    pub fn presence_view(&self, channel_name: &str) -> PresenceView {
        self.channels
            .get(channel_name)
            .map(|ch| build_view(channel_name, ch.subscribers.values()))
            .unwrap_or_default()
    }

    /// Returns a snapshot of the subscribers of a channel.
    pub fn subscribers(&self, channel_name: &str) -> Vec<Arc<ConnectionHandle>> {
        self.channels
            .get(channel_name)
            .map(|ch| ch.get_subscribers())
            .unwrap_or_default()
    }

    /// Returns whether a connection is subscribed to a channel.
    pub fn is_subscribed(&self, channel_name: &str, conn_id: &str) -> bool {
        self.channels
            .get(channel_name)
            .is_some_and(|ch| ch.subscribers.contains_key(conn_id))
    }

    /// Returns subscriber count for a channel.
    pub fn subscriber_count(&self, channel_name: &str) -> usize {
        self.channels
            .get(channel_name)
            .map(|ch| ch.subscriber_count())
            .unwrap_or(0)
    }

    /// Returns total number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn drop_if_empty(&self, channel_name: &str) {
        self.channels.remove_if(channel_name, |_, ch| ch.is_empty());
    }
}
