//! Single channel with subscriber tracking.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connection::handle::{ConnectionHandle, ConnectionId};

/// A single channel and the connections subscribed to it.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Channel name.
    pub name: String,
    /// Subscribed connections, ordered by connection ID.
    pub subscribers: BTreeMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl Channel {
    /// Creates a new empty channel.
    pub fn new(name: String) -> Self {
        Self {
            name,
            subscribers: BTreeMap::new(),
        }
    }

    /// Adds a subscriber. Returns `true` if it was not subscribed yet.
    pub fn subscribe(&mut self, conn: Arc<ConnectionHandle>) -> bool {
        self.subscribers.insert(conn.id.clone(), conn).is_none()
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&mut self, conn_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.subscribers.remove(conn_id)
    }

    /// Returns subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns whether the channel has any subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Returns a snapshot of the subscribed connections.
    pub fn get_subscribers(&self) -> Vec<Arc<ConnectionHandle>> {
        self.subscribers.values().cloned().collect()
    }
}
