//! Presence roster derivation.
//!
//! The roster is never stored. It is recomputed from the subscribers of a
//! channel every time a presence event needs it, so it cannot drift from
//! the registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connection::handle::ConnectionHandle;

/// One member's entry in a presence roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// Fields of the member's info object.
    #[serde(flatten)]
    pub info: Map<String, Value>,
    /// Connections through which the member is subscribed.
    pub socket_ids: Vec<String>,
}

/// Member ID → roster entry.
pub type PresenceView = BTreeMap<String, PresenceEntry>;

/// Builds the roster of `channel` from its subscriber connections.
///
/// Connections without a bound member, or without an authorization
/// payload for the channel, are left out. When one member is subscribed
/// through several connections, the first connection's info is kept and
/// every connection ID is listed.
pub fn build_view<'a, I>(channel: &str, subscribers: I) -> PresenceView
where
    I: IntoIterator<Item = &'a Arc<ConnectionHandle>>,
{
    let mut view = PresenceView::new();

    for conn in subscribers {
        let (Some(member_id), Some(auth)) = (conn.member_id(), conn.channel_auth(channel)) else {
            continue;
        };

        view.entry(member_id)
            .or_insert_with(|| PresenceEntry {
                info: info_fields(&auth.info),
                socket_ids: Vec::new(),
            })
            .socket_ids
            .push(conn.id.clone());
    }

    view
}

fn info_fields(info: &Value) -> Map<String, Value> {
    match info {
        Value::Object(fields) => {
            let mut fields = fields.clone();
            fields.remove("socket_ids");
            fields
        }
        Value::Null => Map::new(),
        other => {
            let mut fields = Map::new();
            fields.insert("info".to_string(), other.clone());
            fields
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::member::ChannelAuth;
    use crate::test_support::connection;
    use serde_json::json;

    const CHANNEL: &str = "presence-room";

    #[test]
    fn test_view_merges_connections_of_one_member() {
        let (a, _rx_a) = connection("A");
        let (b, _rx_b) = connection("B");
        for conn in [&a, &b] {
            conn.bind_member("u1");
            conn.set_channel_auth(CHANNEL, ChannelAuth::new("u1", json!({"name": "Ada"})));
        }

        let view = build_view(CHANNEL, [&a, &b]);

        assert_eq!(view.len(), 1);
        let entry = &view["u1"];
        assert_eq!(entry.info["name"], json!("Ada"));
        assert_eq!(entry.socket_ids, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_view_skips_connections_without_auth() {
        let (a, _rx_a) = connection("A");
        let (b, _rx_b) = connection("B");
        a.bind_member("u1");
        a.set_channel_auth(CHANNEL, ChannelAuth::new("u1", json!({})));
        b.bind_member("u2");

        let view = build_view(CHANNEL, [&a, &b]);

        assert_eq!(view.keys().collect::<Vec<_>>(), vec!["u1"]);
    }

    #[test]
    fn test_view_keyed_by_bound_member() {
        let (a, _rx_a) = connection("A");
        let (b, _rx_b) = connection("B");
        a.bind_member("u1");
        a.set_channel_auth(CHANNEL, ChannelAuth::new("7", json!({"name": "Ada"})));
        b.bind_member("u2");
        b.set_channel_auth(CHANNEL, ChannelAuth::new("7", json!({"name": "Bea"})));

        let view = build_view(CHANNEL, [&a, &b]);

        assert_eq!(view.keys().collect::<Vec<_>>(), vec!["u1", "u2"]);
        assert_eq!(view["u1"].socket_ids, vec!["A".to_string()]);
        assert_eq!(view["u2"].info["name"], json!("Bea"));
    }

    #[test]
    fn test_view_serializes_flat() {
        let (a, _rx_a) = connection("A");
        a.bind_member("u1");
        a.set_channel_auth(CHANNEL, ChannelAuth::new("u1", json!("guest")));

        let value = serde_json::to_value(build_view(CHANNEL, [&a])).unwrap();

        assert_eq!(value, json!({"u1": {"info": "guest", "socket_ids": ["A"]}}));
    }
}
