//! Builders for gateway-originated frames.

use serde_json::json;

use super::types::Envelope;
use crate::presence::{ChannelAuth, PresenceView};

/// Suffix of the subscribe confirmation event.
pub const SUBSCRIPTION_SUCCEEDED: &str = "subscription_succeeded";
/// Suffix of the subscribe rejection event.
pub const SUBSCRIPTION_ERROR: &str = "subscription_error";
/// Suffix of the leave confirmation event.
pub const LEFT: &str = "left";
/// Suffix of the presence join event.
pub const MEMBER_ADDED: &str = "member_added";
/// Suffix of the presence leave event.
pub const MEMBER_REMOVED: &str = "member_removed";

/// First frame sent on every connection.
pub const CONNECTION_ESTABLISHED: &str = "connection:established";

/// Qualifies an event name with its channel: `<channel>:<event>`.
pub fn channel_event(channel: &str, event: &str) -> String {
    format!("{channel}:{event}")
}

/// Announces the connection ID to a freshly connected client.
pub fn connection_established(socket_id: &str) -> Envelope {
    Envelope::new(CONNECTION_ESTABLISHED).with_data(json!({ "socket_id": socket_id }))
}

/// Subscribe confirmation sent to the requester.
pub fn subscription_succeeded(channel: &str) -> Envelope {
    Envelope::new(channel_event(channel, SUBSCRIPTION_SUCCEEDED)).with_channel(channel)
}

/// Subscribe rejection sent to the requester.
pub fn subscription_error(channel: &str, status: u16) -> Envelope {
    Envelope::new(channel_event(channel, SUBSCRIPTION_ERROR))
        .with_channel(channel)
        .with_data(json!({ "status": status }))
}

/// Leave confirmation sent to the leaver.
pub fn left(channel: &str) -> Envelope {
    Envelope::new(channel_event(channel, LEFT)).with_channel(channel)
}

/// Presence join broadcast to every subscriber of the channel.
pub fn member_added(channel: &str, members: PresenceView, member: Option<ChannelAuth>) -> Envelope {
    Envelope::new(channel_event(channel, MEMBER_ADDED))
        .with_channel(channel)
        .with_members(members)
        .with_member(member)
}

/// Presence leave broadcast to every remaining subscriber of the channel.
pub fn member_removed(
    channel: &str,
    members: PresenceView,
    member: Option<ChannelAuth>,
) -> Envelope {
    Envelope::new(channel_event(channel, MEMBER_REMOVED))
        .with_channel(channel)
        .with_members(members)
        .with_member(member)
}
