//! Wire message type definitions.
//!
//! Every frame in either direction is a JSON object carrying an `event`
//! name and a `data` payload. Gateway-originated frames may also carry the
//! channel name and presence roster fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use channelhub_core::error::AppError;

use crate::presence::{ChannelAuth, PresenceView};

/// Inbound event that binds an identity token to the connection.
pub const EVENT_IDENTITY_BIND: &str = "identity:bind";

/// Legacy name of [`EVENT_IDENTITY_BIND`] still sent by older clients.
pub const EVENT_IDENTITY_BIND_LEGACY: &str = "socket:csrf";

/// Inbound subscribe request.
pub const EVENT_SUBSCRIBE: &str = "subscribe";

/// Inbound leave request.
pub const EVENT_LEAVE: &str = "leave";

/// A wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    pub event: String,
    /// Event payload.
    #[serde(default = "empty_object")]
    pub data: Value,
    /// Channel the frame refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Presence roster, on member events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<PresenceView>,
    /// The member that joined or left, on member events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<ChannelAuth>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Envelope {
    /// Creates a frame with an empty payload.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: empty_object(),
            channel: None,
            members: None,
            member: None,
        }
    }

    /// Sets the payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the roster.
    pub fn with_members(mut self, members: PresenceView) -> Self {
        self.members = Some(members);
        self
    }

    /// Sets the joining or leaving member.
    pub fn with_member(mut self, member: Option<ChannelAuth>) -> Self {
        self.member = member;
        self
    }

    /// Serializes to a JSON text frame.
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Bind an identity token to the connection.
    Bind {
        /// Opaque token presented to the identity service.
        token: String,
    },
    /// Subscribe to a channel.
    Subscribe {
        /// Channel name.
        channel: String,
    },
    /// Leave a channel.
    Leave {
        /// Channel name.
        channel: String,
    },
}

impl InboundMessage {
    /// Decodes a raw text frame.
    ///
    /// The channel of `subscribe` and `leave` is read from the top level,
    /// falling back to `data.channel`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| AppError::validation(format!("Malformed frame: {e}")))?;

        match envelope.event.as_str() {
            EVENT_IDENTITY_BIND | EVENT_IDENTITY_BIND_LEGACY => {
                let token = string_field(&envelope.data, "token")
                    .ok_or_else(|| AppError::validation("Identity bind without a token"))?;
                Ok(Self::Bind { token })
            }
            EVENT_SUBSCRIBE => Ok(Self::Subscribe {
                channel: channel_of(&envelope)?,
            }),
            EVENT_LEAVE => Ok(Self::Leave {
                channel: channel_of(&envelope)?,
            }),
            other => Err(AppError::validation(format!("Unsupported event '{other}'"))),
        }
    }
}

fn string_field(data: &Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn channel_of(envelope: &Envelope) -> Result<String, AppError> {
    envelope
        .channel
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| string_field(&envelope.data, "channel"))
        .ok_or_else(|| AppError::validation(format!("'{}' without a channel", envelope.event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_json_keeps_roster_and_member() {
        let mut info = Map::new();
        info.insert("name".to_string(), json!("Ada"));
        let mut members = PresenceView::new();
        members.insert(
            "u1".to_string(),
            crate::presence::PresenceEntry {
                info,
                socket_ids: vec!["A".to_string(), "B".to_string()],
            },
        );
        let envelope = Envelope::new("presence-room:member_added")
            .with_channel("presence-room")
            .with_data(json!({"reason": "join", "nested": {"n": 1}}))
            .with_members(members)
            .with_member(Some(ChannelAuth::new("u1", json!({"name": "Ada"}))));

        let parsed: Envelope = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(parsed, envelope);
        assert_eq!(parsed.members.as_ref().unwrap()["u1"].socket_ids.len(), 2);
    }

    #[test]
    fn test_parse_subscribe() {
        let msg = InboundMessage::parse(r#"{"event":"subscribe","channel":"orders"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Subscribe {
                channel: "orders".into()
            }
        );
    }

    #[test]
    fn test_parse_leave_channel_in_data() {
        let msg =
            InboundMessage::parse(r#"{"event":"leave","data":{"channel":"presence-room"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            InboundMessage::Leave {
                channel: "presence-room".into()
            }
        );
    }

    #[test]
    fn test_parse_bind_and_legacy_alias() {
        for event in [EVENT_IDENTITY_BIND, EVENT_IDENTITY_BIND_LEGACY] {
            let raw = json!({"event": event, "data": {"token": "t-1"}}).to_string();
            assert_eq!(
                InboundMessage::parse(&raw).unwrap(),
                InboundMessage::Bind {
                    token: "t-1".into()
                }
            );
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(InboundMessage::parse("not json").is_err());
        assert!(InboundMessage::parse(r#"{"data":{}}"#).is_err());
        assert!(InboundMessage::parse(r#"{"event":"subscribe"}"#).is_err());
        assert!(InboundMessage::parse(r#"{"event":"identity:bind","data":{}}"#).is_err());
        assert!(InboundMessage::parse(r#"{"event":"client-whisper","channel":"x"}"#).is_err());
    }

    #[test]
    fn test_envelope_omits_absent_fields() {
        let frame = Envelope::new("orders:subscription_succeeded")
            .with_channel("orders")
            .to_json()
            .unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"event": "orders:subscription_succeeded", "data": {}, "channel": "orders"})
        );
    }
}
