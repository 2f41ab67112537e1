//! Channel kinds, derived from the channel name prefix.

/// Name prefix of presence channels.
pub const PRESENCE_PREFIX: &str = "presence-";

/// Name prefix of private channels.
pub const PRIVATE_PREFIX: &str = "private-";

/// The kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Open to any connection, never authorized.
    Public,
    /// Requires authorization, no roster.
    Private,
    /// Requires authorization and publishes the member roster.
    Presence,
}

impl ChannelKind {
    /// Classifies a channel by its name.
    pub fn of(channel: &str) -> Self {
        if channel.starts_with(PRESENCE_PREFIX) {
            Self::Presence
        } else if channel.starts_with(PRIVATE_PREFIX) {
            Self::Private
        } else {
            Self::Public
        }
    }

    /// Whether subscribing requires the authorization service.
    pub fn requires_authorization(&self) -> bool {
        !matches!(self, Self::Public)
    }

    /// Whether roster changes are broadcast on this channel.
    pub fn is_presence(&self) -> bool {
        matches!(self, Self::Presence)
    }
}
