//! Cache key builders for all ChannelHub cache entries.
//!
//! Backend-level prefixes (e.g. the Redis `key_prefix`) are applied by the
//! provider, so the builders here only produce the logical key.

/// Cache key for the authorization decision of one member on one channel.
pub fn channel_auth(channel: &str, member_id: &str) -> String {
    format!("{channel}:{member_id}")
}
