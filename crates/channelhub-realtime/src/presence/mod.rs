//! Member identity and presence rosters.

pub mod member;
pub mod view;

pub use member::{ChannelAuth, Member};
pub use view::{PresenceEntry, PresenceView};
