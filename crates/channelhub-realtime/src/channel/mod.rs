//! Channels, the channel registry, and the subscription state machine.

pub mod channel;
pub mod coordinator;
pub mod registry;
pub mod types;

pub use coordinator::SubscriptionCoordinator;
pub use registry::ChannelRegistry;
pub use types::ChannelKind;
