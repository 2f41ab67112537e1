//! # channelhub-realtime
//!
//! Channel broadcast engine for ChannelHub. Provides:
//!
//! - Connection lifecycle management and identity binding
//! - An in-memory channel registry with public, private, and presence channels
//! - Cached channel authorization against an external HTTP service
//! - The subscribe/leave/disconnect state machine with presence roster events
//! - Fan-out of backend bus messages to subscribed connections
//! - Redis pattern-subscription and in-process bus adapters

pub mod auth;
pub mod bridge;
pub mod channel;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::fanout::FanoutEngine;
pub use channel::coordinator::SubscriptionCoordinator;
pub use channel::registry::ChannelRegistry;
pub use connection::manager::ConnectionManager;
pub use server::RealtimeEngine;
