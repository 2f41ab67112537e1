//! Pluggable backend traits.

pub mod cache;

pub use cache::CacheProvider;
