//! Wire message types, builders, and validation.

pub mod builder;
pub mod types;
pub mod validator;

pub use types::{Envelope, InboundMessage};
