//! Identity and channel authorization.

pub mod authorizer;
pub mod http;
pub mod service;

pub use authorizer::ChannelAuthorizer;
pub use http::HttpAuthService;
pub use service::AuthService;
