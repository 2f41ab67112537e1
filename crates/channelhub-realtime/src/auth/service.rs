//! Seam to the external authorization service.

use async_trait::async_trait;
use serde::Serialize;

use channelhub_core::result::AppResult;

use crate::presence::member::ChannelAuth;

/// Request to authorize one connection for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAuthRequest {
    /// Channel being subscribed to.
    pub channel_name: String,
    /// Requesting connection.
    pub socket_id: String,
    /// Identity token last presented on the connection.
    pub token: Option<String>,
    /// Request headers captured at connect time.
    #[serde(skip)]
    pub headers: Vec<(String, String)>,
}

/// Request to resolve an identity token to a member ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityRequest {
    /// Connection presenting the token.
    pub socket_id: String,
    /// Opaque identity token.
    pub token: String,
    /// Request headers captured at connect time.
    #[serde(skip)]
    pub headers: Vec<(String, String)>,
}

/// External service that owns identities and channel permissions.
///
/// Implementations map a refusal to an `Authorization` error and an
/// unreachable or failing service to `ServiceUnavailable` or
/// `ExternalService`.
#[async_trait]
pub trait AuthService: Send + Sync + std::fmt::Debug + 'static {
    /// Authorizes a connection for a channel and returns the payload that
    /// identifies the member on it.
    async fn authorize_channel(&self, request: &ChannelAuthRequest) -> AppResult<ChannelAuth>;

    /// Resolves an identity token. `None` means the token is not tied to
    /// any member.
    async fn identify(&self, request: &IdentityRequest) -> AppResult<Option<String>>;
}
