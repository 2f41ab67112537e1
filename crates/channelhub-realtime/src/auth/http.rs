//! HTTP adapter for the authorization service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use channelhub_core::config::AuthConfig;
use channelhub_core::error::{AppError, ErrorKind};
use channelhub_core::result::AppResult;

use super::service::{AuthService, ChannelAuthRequest, IdentityRequest};
use crate::presence::member::{ChannelAuth, id_from_value};

/// `status` value of a granted channel authorization.
const STATUS_SUCCESS: &str = "success";

/// Body of a channel authorization response.
#[derive(Debug, Deserialize)]
struct ChannelAuthResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    user_id: Value,
    #[serde(default)]
    user_info: Value,
}

/// Body of an identity response.
#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    user_id: Value,
}

/// Authorization service reached over HTTP.
///
/// Posts JSON to `{base_url}{auth_path}` and `{base_url}{socket_path}`,
/// forwarding the client's captured request headers.
#[derive(Debug, Clone)]
pub struct HttpAuthService {
    client: reqwest::Client,
    auth_url: String,
    socket_url: String,
}

impl HttpAuthService {
    /// Builds a client from configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to build authorization client: {e}"))
            })?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            auth_url: format!("{base}{}", config.auth_path),
            socket_url: format!("{base}{}", config.socket_path),
        })
    }

    async fn post<B: serde::Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
        headers: &[(String, String)],
    ) -> AppResult<reqwest::Response> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ServiceUnavailable,
                format!("Authorization service unreachable: {e}"),
                e,
            )
        })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::authorization(
                format!("Authorization service refused the request ({})", response.status()),
            )),
            status if status.is_server_error() => Err(AppError::service_unavailable(format!(
                "Authorization service failed ({status})"
            ))),
            status => Err(AppError::external_service(format!(
                "Unexpected authorization service response ({status})"
            ))),
        }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn authorize_channel(&self, request: &ChannelAuthRequest) -> AppResult<ChannelAuth> {
        let response = self
            .post(&self.auth_url, request, &request.headers)
            .await?;
        let body: ChannelAuthResponse = response.json().await.map_err(|e| {
            AppError::external_service(format!("Malformed authorization response: {e}"))
        })?;

        if body.status.as_deref() != Some(STATUS_SUCCESS) {
            debug!(
                channel = %request.channel_name,
                status = ?body.status,
                "Authorization service denied channel"
            );
            return Err(AppError::authorization(format!(
                "Access to '{}' denied",
                request.channel_name
            )));
        }

        let id = id_from_value(&body.user_id).ok_or_else(|| {
            AppError::external_service("Authorization response is missing user_id")
        })?;
        Ok(ChannelAuth::new(id, body.user_info))
    }

    async fn identify(&self, request: &IdentityRequest) -> AppResult<Option<String>> {
        let response = self
            .post(&self.socket_url, request, &request.headers)
            .await?;
        let body: IdentityResponse = response.json().await.map_err(|e| {
            AppError::external_service(format!("Malformed identity response: {e}"))
        })?;
        Ok(id_from_value(&body.user_id))
    }
}
