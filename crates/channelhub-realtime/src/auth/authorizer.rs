//! Cached channel authorization.
//!
//! Decisions are cached per (channel, member) for the configured TTL.
//! Both grants and refusals are cached, so a refused member is not sent
//! back to the service until the entry expires. Cache failures never fail
//! a subscription; they only cost an extra service round-trip.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use channelhub_cache::{CacheManager, keys};
use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;
use channelhub_core::traits::cache::CacheProvider;

use super::service::{AuthService, ChannelAuthRequest};
use crate::channel::types::ChannelKind;
use crate::connection::handle::ConnectionHandle;
use crate::metrics::{EngineMetrics, auth as auth_metrics};
use crate::presence::member::ChannelAuth;

/// A cached authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CachedDecision {
    /// The member may subscribe; carries the service's payload.
    Granted {
        /// Authorization payload.
        auth: ChannelAuth,
    },
    /// The member was refused, or the service could not be reached.
    Denied,
}

/// Authorizes connections for private and presence channels.
#[derive(Debug, Clone)]
pub struct ChannelAuthorizer {
    service: Arc<dyn AuthService>,
    cache: Arc<CacheManager>,
    ttl: Duration,
    metrics: Arc<EngineMetrics>,
}

impl ChannelAuthorizer {
    /// Creates an authorizer caching decisions for `ttl`.
    pub fn new(
        service: Arc<dyn AuthService>,
        cache: Arc<CacheManager>,
        ttl: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            service,
            cache,
            ttl,
            metrics,
        }
    }

    /// Decides whether `conn` may subscribe to `channel`.
    ///
    /// Public channels resolve to `Ok(None)` without any I/O. For private
    /// and presence channels the connection must have a bound member; a
    /// grant is recorded on the member and returned.
    pub async fn authorize(
        &self,
        channel: &str,
        conn: &ConnectionHandle,
    ) -> AppResult<Option<ChannelAuth>> {
        if !ChannelKind::of(channel).requires_authorization() {
            return Ok(None);
        }

        let member_id = conn.member_id().ok_or_else(|| {
            AppError::authentication(format!("No member bound to connection {}", conn.id))
        })?;
        let key = keys::channel_auth(channel, &member_id);

        match self.lookup(&key).await {
            Some(CachedDecision::Granted { auth }) => {
                auth_metrics::record_cache_hit(&self.metrics);
                debug!(channel, member_id = %member_id, "Authorization cache hit (granted)");
                return self.record_grant(channel, conn, auth);
            }
            Some(CachedDecision::Denied) => {
                auth_metrics::record_cache_hit(&self.metrics);
                debug!(channel, member_id = %member_id, "Authorization cache hit (denied)");
                return Err(AppError::authorization(format!(
                    "Access to '{channel}' denied"
                )));
            }
            None => auth_metrics::record_cache_miss(&self.metrics),
        }

        let request = ChannelAuthRequest {
            channel_name: channel.to_string(),
            socket_id: conn.id.clone(),
            token: conn.token(),
            headers: conn.forwarded_headers.clone(),
        };

        match self.service.authorize_channel(&request).await {
            Ok(auth) => {
                self.store(&key, &CachedDecision::Granted { auth: auth.clone() })
                    .await;
                self.record_grant(channel, conn, auth)
            }
            Err(e) => {
                self.store(&key, &CachedDecision::Denied).await;
                Err(e)
            }
        }
    }

    fn record_grant(
        &self,
        channel: &str,
        conn: &ConnectionHandle,
        auth: ChannelAuth,
    ) -> AppResult<Option<ChannelAuth>> {
        if !conn.set_channel_auth(channel, auth.clone()) {
            return Err(AppError::transport(format!(
                "Connection {} closed during authorization",
                conn.id
            )));
        }
        Ok(Some(auth))
    }

    async fn lookup(&self, key: &str) -> Option<CachedDecision> {
        match self.cache.get_json::<CachedDecision>(key).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(key, error = %e, "Authorization cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &str, decision: &CachedDecision) {
        if let Err(e) = self.cache.set_json(key, decision, self.ttl).await {
            warn!(key, error = %e, "Authorization cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingCache, ScriptedAuthService, connection, memory_cache};
    use channelhub_core::error::ErrorKind;
    use serde_json::json;

    fn authorizer(service: Arc<ScriptedAuthService>, cache: Arc<CacheManager>) -> ChannelAuthorizer {
        ChannelAuthorizer::new(
            service,
            cache,
            Duration::from_secs(60),
            Arc::new(EngineMetrics::new()),
        )
    }

    #[tokio::test]
    async fn test_public_channel_needs_no_member() {
        let service = Arc::new(ScriptedAuthService::new());
        let auth = authorizer(service.clone(), memory_cache().await);
        let (conn, _rx) = connection("A");

        assert_eq!(auth.authorize("orders", &conn).await.unwrap(), None);
        assert_eq!(service.channel_calls(), 0);
    }

    #[tokio::test]
    async fn test_private_channel_without_member_fails() {
        let service = Arc::new(ScriptedAuthService::new());
        let auth = authorizer(service.clone(), memory_cache().await);
        let (conn, _rx) = connection("A");

        let err = auth.authorize("private-a", &conn).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(service.channel_calls(), 0);
    }

    #[tokio::test]
    async fn test_grant_is_cached_across_connections() {
        let service = Arc::new(ScriptedAuthService::new());
        service.grant("presence-room", ChannelAuth::new("u1", json!({"name": "Ada"})));
        let auth = authorizer(service.clone(), memory_cache().await);
        let (a, _rx_a) = connection("A");
        let (b, _rx_b) = connection("B");
        a.bind_member("u1");
        b.bind_member("u1");

        let first = auth.authorize("presence-room", &a).await.unwrap();
        let second = auth.authorize("presence-room", &b).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.channel_calls(), 1);
        assert!(b.channel_auth("presence-room").is_some());
    }

    #[tokio::test]
    async fn test_denial_is_cached() {
        let service = Arc::new(ScriptedAuthService::new());
        let auth = authorizer(service.clone(), memory_cache().await);
        let (conn, _rx) = connection("A");
        conn.bind_member("u1");

        for _ in 0..2 {
            let err = auth.authorize("private-a", &conn).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Authorization);
        }
        assert_eq!(service.channel_calls(), 1);
        assert_eq!(conn.channel_auth("private-a"), None);
    }

    #[tokio::test]
    async fn test_unavailable_service_is_cached_as_denial() {
        let service = Arc::new(ScriptedAuthService::new());
        service.fail_unavailable("private-a");
        let auth = authorizer(service.clone(), memory_cache().await);
        let (conn, _rx) = connection("A");
        conn.bind_member("u1");

        let err = auth.authorize("private-a", &conn).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
        let err = auth.authorize("private-a", &conn).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(service.channel_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_decision_goes_back_to_service() {
        let service = Arc::new(ScriptedAuthService::new());
        service.grant("private-a", ChannelAuth::new("u1", json!({})));
        let auth = ChannelAuthorizer::new(
            service.clone(),
            memory_cache().await,
            Duration::from_millis(50),
            Arc::new(EngineMetrics::new()),
        );
        let (conn, _rx) = connection("A");
        conn.bind_member("u1");

        auth.authorize("private-a", &conn).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        auth.authorize("private-a", &conn).await.unwrap();

        assert_eq!(service.channel_calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_failure_falls_through_to_service() {
        let service = Arc::new(ScriptedAuthService::new());
        service.grant("private-a", ChannelAuth::new("u1", json!({})));
        let cache = Arc::new(CacheManager::from_provider(Arc::new(FailingCache)));
        let auth = authorizer(service.clone(), cache);
        let (conn, _rx) = connection("A");
        conn.bind_member("u1");

        assert!(auth.authorize("private-a", &conn).await.unwrap().is_some());
        assert!(auth.authorize("private-a", &conn).await.unwrap().is_some());
        assert_eq!(service.channel_calls(), 2);
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_mutated() {
        let service = Arc::new(ScriptedAuthService::new());
        service.grant("private-a", ChannelAuth::new("u1", json!({})));
        let auth = authorizer(service.clone(), memory_cache().await);
        let (conn, _rx) = connection("A");
        conn.bind_member("u1");
        conn.close();

        let err = auth.authorize("private-a", &conn).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(conn.channel_auth("private-a"), None);
    }
}
