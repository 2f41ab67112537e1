//! Route definitions for the ChannelHub HTTP surface.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    let ws_routes = Router::new()
        .route("/app", get(handlers::ws::ws_upgrade))
        .route("/ws", get(handlers::ws::ws_upgrade));

    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed));

    Router::new()
        .merge(ws_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use channelhub_cache::CacheManager;
    use channelhub_core::config::AppConfig;
    use channelhub_core::error::AppError;
    use channelhub_core::result::AppResult;
    use channelhub_realtime::RealtimeEngine;
    use channelhub_realtime::auth::service::{AuthService, ChannelAuthRequest, IdentityRequest};
    use channelhub_realtime::presence::ChannelAuth;

    use super::*;

    #[derive(Debug)]
    struct DenyAll;

    #[async_trait]
    impl AuthService for DenyAll {
        async fn authorize_channel(&self, _request: &ChannelAuthRequest) -> AppResult<ChannelAuth> {
            Err(AppError::authorization("denied"))
        }

        async fn identify(&self, _request: &IdentityRequest) -> AppResult<Option<String>> {
            Ok(None)
        }
    }

    async fn state() -> AppState {
        let config = Arc::new(AppConfig::default());
        let cache = Arc::new(CacheManager::new(&config.cache).await.unwrap());
        let engine = RealtimeEngine::new(
            &config.realtime,
            &config.auth,
            Arc::new(DenyAll),
            cache.clone(),
        );
        AppState::new(config, cache, engine)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(build_router(state().await), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_health_detailed() {
        let (status, body) = get_json(build_router(state().await), "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cache"], "connected");
        assert_eq!(body["data"]["connections"], 0);
        assert_eq!(body["data"]["metrics"]["messages_sent"], 0);
    }
}
