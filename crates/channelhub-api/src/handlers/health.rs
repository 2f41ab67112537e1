//! Health check handlers.

use axum::Json;
use axum::extract::State;

use channelhub_core::traits::cache::CacheProvider;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

fn engine_status(state: &AppState) -> &'static str {
    if state.realtime.is_shutting_down() {
        "shutting_down"
    } else {
        "ok"
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: engine_status(&state).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let cache_ok = match state.cache.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            false
        }
    };

    let status = match engine_status(&state) {
        "ok" if !cache_ok => "degraded",
        status => status,
    };

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        cache: if cache_ok { "connected" } else { "unavailable" }.to_string(),
        connections: state.realtime.connections.connection_count(),
        channels: state.realtime.channels.channel_count(),
        metrics: state.realtime.metrics.snapshot(),
    }))
}
