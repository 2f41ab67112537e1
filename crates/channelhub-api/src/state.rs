//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use channelhub_cache::CacheManager;
use channelhub_core::config::AppConfig;
use channelhub_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Cache manager (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// Gateway engine
    pub realtime: RealtimeEngine,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(config: Arc<AppConfig>, cache: Arc<CacheManager>, realtime: RealtimeEngine) -> Self {
        Self {
            config,
            cache,
            realtime,
            started_at: Instant::now(),
        }
    }
}
