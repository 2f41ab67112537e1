//! Top-level gateway engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use channelhub_cache::CacheManager;
use channelhub_core::config::{AuthConfig, BusConfig, RealtimeConfig};
use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;

use crate::auth::authorizer::ChannelAuthorizer;
use crate::auth::service::AuthService;
use crate::bridge::fanout::FanoutEngine;
use crate::bridge::memory_pubsub::MemoryBus;
use crate::channel::coordinator::SubscriptionCoordinator;
use crate::channel::registry::ChannelRegistry;
use crate::connection::authenticator::IdentityBinder;
use crate::connection::manager::ConnectionManager;
use crate::metrics::EngineMetrics;

/// Running bus tasks.
#[derive(Debug)]
pub struct BusHandle {
    /// In-process publisher, when the memory bus is configured.
    pub memory: Option<MemoryBus>,
    /// Fan-out engine and adapter tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl BusHandle {
    /// Waits for every bus task to finish.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Bus task failed");
            }
        }
    }
}

/// Central gateway engine that coordinates all subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Channel registry.
    pub channels: Arc<ChannelRegistry>,
    /// Subscription coordinator.
    pub coordinator: Arc<SubscriptionCoordinator>,
    /// Bus fan-out engine.
    pub fanout: Arc<FanoutEngine>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Shutdown signal.
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new engine with all subsystems.
    pub fn new(
        config: &RealtimeConfig,
        auth: &AuthConfig,
        service: Arc<dyn AuthService>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let channels = Arc::new(ChannelRegistry::new());
        let authorizer = ChannelAuthorizer::new(
            service.clone(),
            cache,
            Duration::from_secs(auth.cache_ttl_seconds),
            metrics.clone(),
        );
        let coordinator = Arc::new(SubscriptionCoordinator::new(
            channels.clone(),
            authorizer,
            metrics.clone(),
            config,
        ));
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            coordinator.clone(),
            IdentityBinder::new(service),
            metrics.clone(),
        ));
        let fanout = Arc::new(FanoutEngine::new(channels.clone(), metrics.clone()));

        info!("Gateway engine initialized");

        Self {
            connections,
            channels,
            coordinator,
            fanout,
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    /// Starts the fan-out engine and the configured bus adapter.
    pub fn start_bus(&self, config: &BusConfig) -> AppResult<BusHandle> {
        let (tx, rx) = mpsc::channel(config.buffer_size);
        let mut tasks = vec![tokio::spawn(
            self.fanout.clone().run(rx, self.shutdown.clone()),
        )];

        let memory = match config.provider.as_str() {
            #[cfg(feature = "redis-pubsub")]
            "redis" => {
                let bus = crate::bridge::redis_pubsub::RedisBus::new(config);
                tasks.push(tokio::spawn(bus.run(tx, self.shutdown.clone())));
                None
            }
            "memory" => Some(MemoryBus::new(tx)),
            other => {
                self.shutdown.cancel();
                return Err(AppError::configuration(format!(
                    "Unknown bus provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        info!(provider = %config.provider, pattern = %config.pattern, "Bus started");
        Ok(BusHandle { memory, tasks })
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Initiates a graceful shutdown: stops the bus and closes every
    /// connection.
    pub fn shutdown(&self) {
        info!("Shutting down gateway engine");
        self.shutdown.cancel();
        self.connections.close_all();
        info!("Gateway engine shut down");
    }
}
