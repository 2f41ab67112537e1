//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use channelhub_cache::CacheManager;
use channelhub_core::config::CacheConfig;
use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;
use channelhub_core::traits::cache::CacheProvider;

use crate::auth::service::{AuthService, ChannelAuthRequest, IdentityRequest};
use crate::connection::handle::ConnectionHandle;
use crate::presence::member::ChannelAuth;

/// Creates a connection with a roomy outbound buffer.
pub fn connection(id: &str) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(ConnectionHandle::new(id, Vec::new(), tx)), rx)
}

/// Drains every queued frame as JSON.
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).expect("frame is JSON"));
    }
    frames
}

/// Event names of every queued frame.
pub fn drain_events(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .map(|f| f["event"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// In-memory cache manager.
pub async fn memory_cache() -> Arc<CacheManager> {
    Arc::new(
        CacheManager::new(&CacheConfig::default())
            .await
            .expect("memory cache"),
    )
}

#[derive(Debug, Clone)]
enum Outcome {
    Grant(ChannelAuth),
    Unavailable,
}

/// Authorization service answering from a script.
///
/// Channels without a script entry are refused. Identity tokens of the
/// form `token-<member>` resolve to `<member>`.
#[derive(Debug, Default)]
pub struct ScriptedAuthService {
    outcomes: Mutex<HashMap<String, Outcome>>,
    delay: Mutex<Option<Duration>>,
    channel_calls: AtomicUsize,
    identity_calls: AtomicUsize,
}

impl ScriptedAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, channel: &str, auth: ChannelAuth) {
        self.outcomes
            .lock()
            .insert(channel.to_string(), Outcome::Grant(auth));
    }

    pub fn fail_unavailable(&self, channel: &str) {
        self.outcomes
            .lock()
            .insert(channel.to_string(), Outcome::Unavailable);
    }

    /// Delays every channel authorization.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn channel_calls(&self) -> usize {
        self.channel_calls.load(Ordering::SeqCst)
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthService for ScriptedAuthService {
    async fn authorize_channel(&self, request: &ChannelAuthRequest) -> AppResult<ChannelAuth> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.outcomes.lock().get(&request.channel_name).cloned();
        match outcome {
            Some(Outcome::Grant(auth)) => Ok(auth),
            Some(Outcome::Unavailable) => Err(AppError::service_unavailable("scripted outage")),
            None => Err(AppError::authorization("scripted denial")),
        }
    }

    async fn identify(&self, request: &IdentityRequest) -> AppResult<Option<String>> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.token.strip_prefix("token-").map(str::to_owned))
    }
}

/// Cache whose every operation fails.
#[derive(Debug)]
pub struct FailingCache;

#[async_trait]
impl CacheProvider for FailingCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::cache("cache offline"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::cache("cache offline"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}
