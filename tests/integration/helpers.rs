//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use channelhub_api::{AppState, build_router};
use channelhub_cache::CacheManager;
use channelhub_core::config::AppConfig;
use channelhub_realtime::RealtimeEngine;
use channelhub_realtime::auth::HttpAuthService;
use channelhub_realtime::bridge::MemoryBus;
use channelhub_realtime::server::BusHandle;

/// How long to wait for a frame that should arrive.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before deciding a frame is not coming.
const SILENCE: Duration = Duration::from_millis(300);

/// Test application context
pub struct TestApp {
    /// Address the gateway listens on
    pub addr: SocketAddr,
    /// Stand-in for the application's authorization endpoints
    pub auth_server: MockServer,
    /// Publisher into the in-memory bus
    pub bus: MemoryBus,
    /// Running engine
    pub engine: RealtimeEngine,
    _bus_handle: BusHandle,
}

impl TestApp {
    /// Start a gateway on an ephemeral port, backed by a mock
    /// authorization service that knows members `u1` and `u2`.
    pub async fn new() -> Self {
        let auth_server = MockServer::start().await;
        mount_auth_service(&auth_server).await;

        let mut config = AppConfig::default();
        config.auth.base_url = auth_server.uri();
        config.bus.provider = "memory".to_string();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        let config = Arc::new(config);

        let cache = Arc::new(
            CacheManager::new(&config.cache)
                .await
                .expect("Failed to init cache"),
        );
        let service = Arc::new(HttpAuthService::new(&config.auth).expect("auth client"));
        let engine = RealtimeEngine::new(&config.realtime, &config.auth, service, cache.clone());
        let bus_handle = engine.start_bus(&config.bus).expect("bus");
        let bus = bus_handle.memory.clone().expect("memory bus");

        let app = build_router(AppState::new(config, cache, engine.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server");
        });

        Self {
            addr,
            auth_server,
            bus,
            engine,
            _bus_handle: bus_handle,
        }
    }

    /// Open a client connection and return it with its socket ID.
    pub async fn connect(&self) -> TestClient {
        let (stream, _) = connect_async(format!("ws://{}/app", self.addr))
            .await
            .expect("connect");
        let mut client = TestClient {
            stream,
            socket_id: String::new(),
        };
        let established = client.next_frame().await;
        assert_eq!(established["event"], "connection:established");
        client.socket_id = established["data"]["socket_id"]
            .as_str()
            .expect("socket id")
            .to_string();
        client
    }

    /// Open a connection bound to `member` (`u1` or `u2`).
    pub async fn connect_as(&self, member: &str) -> TestClient {
        let mut client = self.connect().await;
        client
            .send(json!({"event": "identity:bind", "data": {"token": format!("token-{member}")}}))
            .await;
        client
    }

    /// Number of requests the mock authorization service received on `route`.
    pub async fn auth_requests(&self, route: &str) -> usize {
        self.auth_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == route)
            .count()
    }

    /// Wait until the engine has `count` open connections.
    pub async fn wait_for_connections(&self, count: usize) {
        for _ in 0..100 {
            if self.engine.connections.connection_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} connections");
    }
}

async fn mount_auth_service(server: &MockServer) {
    for member in ["u1", "u2"] {
        Mock::given(method("POST"))
            .and(path("/broadcasting/socket"))
            .and(body_partial_json(json!({"token": format!("token-{member}")})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": member})))
            .mount(server)
            .await;

        for channel in ["presence-room", "private-orders"] {
            Mock::given(method("POST"))
                .and(path("/broadcasting/auth"))
                .and(body_partial_json(json!({
                    "channel_name": channel,
                    "token": format!("token-{member}")
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "status": "success",
                    "user_id": member,
                    "user_info": {"name": member.to_uppercase()}
                })))
                .mount(server)
                .await;
        }
    }

    // Everything else is refused.
    Mock::given(method("POST"))
        .and(path("/broadcasting/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error"})))
        .with_priority(10)
        .mount(server)
        .await;
}

/// A WebSocket client
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Connection ID announced by the gateway
    pub socket_id: String,
}

impl TestClient {
    /// Send a JSON frame
    pub async fn send(&mut self, frame: Value) {
        self.stream
            .send(Message::text(frame.to_string()))
            .await
            .expect("send");
    }

    /// Subscribe and wait for the confirmation
    pub async fn subscribe(&mut self, channel: &str) {
        self.send(json!({"event": "subscribe", "channel": channel}))
            .await;
        let frame = self.next_frame().await;
        assert_eq!(frame["event"], format!("{channel}:subscription_succeeded"));
    }

    /// Next text frame as JSON
    pub async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(FRAME_TIMEOUT, self.read_frame())
            .await
            .expect("timed out waiting for frame")
    }

    /// Asserts nothing arrives for a short while
    pub async fn expect_silence(&mut self) {
        if let Ok(frame) = tokio::time::timeout(SILENCE, self.read_frame()).await {
            panic!("unexpected frame: {frame}");
        }
    }

    /// Close the connection
    pub async fn close(mut self) {
        self.stream.close(None).await.expect("close");
    }

    async fn read_frame(&mut self) -> Value {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("JSON frame");
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    }
}
