//! WebSocket upgrade handler.
//!
//! Each connection runs two tasks besides the read loop: one forwards
//! queued outbound frames to the socket, the other feeds inbound frames to
//! the connection manager one at a time, so a connection's requests are
//! handled in arrival order. Inbound frames wait in a bounded queue while
//! an authorization is pending; once that queue is full the read loop
//! waits for room before reading further.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use channelhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /app, GET /ws: WebSocket upgrade
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if state.realtime.is_shutting_down() {
        return Err(AppError::service_unavailable("Gateway is shutting down").into());
    }

    let captured = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, captured, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, headers: Vec<(String, String)>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let connections = state.realtime.connections.clone();
    let (handle, mut outbound_rx) = connections.register(headers);
    let conn_id = handle.id.clone();

    info!(conn_id = %conn_id, "WebSocket connection established");

    // Spawn outbound message forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Spawn the ordered inbound dispatcher
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(state.config.realtime.channel_buffer_size);
    let dispatch_task = {
        let connections = connections.clone();
        let conn_id = conn_id.clone();
        tokio::spawn(async move {
            while let Some(text) = inbound_rx.recv().await {
                connections.handle_inbound(&conn_id, &text).await;
            }
        })
    };

    loop {
        let result = tokio::select! {
            _ = handle.closed() => break,
            next = ws_rx.next() => match next {
                Some(result) => result,
                None => break,
            },
        };

        let text = match result {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    warn!(conn_id = %conn_id, "Dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        };

        if inbound_tx.send(text).await.is_err() {
            break;
        }
    }

    // Cleanup
    drop(inbound_tx);
    connections.unregister(&conn_id);
    dispatch_task.abort();
    outbound_task.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
