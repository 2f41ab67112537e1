//! Integration tests driving the gateway over real WebSocket connections.

mod gateway_test;
mod helpers;
