//! # channelhub-api
//!
//! HTTP layer for ChannelHub built on Axum.
//!
//! Provides the WebSocket upgrade endpoints that feed the gateway engine,
//! health endpoints, middleware (CORS, request logging), and error mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
