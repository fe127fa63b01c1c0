//! # Dispatch Gateway Crate
//!
//! The transport layer for the Dispatch chat backend: a WebSocket endpoint
//! for realtime clients and a thin REST facade mirroring the chat service
//! for everyone else. Both delegate to the same services; the gateway owns
//! no business rules of its own.
//!
//! - **REST**: HTTP endpoints for chats, messages, participants, and push
//!   subscriptions
//! - **WebSocket**: per-connection state machine with room fan-out
//! - **State**: shared services plus the process-local connection registry

pub mod error;
pub mod payloads;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;
pub use websocket::{ClientEvent, RealtimeState, ServerEvent};

use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .merge(rest::create_rest_routes())
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers(Any),
        )
}
