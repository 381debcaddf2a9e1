//! WebSocket endpoints for the gateway

pub mod conversation;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::GatewayState;

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new().route(
        "/ws/conversations/:id",
        get(conversation::conversation_socket_handler),
    )
}

pub use conversation::*;
