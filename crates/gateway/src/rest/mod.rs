//! REST API endpoints for the gateway

pub mod conversation;
pub mod health;
pub mod message;

use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error class: `validation_error`, `auth_error`, `forbidden`, `not_found`, `persistence_error`.
    pub error: String,
    pub message: String,
}

/// Create all authenticated REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(conversation::create_conversation_routes())
        .merge(message::create_message_routes())
}

/// Parse a numeric id from a path segment, answering 400 instead of axum's plain-text rejection.
pub(crate) fn parse_id(raw: &str, what: &str) -> GatewayResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(GatewayError::InvalidRequest(format!("invalid {what}: {raw}"))),
    }
}

pub use conversation::*;
pub use health::*;
pub use message::*;
