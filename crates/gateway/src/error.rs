//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tether_auth::AuthError;
use tether_chats::ChatError;
use thiserror::Error;
use tracing::error;

use crate::rest::ErrorResponse;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Persistence(_) | GatewayError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error class reported in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "auth_error",
            GatewayError::AuthorizationFailed(_) => "forbidden",
            GatewayError::InvalidRequest(_) => "validation_error",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Persistence(_) => "persistence_error",
            GatewayError::InternalError(_) => "internal_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            ChatError::ConversationNotFound { id } => {
                GatewayError::NotFound(format!("conversation {id}"))
            }
            ChatError::Forbidden { reason } => GatewayError::AuthorizationFailed(reason),
            ChatError::Persistence(store_error) => {
                error!(error = %store_error, "persistence failure while serving request");
                GatewayError::Persistence("the request could not be completed".to_string())
            }
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenCreation(message) => GatewayError::InternalError(message),
            other => GatewayError::AuthenticationFailed(other.to_string()),
        }
    }
}
