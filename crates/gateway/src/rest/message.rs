//! Message REST endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tether_database::{format_timestamp, Message};
use utoipa::ToSchema;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::{parse_id, ErrorResponse};
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    /// `sent`, `delivered`, or `read`.
    pub status: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            is_read: message.is_read(),
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            status: message.status.to_string(),
            read_at: message.read_at.as_ref().map(format_timestamp),
            created_at: format_timestamp(&message.created_at),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new().route(
        "/api/conversations/:id/messages",
        get(list_messages).post(send_message),
    )
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    tag = "Messages",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
pub async fn list_messages(
    Path(conversation_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let conversation_id = parse_id(&conversation_id, "conversation id")?;
    state.chat_service.authorize(conversation_id, user_id).await?;

    let messages = state.chat_service.list_messages(conversation_id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    tag = "Messages",
    params(("id" = i64, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = MessageResponse),
        (status = 400, description = "Empty or oversized content", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
pub async fn send_message(
    Path(conversation_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<MessageResponse>)> {
    let conversation_id = parse_id(&conversation_id, "conversation id")?;
    let Json(body) = body.map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;

    state.chat_service.authorize(conversation_id, user_id).await?;
    let message = state
        .hub
        .send_and_broadcast(conversation_id, user_id, &body.content)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
