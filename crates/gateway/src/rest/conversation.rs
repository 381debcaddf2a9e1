//! Conversation REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tether_database::{format_timestamp, Conversation, ConversationWithLastMessage, UserId};
use utoipa::ToSchema;

use crate::error::GatewayResult;
use crate::middleware::AuthenticatedUser;
use crate::rest::message::MessageResponse;
use crate::rest::{parse_id, ErrorResponse};
use crate::state::GatewayState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: i64,
    pub participants: Vec<i64>,
    /// The participant who is not the caller.
    pub other_user_id: i64,
    pub created_at: String,
    pub last_message: Option<MessageResponse>,
}

impl ConversationResponse {
    fn for_viewer(conversation: Conversation, last_message: Option<MessageResponse>, viewer: UserId) -> Self {
        let other_user_id = conversation
            .other_participant(viewer)
            .unwrap_or(conversation.user_high);
        Self {
            id: conversation.id,
            participants: vec![conversation.user_low, conversation.user_high],
            other_user_id,
            created_at: format_timestamp(&conversation.created_at),
            last_message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub success: bool,
    pub conversation_id: i64,
    pub status: String,
    /// Messages that changed to `read` with this call.
    pub updated: u64,
}

/// Create conversation routes
///
/// The path segment after `/api/conversations/` is always named `id`: a user id
/// for the POST, a conversation id everywhere else.
pub fn create_conversation_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/:id", post(open_conversation))
        .route("/api/conversations/:id/read", put(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "Conversations",
    responses(
        (status = 200, description = "Caller's conversations, most recent activity first", body = Vec<ConversationResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<Vec<ConversationResponse>>> {
    let conversations = state.chat_service.list_conversations(user_id).await?;

    Ok(Json(
        conversations
            .into_iter()
            .map(|ConversationWithLastMessage { conversation, last_message }| {
                ConversationResponse::for_viewer(
                    conversation,
                    last_message.map(MessageResponse::from),
                    user_id,
                )
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}",
    tag = "Conversations",
    params(("id" = i64, Path, description = "User id of the other participant")),
    responses(
        (status = 200, description = "Existing or newly created conversation", body = ConversationResponse),
        (status = 400, description = "Malformed id or conversation with yourself", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn open_conversation(
    Path(target): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<ConversationResponse>> {
    let target = parse_id(&target, "user id")?;
    let conversation = state
        .chat_service
        .get_or_create_conversation(user_id, target)
        .await?;

    Ok(Json(ConversationResponse::for_viewer(conversation, None, user_id)))
}

#[utoipa::path(
    put,
    path = "/api/conversations/{id}/read",
    tag = "Conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Other participant's messages marked read", body = MarkReadResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
pub async fn mark_read(
    Path(conversation_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> GatewayResult<Json<MarkReadResponse>> {
    let conversation_id = parse_id(&conversation_id, "conversation id")?;
    state.chat_service.authorize(conversation_id, user_id).await?;

    let updated = state
        .hub
        .mark_and_broadcast_read(conversation_id, user_id, Utc::now())
        .await?;

    Ok(Json(MarkReadResponse {
        success: true,
        conversation_id,
        status: "read".to_string(),
        updated,
    }))
}
