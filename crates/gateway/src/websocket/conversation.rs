//! Live channel scoped to one conversation.
//!
//! Inbound text frames are `{"content": "..."}` or `{"type": "read"}`; outbound
//! frames are serialized broadcast events. Malformed inbound frames are dropped
//! without a reply.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tether_database::{ConversationId, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::AuthenticatedUser;
use crate::rest::parse_id;
use crate::state::GatewayState;

/// Authorize, then upgrade. Unknown conversations and outsiders are refused
/// with a regular HTTP error before any socket exists.
pub async fn conversation_socket_handler(
    Path(conversation_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    ws: Option<WebSocketUpgrade>,
) -> GatewayResult<Response> {
    let conversation_id = parse_id(&conversation_id, "conversation id")?;
    state.chat_service.authorize(conversation_id, user_id).await?;

    let ws = ws.ok_or_else(|| {
        GatewayError::InvalidRequest("expected a WebSocket upgrade request".to_string())
    })?;

    Ok(ws.on_upgrade(move |socket| run_session(socket, state, conversation_id, user_id)))
}

async fn run_session(
    socket: WebSocket,
    state: Arc<GatewayState>,
    conversation_id: ConversationId,
    user_id: UserId,
) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(state.connection_buffer);

    let handle = match state.hub.register(conversation_id, user_id, outbound_tx).await {
        Ok(handle) => handle,
        Err(error) => {
            warn!(
                conversation_id,
                user_id,
                kind = error.kind(),
                error = %error,
                "websocket registration refused"
            );
            let _ = sink.close().await;
            return;
        }
    };
    info!(
        connection_id = handle.id,
        conversation_id, user_id, "websocket connected"
    );

    // Ends when the registry lets go of the connection or the peer stops accepting writes.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(WsMessage::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let hub = state.hub.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                WsMessage::Text(text) => {
                    if let Err(error) = hub.handle_inbound_frame(&handle, &text).await {
                        warn!(
                            connection_id = handle.id,
                            conversation_id = handle.conversation_id,
                            kind = error.kind(),
                            error = %error,
                            "inbound frame rejected"
                        );
                    }
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => {
            debug!(connection_id = handle.id, "writer finished first");
            reader.abort();
        }
        _ = &mut reader => {
            debug!(connection_id = handle.id, "reader finished first");
            writer.abort();
        }
    }

    state.hub.unregister(&handle).await;
    info!(
        connection_id = handle.id,
        conversation_id, user_id, "websocket disconnected"
    );
}
