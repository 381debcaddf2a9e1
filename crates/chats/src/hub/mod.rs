//! In-process hub: live connections per conversation and the broadcast loop
//! that fans events out to them.
//!
//! Producers (socket frames, REST calls, connects) persist through the
//! [`ChatService`] first and then enqueue a [`BroadcastEvent`]. A single
//! [`BroadcastLoop`] drains the queue in order, so events for one
//! conversation reach every connection in the order they were produced.

pub mod dispatcher;
pub mod events;
pub mod registry;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tether_config::HubConfig;
use tether_database::{ConversationId, Message, MessageStatus, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use dispatcher::{BroadcastLoop, DeliveryReport, EventDispatcher};
pub use events::{BroadcastEvent, EventKind};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

use crate::services::ChatService;
use crate::types::ChatResult;

/// Inbound socket frame: either `{"content": "..."}` or `{"type": "read"}`.
#[derive(Debug, Default, Deserialize)]
struct InboundFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct Hub {
    chat: Arc<ChatService>,
    registry: ConnectionRegistry,
    dispatcher: EventDispatcher,
}

impl Hub {
    /// Build a hub and the loop that must be driven for its events to go anywhere.
    pub fn new(chat: Arc<ChatService>, config: &HubConfig) -> (Self, BroadcastLoop) {
        let registry = ConnectionRegistry::new();
        let (dispatcher, events) = EventDispatcher::channel(config.event_queue_capacity);
        let broadcast = BroadcastLoop::new(registry.clone(), events);

        (
            Self {
                chat,
                registry,
                dispatcher,
            },
            broadcast,
        )
    }

    /// Build a hub and spawn its broadcast loop on the current runtime.
    pub fn start(chat: Arc<ChatService>, config: &HubConfig) -> (Self, JoinHandle<()>) {
        let (hub, broadcast) = Self::new(chat, config);
        let task = tokio::spawn(broadcast.run());
        (hub, task)
    }

    pub fn chat_service(&self) -> &Arc<ChatService> {
        &self.chat
    }

    /// Register a live connection. Messages the other participant sent that are
    /// still `sent` become `delivered`, and if any did, a status update goes out.
    ///
    /// Fails with `ConversationNotFound` or `Forbidden` before anything is registered.
    pub async fn register(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        outbound: mpsc::Sender<String>,
    ) -> ChatResult<ConnectionHandle> {
        self.chat.authorize(conversation_id, user_id).await?;
        let handle = self.registry.insert(conversation_id, user_id, outbound).await;

        match self.chat.mark_delivered(conversation_id, user_id).await {
            Ok(0) => {}
            Ok(_) => {
                let event = BroadcastEvent::status_update(
                    conversation_id,
                    user_id,
                    MessageStatus::Delivered,
                    Utc::now(),
                );
                self.dispatcher.dispatch(event).await;
            }
            Err(error) => {
                warn!(
                    connection_id = handle.id,
                    conversation_id,
                    user_id,
                    error = %error,
                    "failed to mark messages delivered on connect"
                );
            }
        }

        Ok(handle)
    }

    pub async fn unregister(&self, handle: &ConnectionHandle) {
        if self.registry.remove(handle).await {
            debug!(
                connection_id = handle.id,
                conversation_id = handle.conversation_id,
                user_id = handle.user_id,
                "connection unregistered"
            );
        }
    }

    /// Handle one text frame from a connection.
    ///
    /// Unparseable frames and frames without content are dropped and yield `Ok(None)`.
    /// A read acknowledgment also yields `Ok(None)`. Persistence failures are returned
    /// for the caller to log; the connection stays open either way.
    pub async fn handle_inbound_frame(&self, handle: &ConnectionHandle, raw: &str) -> ChatResult<Option<Message>> {
        let frame = match serde_json::from_str::<InboundFrame>(raw) {
            Ok(frame) => frame,
            Err(error) => {
                debug!(connection_id = handle.id, error = %error, "discarding malformed frame");
                return Ok(None);
            }
        };

        if frame.kind.as_deref() == Some("read") {
            self.mark_and_broadcast_read(handle.conversation_id, handle.user_id, Utc::now())
                .await?;
            return Ok(None);
        }

        let Some(content) = frame.content.filter(|content| !content.trim().is_empty()) else {
            debug!(connection_id = handle.id, "discarding frame without content");
            return Ok(None);
        };

        self.send_and_broadcast(handle.conversation_id, handle.user_id, &content)
            .await
            .map(Some)
    }

    /// Persist a message and enqueue it for every connection on the conversation.
    pub async fn send_and_broadcast(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
    ) -> ChatResult<Message> {
        let message = self.chat.send_message(conversation_id, sender_id, content).await?;
        self.dispatcher
            .dispatch(BroadcastEvent::new_message(&message))
            .await;
        Ok(message)
    }

    /// Mark the conversation read for `viewer_id` and always enqueue a status update,
    /// even when nothing changed.
    pub async fn mark_and_broadcast_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
        at: DateTime<Utc>,
    ) -> ChatResult<u64> {
        let updated = self.chat.mark_read(conversation_id, viewer_id, at).await?;
        self.dispatcher
            .dispatch(BroadcastEvent::status_update(
                conversation_id,
                viewer_id,
                MessageStatus::Read,
                at,
            ))
            .await;
        Ok(updated)
    }

    pub async fn connection_count(&self, conversation_id: ConversationId) -> usize {
        self.registry.connection_count(conversation_id).await
    }

    pub async fn total_connections(&self) -> usize {
        self.registry.total_connections().await
    }
}
