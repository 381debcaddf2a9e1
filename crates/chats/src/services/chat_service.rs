//! Chat service: conversations, messages, and status transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tether_database::{
    Conversation, ConversationId, ConversationRepository, ConversationWithLastMessage,
    CreateMessageRequest, Message, MessageRepository, ParticipantPair, StoreError, UserId,
};
use tracing::{debug, info, warn};

use crate::services::notification::{NewNotification, NotificationSink, StoreNotificationSink};
use crate::status::StatusTransition;
use crate::types::{ChatError, ChatResult, MAX_MESSAGE_CHARS};

/// Service for conversation and message operations.
///
/// Never touches live connections; fan-out is the hub's job.
#[derive(Clone)]
pub struct ChatService {
    conversations: ConversationRepository,
    messages: MessageRepository,
    notifier: Arc<dyn NotificationSink>,
}

impl ChatService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
            notifier,
        }
    }

    /// Service whose notifications land in the `notifications` table of the same database.
    pub fn with_store_notifications(pool: SqlitePool) -> Self {
        let notifier = Arc::new(StoreNotificationSink::new(pool.clone()));
        Self::new(pool, notifier)
    }

    /// Return the conversation between `user_a` and `user_b`, creating it on first contact.
    ///
    /// Argument order does not matter. Concurrent callers for the same pair all get
    /// the same row: the loser of the insert race re-reads the winner's conversation.
    pub async fn get_or_create_conversation(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> ChatResult<Conversation> {
        if user_a <= 0 || user_b <= 0 {
            return Err(ChatError::validation("user ids must be positive"));
        }
        let pair = ParticipantPair::new(user_a, user_b)
            .ok_or_else(|| ChatError::validation("cannot start a conversation with yourself"))?;

        if let Some(existing) = self.conversations.find_by_pair(pair).await? {
            return Ok(existing);
        }

        match self.conversations.insert_pair(pair).await {
            Ok(created) => Ok(created),
            Err(StoreError::UniqueViolation(_)) => {
                debug!(
                    user_low = pair.low(),
                    user_high = pair.high(),
                    "conversation created concurrently, re-reading"
                );
                self.conversations.find_by_pair(pair).await?.ok_or_else(|| {
                    ChatError::Persistence(StoreError::NotFound(format!(
                        "conversation for users {} and {}",
                        pair.low(),
                        pair.high()
                    )))
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Conversations `user_id` takes part in, each with its most recent message.
    pub async fn list_conversations(&self, user_id: UserId) -> ChatResult<Vec<ConversationWithLastMessage>> {
        Ok(self.conversations.list_for_user(user_id).await?)
    }

    pub async fn get_conversation(&self, conversation_id: ConversationId) -> ChatResult<Conversation> {
        self.conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))
    }

    /// Check that `user_id` participates in the conversation.
    pub async fn authorize(&self, conversation_id: ConversationId, user_id: UserId) -> ChatResult<Conversation> {
        let conversation = self.get_conversation(conversation_id).await?;
        if !conversation.includes(user_id) {
            return Err(ChatError::forbidden(format!(
                "user {user_id} is not a participant of conversation {conversation_id}"
            )));
        }
        Ok(conversation)
    }

    /// Messages of a conversation, oldest first.
    pub async fn list_messages(&self, conversation_id: ConversationId) -> ChatResult<Vec<Message>> {
        Ok(self.messages.list_by_conversation(conversation_id).await?)
    }

    /// Persist a message as `sent` and notify the other participant.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
    ) -> ChatResult<Message> {
        validate_content(content)?;

        let conversation = self.get_conversation(conversation_id).await?;
        let recipient_id = conversation.other_participant(sender_id).ok_or_else(|| {
            ChatError::forbidden(format!(
                "user {sender_id} cannot send to conversation {conversation_id}"
            ))
        })?;

        let message = self
            .messages
            .insert(&CreateMessageRequest {
                conversation_id,
                sender_id,
                content: content.to_string(),
            })
            .await?;

        info!(
            message_id = message.id,
            conversation_id,
            sender_id,
            "message sent"
        );

        let notification = NewNotification::new_message(recipient_id, sender_id, message.id);
        if let Err(error) = self.notifier.notify(notification).await {
            warn!(
                message_id = message.id,
                recipient_id,
                error = %error,
                "failed to record new message notification"
            );
        }

        Ok(message)
    }

    /// Mark everything the other participant sent and `viewer_id` has not yet
    /// received as `delivered`. Returns how many messages changed.
    ///
    /// Like [`ChatService::mark_read`], fails with `ConversationNotFound` or `Forbidden`
    /// unless `viewer_id` participates in the conversation.
    pub async fn mark_delivered(&self, conversation_id: ConversationId, viewer_id: UserId) -> ChatResult<u64> {
        self.transition(conversation_id, viewer_id, StatusTransition::Deliver)
            .await
    }

    /// Mark everything the other participant sent as `read` at `at`.
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
        at: DateTime<Utc>,
    ) -> ChatResult<u64> {
        self.transition(conversation_id, viewer_id, StatusTransition::Read { at })
            .await
    }

    async fn transition(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
        transition: StatusTransition,
    ) -> ChatResult<u64> {
        self.authorize(conversation_id, viewer_id).await?;

        let updated = self
            .messages
            .advance_status(
                conversation_id,
                viewer_id,
                transition.sources(),
                transition.target(),
                transition.read_at(),
            )
            .await?;

        if updated > 0 {
            info!(
                conversation_id,
                viewer_id,
                status = %transition.target(),
                updated,
                "message status advanced"
            );
        }
        Ok(updated)
    }
}

fn validate_content(content: &str) -> ChatResult<()> {
    if content.trim().is_empty() {
        return Err(ChatError::validation("message content must not be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::validation(format!(
            "message content exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}
