//! Repository for conversation data access operations.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use tracing::info;

use super::decode;
use crate::entities::{Conversation, ConversationWithLastMessage, Message, MessageStatus, ParticipantPair};
use crate::types::{format_timestamp, parse_timestamp, ConversationId, StoreError, StoreResult, UserId};

/// Repository for conversation database operations
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: ConversationId) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, created_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_conversation).transpose()
    }

    pub async fn find_by_pair(&self, pair: ParticipantPair) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, user_low, user_high, created_at FROM conversations
             WHERE user_low = ? AND user_high = ?",
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_conversation).transpose()
    }

    /// Insert a new conversation for `pair`.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when the pair already has one;
    /// callers racing on first contact re-read with [`Self::find_by_pair`].
    pub async fn insert_pair(&self, pair: ParticipantPair) -> StoreResult<Conversation> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO conversations (user_low, user_high, created_at) VALUES (?, ?, ?)",
        )
        .bind(pair.low())
        .bind(pair.high())
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            conversation_id = id,
            user_low = pair.low(),
            user_high = pair.high(),
            "created conversation"
        );

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("conversation {id}")))
    }

    /// Every conversation `user_id` takes part in, most recent activity first.
    pub async fn list_for_user(&self, user_id: UserId) -> StoreResult<Vec<ConversationWithLastMessage>> {
        let rows = sqlx::query(
            "SELECT c.id, c.user_low, c.user_high, c.created_at,
                    m.id AS m_id, m.sender_id AS m_sender_id, m.content AS m_content,
                    m.status AS m_status, m.read_at AS m_read_at, m.created_at AS m_created_at
             FROM conversations c
             LEFT JOIN messages m ON m.id = (
                 SELECT id FROM messages
                 WHERE conversation_id = c.id
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1
             )
             WHERE c.user_low = ? OR c.user_high = ?
             ORDER BY COALESCE(m.created_at, c.created_at) DESC, c.id DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let conversation = map_conversation(row)?;
                let last_message = map_last_message(row, conversation.id)?;
                Ok(ConversationWithLastMessage {
                    conversation,
                    last_message,
                })
            })
            .collect()
    }
}

fn map_conversation(row: &SqliteRow) -> StoreResult<Conversation> {
    let created_at: String = decode(row, "created_at")?;
    Ok(Conversation {
        id: decode(row, "id")?,
        user_low: decode(row, "user_low")?,
        user_high: decode(row, "user_high")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn map_last_message(row: &SqliteRow, conversation_id: ConversationId) -> StoreResult<Option<Message>> {
    let Some(id) = decode::<Option<i64>>(row, "m_id")? else {
        return Ok(None);
    };

    let status: String = decode(row, "m_status")?;
    let read_at: Option<String> = decode(row, "m_read_at")?;
    let created_at: String = decode(row, "m_created_at")?;

    Ok(Some(Message {
        id,
        conversation_id,
        sender_id: decode(row, "m_sender_id")?,
        content: decode(row, "m_content")?,
        status: status.parse::<MessageStatus>().map_err(StoreError::Decode)?,
        read_at: read_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    }))
}
