//! Repository for message data access operations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::decode;
use crate::entities::{CreateMessageRequest, Message, MessageStatus};
use crate::types::{
    format_timestamp, parse_timestamp, ConversationId, MessageId, StoreError, StoreResult, UserId,
};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, status, read_at, created_at";

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new message with status `sent`.
    pub async fn insert(&self, request: &CreateMessageRequest) -> StoreResult<Message> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, sender_id, content, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(request.conversation_id)
        .bind(request.sender_id)
        .bind(&request.content)
        .bind(MessageStatus::Sent.as_str())
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();
        info!(
            message_id,
            conversation_id = request.conversation_id,
            sender_id = request.sender_id,
            "created new message"
        );

        self.find_by_id(message_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))
    }

    pub async fn find_by_id(&self, id: MessageId) -> StoreResult<Option<Message>> {
        let row = sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_message).transpose()
    }

    /// All messages of a conversation, oldest first. Insertion order breaks timestamp ties.
    pub async fn list_by_conversation(&self, conversation_id: ConversationId) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_message).collect()
    }

    /// Move every message in the conversation that `viewer_id` did not send and whose
    /// status is in `from` to `to`, in one statement.
    ///
    /// `read_at` is only written where it is still empty. Returns the number of rows changed.
    pub async fn advance_status(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
        from: &[MessageStatus],
        to: MessageStatus,
        read_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        if from.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE messages SET status = ");
        builder.push_bind(to.as_str());
        builder.push(", read_at = COALESCE(read_at, ");
        builder.push_bind(read_at.as_ref().map(format_timestamp));
        builder.push(") WHERE conversation_id = ");
        builder.push_bind(conversation_id);
        builder.push(" AND sender_id != ");
        builder.push_bind(viewer_id);
        builder.push(" AND status IN (");
        let mut separated = builder.separated(", ");
        for status in from {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        let updated = result.rows_affected();

        debug!(
            conversation_id,
            viewer_id,
            to = %to,
            updated,
            "advanced message status"
        );
        Ok(updated)
    }
}

fn map_message(row: &SqliteRow) -> StoreResult<Message> {
    let status: String = decode(row, "status")?;
    let read_at: Option<String> = decode(row, "read_at")?;
    let created_at: String = decode(row, "created_at")?;

    Ok(Message {
        id: decode(row, "id")?,
        conversation_id: decode(row, "conversation_id")?,
        sender_id: decode(row, "sender_id")?,
        content: decode(row, "content")?,
        status: status.parse::<MessageStatus>().map_err(StoreError::Decode)?,
        read_at: read_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}
