//! Repository for notification data access operations.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use tracing::info;

use super::decode;
use crate::entities::{CreateNotificationRequest, Notification, NotificationKind};
use crate::types::{format_timestamp, parse_timestamp, StoreError, StoreResult};

/// Repository for notification database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateNotificationRequest) -> StoreResult<Notification> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, actor_id, kind, ref_id, message, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(request.user_id)
        .bind(request.actor_id)
        .bind(request.kind.as_str())
        .bind(request.ref_id)
        .bind(&request.message)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            notification_id = id,
            user_id = request.user_id,
            kind = %request.kind,
            "created notification"
        );

        let row = sqlx::query(
            "SELECT id, user_id, actor_id, kind, ref_id, message, is_read, created_at
             FROM notifications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(map_notification)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(format!("notification {id}")))
    }
}

fn map_notification(row: &SqliteRow) -> StoreResult<Notification> {
    let kind: String = decode(row, "kind")?;
    let created_at: String = decode(row, "created_at")?;

    Ok(Notification {
        id: decode(row, "id")?,
        user_id: decode(row, "user_id")?,
        actor_id: decode(row, "actor_id")?,
        kind: kind.parse::<NotificationKind>().map_err(StoreError::Decode)?,
        ref_id: decode(row, "ref_id")?,
        message: decode(row, "message")?,
        is_read: decode(row, "is_read")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
