//! Notification side effects of chat activity.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tether_database::{CreateNotificationRequest, NotificationKind, NotificationRepository, UserId};

/// A notification the chat core wants recorded for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub actor_id: UserId,
    pub kind: NotificationKind,
    pub ref_id: Option<i64>,
    pub text: String,
}

impl NewNotification {
    pub fn new_message(recipient_id: UserId, sender_id: UserId, message_id: i64) -> Self {
        Self {
            recipient_id,
            actor_id: sender_id,
            kind: NotificationKind::Message,
            ref_id: Some(message_id),
            text: format!("New message from user {sender_id}"),
        }
    }
}

/// Fire-and-forget destination for notifications.
///
/// Callers log and drop failures; a sink error never undoes the write that triggered it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()>;
}

/// Sink that records notifications in the `notifications` table.
#[derive(Clone)]
pub struct StoreNotificationSink {
    repository: NotificationRepository,
}

impl StoreNotificationSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: NotificationRepository::new(pool),
        }
    }
}

#[async_trait]
impl NotificationSink for StoreNotificationSink {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()> {
        self.repository
            .create(&CreateNotificationRequest {
                user_id: notification.recipient_id,
                actor_id: notification.actor_id,
                kind: notification.kind,
                ref_id: notification.ref_id,
                message: notification.text,
            })
            .await?;
        Ok(())
    }
}
