//! Tether database crate
//!
//! SQLite persistence for conversations, messages, and notifications:
//! connection management, migrations, and one repository per table.

use sqlx::SqlitePool;
use tether_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{ConversationRepository, MessageRepository, NotificationRepository};

pub use entities::{
    Conversation, ConversationWithLastMessage, CreateMessageRequest, CreateNotificationRequest,
    Message, MessageStatus, Notification, NotificationKind, ParticipantPair,
};

pub use types::{
    format_timestamp, parse_timestamp, ConversationId, MessageId, NotificationId, StoreError,
    StoreResult, UserId,
};

pub use sqlx::Pool;

/// Open the configured database and bring its schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> StoreResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| StoreError::Connection(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| StoreError::Migration(format!("{e:#}")))?;

    Ok(pool)
}
