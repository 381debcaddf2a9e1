//! # Tether Chats Crate
//!
//! Core of the real-time chat delivery subsystem.
//!
//! - **status**: forward-only `sent → delivered → read` transitions
//! - **services**: [`ChatService`] plus the notification sink it feeds
//! - **hub**: live connection registry, event queue, and broadcast loop
//! - **types**: error taxonomy shared by every entry point
//!
//! ```no_run
//! # async fn demo(pool: sqlx::SqlitePool) -> tether_chats::ChatResult<()> {
//! use std::sync::Arc;
//! use tether_chats::{ChatService, Hub};
//! use tether_config::HubConfig;
//!
//! let chat = Arc::new(ChatService::with_store_notifications(pool));
//! let (hub, _broadcast_task) = Hub::start(chat.clone(), &HubConfig::default());
//!
//! let conversation = chat.get_or_create_conversation(1, 2).await?;
//! hub.send_and_broadcast(conversation.id, 1, "hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod hub;
pub mod services;
pub mod status;
pub mod types;

pub use hub::{
    BroadcastEvent, BroadcastLoop, ConnectionHandle, ConnectionRegistry, DeliveryReport,
    EventDispatcher, EventKind, Hub,
};
pub use services::{ChatService, NewNotification, NotificationSink, StoreNotificationSink};
pub use status::StatusTransition;
pub use types::{ChatError, ChatResult, MAX_MESSAGE_CHARS};
