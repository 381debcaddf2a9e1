//! Business logic services for conversations and messages.

pub mod chat_service;
pub mod notification;

pub use chat_service::ChatService;
pub use notification::{NewNotification, NotificationSink, StoreNotificationSink};
