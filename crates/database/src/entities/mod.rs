//! Domain entities for the database layer

pub mod conversation;
pub mod message;
pub mod notification;

pub use conversation::{Conversation, ConversationWithLastMessage, ParticipantPair};
pub use message::{CreateMessageRequest, Message, MessageStatus};
pub use notification::{CreateNotificationRequest, Notification, NotificationKind};
