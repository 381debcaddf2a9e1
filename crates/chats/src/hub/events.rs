//! Events fanned out to live connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_database::{ConversationId, Message, MessageId, MessageStatus, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    StatusUpdate,
}

/// Outbound frame, serialized once per event and written to every connection
/// registered on `conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub conversation_id: ConversationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Author of the message, or the participant whose activity changed the status.
    pub sender_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    pub timestamp: DateTime<Utc>,
}

impl BroadcastEvent {
    pub fn new_message(message: &Message) -> Self {
        Self {
            kind: EventKind::Message,
            conversation_id: message.conversation_id,
            message_id: Some(message.id),
            sender_id: message.sender_id,
            content: Some(message.content.clone()),
            status: Some(message.status),
            timestamp: message.created_at,
        }
    }

    pub fn status_update(
        conversation_id: ConversationId,
        actor_id: UserId,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::StatusUpdate,
            conversation_id,
            message_id: None,
            sender_id: actor_id,
            content: None,
            status: Some(status),
            timestamp: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_event_wire_shape() {
        let created_at = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let message = Message {
            id: 11,
            conversation_id: 4,
            sender_id: 1,
            content: "hello".into(),
            status: MessageStatus::Sent,
            read_at: None,
            created_at,
        };

        let value = serde_json::to_value(BroadcastEvent::new_message(&message)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "message",
                "conversationId": 4,
                "messageId": 11,
                "senderId": 1,
                "content": "hello",
                "status": "sent",
                "timestamp": "2024-06-01T12:00:00Z",
            })
        );
    }

    #[test]
    fn status_update_omits_message_fields() {
        let event = BroadcastEvent::status_update(4, 2, MessageStatus::Read, Utc::now());
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "status_update");
        assert_eq!(value["status"], "read");
        assert_eq!(value["senderId"], 2);
        assert!(value.get("messageId").is_none());
        assert!(value.get("content").is_none());
    }
}
