//! Conversation entity: a private channel between exactly two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Message;
use crate::types::{ConversationId, UserId};

/// Unordered pair of distinct users, stored low id first.
///
/// ```
/// use tether_database::ParticipantPair;
///
/// let pair = ParticipantPair::new(9, 4).unwrap();
/// assert_eq!(pair, ParticipantPair::new(4, 9).unwrap());
/// assert_eq!((pair.low(), pair.high()), (4, 9));
/// assert!(ParticipantPair::new(7, 7).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: UserId,
    high: UserId,
}

impl ParticipantPair {
    pub fn new(a: UserId, b: UserId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_low: UserId,
    pub user_high: UserId,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: UserId) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    /// The participant who is not `user_id`, or `None` if `user_id` is not a participant.
    pub fn other_participant(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.user_low {
            Some(self.user_high)
        } else if user_id == self.user_high {
            Some(self.user_low)
        } else {
            None
        }
    }
}

/// Conversation summary used by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationWithLastMessage {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
}

impl ConversationWithLastMessage {
    /// Timestamp used to order listings: the newest message, else the conversation itself.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|message| message.created_at)
            .unwrap_or(self.conversation.created_at)
    }
}
