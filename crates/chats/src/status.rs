//! Message delivery status transitions.
//!
//! A message is created `sent` and only ever moves forward, driven by the
//! participant who did not send it: connecting marks everything `sent` as
//! `delivered`, acknowledging marks everything not yet `read` as `read`.

use chrono::{DateTime, Utc};
use tether_database::{Message, MessageStatus, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Deliver,
    Read { at: DateTime<Utc> },
}

impl StatusTransition {
    /// Statuses a message may be in for this transition to touch it.
    pub fn sources(&self) -> &'static [MessageStatus] {
        match self {
            StatusTransition::Deliver => &[MessageStatus::Sent],
            StatusTransition::Read { .. } => &[MessageStatus::Sent, MessageStatus::Delivered],
        }
    }

    pub fn target(&self) -> MessageStatus {
        match self {
            StatusTransition::Deliver => MessageStatus::Delivered,
            StatusTransition::Read { .. } => MessageStatus::Read,
        }
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StatusTransition::Deliver => None,
            StatusTransition::Read { at } => Some(*at),
        }
    }

    /// A viewer never transitions their own messages.
    ///
    /// `applies_to` and [`StatusTransition::apply`] are the per-message form of the
    /// bulk update the store runs with [`sources`](Self::sources) and
    /// [`target`](Self::target); both must select and change the same messages.
    pub fn applies_to(&self, message: &Message, viewer: UserId) -> bool {
        message.sender_id != viewer && self.sources().contains(&message.status)
    }

    /// Apply the transition in memory. Returns whether the message changed.
    pub fn apply(&self, message: &mut Message, viewer: UserId) -> bool {
        if !self.applies_to(message, viewer) {
            return false;
        }
        debug_assert!(message.status.can_advance_to(self.target()));

        message.status = self.target();
        if message.read_at.is_none() {
            message.read_at = self.read_at();
        }
        true
    }
}
