//! Error types for the chat core.

use tether_database::{ConversationId, StoreError};
use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Typed failures returned across the chat service boundary.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: ConversationId },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conversation_not_found(id: ConversationId) -> Self {
        Self::ConversationNotFound { id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Stable label for the error class, used in structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Validation { .. } => "validation_error",
            ChatError::ConversationNotFound { .. } => "not_found",
            ChatError::Forbidden { .. } => "forbidden",
            ChatError::Persistence(_) => "persistence_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(ChatError::validation("empty").kind(), "validation_error");
        assert_eq!(ChatError::conversation_not_found(3).kind(), "not_found");
        assert_eq!(ChatError::forbidden("nope").kind(), "forbidden");
        assert_eq!(
            ChatError::from(StoreError::Decode("bad".into())).kind(),
            "persistence_error"
        );
    }
}
