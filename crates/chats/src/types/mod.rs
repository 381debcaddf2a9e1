//! Shared types for the chat core.

pub mod errors;

pub use errors::{ChatError, ChatResult};

/// Longest message body accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;
