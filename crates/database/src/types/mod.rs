//! Shared types and result types for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, Utc};

pub use errors::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

pub type UserId = i64;
pub type ConversationId = i64;
pub type MessageId = i64;
pub type NotificationId = i64;

/// Render a timestamp the way every table stores it: fixed-width RFC 3339 in UTC,
/// so that lexical order on the column is chronological order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| StoreError::Decode(format!("invalid timestamp {raw:?}: {error}")))
}
