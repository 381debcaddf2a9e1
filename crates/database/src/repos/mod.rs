//! Database repository implementations

pub mod conversation_repository;
pub mod message_repository;
pub mod notification_repository;

pub use conversation_repository::*;
pub use message_repository::*;
pub use notification_repository::*;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::types::{StoreError, StoreResult};

/// Read a column, reporting type mismatches as decode errors.
pub(crate) fn decode<T>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}
