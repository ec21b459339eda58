//! Shared encode/decode helpers for SQLite ↔ domain type conversions.

use crate::persistence::{ConnectionStatus, PersistenceError};

/// Encode a `ConnectionStatus` into the `connections.status` TEXT column.
pub fn encode_status(status: ConnectionStatus) -> &'static str {
    status.as_str()
}

/// Decode the `connections.status` column. The schema's CHECK constraint
/// keeps the column within the known set.
pub fn decode_status(value: &str) -> Result<ConnectionStatus, PersistenceError> {
    value
        .parse()
        .map_err(|e: String| PersistenceError::Sqlx(sqlx::Error::Decode(e.into())))
}

/// Map a UNIQUE constraint violation to [`PersistenceError::Duplicate`],
/// passing every other error through.
pub fn unique_violation_as(entity: &'static str) -> impl Fn(sqlx::Error) -> PersistenceError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PersistenceError::Duplicate(entity)
        }
        _ => PersistenceError::Sqlx(err),
    }
}

/// Store empty optional text as NULL.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
