//! Persistence layer: domain records, repository traits, and the SQLite
//! backend.

mod models;
pub mod sqlite;
pub mod traits;

pub use models::{
    Connection, ConnectionStatus, DeletedProfile, Link, NewLink, NewOptionProfile, NewProfile,
    NewUser, OptionProfile, Profile, User, UserCredentials,
};
pub use traits::Persistence;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Run a repository call under a deadline. Expiry is reported as
/// [`PersistenceError::Timeout`]; the call is not retried.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, PersistenceError>
where
    F: Future<Output = Result<T, PersistenceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(limit)),
    }
}

/// Current wall-clock time used for `created_at` / `updated_at` columns.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let fut = async { Ok::<_, PersistenceError>(7) };
        let result = with_timeout(Duration::from_secs(1), fut).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_reports_expiry() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, PersistenceError>(())
        })
        .await;
        assert!(
            matches!(result, Err(PersistenceError::Timeout(d)) if d == Duration::from_millis(50)),
            "expected Timeout, got {:?}",
            result
        );
    }
}
