//! SQLite-backed implementation of [`ConnectionRepository`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::helpers::{decode_status, encode_status, unique_violation_as};
use crate::persistence::traits::ConnectionRepository;
use crate::persistence::{now_timestamp, Connection, ConnectionStatus, PersistenceError};

const CONNECTION_COLUMNS: &str =
    "id, requester_profile_id, target_profile_id, status, created_at, updated_at";

pub struct SqliteConnectionRepository {
    pool: SqlitePool,
}

impl SqliteConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: i64,
    requester_profile_id: i64,
    target_profile_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConnectionRow {
    fn into_connection(self) -> Result<Connection, PersistenceError> {
        Ok(Connection {
            id: self.id,
            requester_profile_id: self.requester_profile_id,
            target_profile_id: self.target_profile_id,
            status: decode_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_connections(rows: Vec<ConnectionRow>) -> Result<Vec<Connection>, PersistenceError> {
    rows.into_iter()
        .map(ConnectionRow::into_connection)
        .collect()
}

impl ConnectionRepository for SqliteConnectionRepository {
    async fn create_connection(
        &self,
        requester_profile_id: i64,
        target_profile_id: i64,
    ) -> Result<Connection, PersistenceError> {
        let now = now_timestamp();
        let sql = format!(
            "INSERT INTO connections \
             (requester_profile_id, target_profile_id, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {CONNECTION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(requester_profile_id)
            .bind(target_profile_id)
            .bind(encode_status(ConnectionStatus::Pending))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation_as("connection"))?;

        row.into_connection()
    }

    async fn get_connection(&self, id: i64) -> Result<Option<Connection>, PersistenceError> {
        let sql = format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?");
        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ConnectionRow::into_connection).transpose()
    }

    async fn update_status(
        &self,
        id: i64,
        status: ConnectionStatus,
    ) -> Result<Option<Connection>, PersistenceError> {
        let sql = format!(
            "UPDATE connections SET status = ?, updated_at = ? WHERE id = ? \
             RETURNING {CONNECTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(encode_status(status))
            .bind(now_timestamp())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ConnectionRow::into_connection).transpose()
    }

    async fn list_connections(&self, profile_id: i64) -> Result<Vec<Connection>, PersistenceError> {
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections \
             WHERE requester_profile_id = ? OR target_profile_id = ? \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(profile_id)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;

        into_connections(rows)
    }

    async fn accepted_between(&self, a: i64, b: i64) -> Result<Vec<Connection>, PersistenceError> {
        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections \
             WHERE status = ? \
               AND ((requester_profile_id = ? AND target_profile_id = ?) \
                 OR (requester_profile_id = ? AND target_profile_id = ?))"
        );
        let rows = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(encode_status(ConnectionStatus::Accepted))
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .fetch_all(&self.pool)
            .await?;

        into_connections(rows)
    }

    async fn delete_connection(&self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    /// Three profiles owned by one user; returns their ids.
    async fn test_db() -> (Database, SqliteConnectionRepository, [i64; 3]) {
        let db = Database::new_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at) \
             VALUES (1, 'Kai', 'kai@example.com', 'h', '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let mut ids = [0; 3];
        for (i, id) in ids.iter_mut().enumerate() {
            let (new_id,): (i64,) = sqlx::query_as(
                "INSERT INTO profiles (user_id, display_name, created_at, updated_at) \
                 VALUES (1, ?, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z') RETURNING id",
            )
            .bind(format!("p{i}"))
            .fetch_one(db.pool())
            .await
            .unwrap();
            *id = new_id;
        }
        let repo = SqliteConnectionRepository::new(db.pool().clone());
        (db, repo, ids)
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let (_db, repo, [a, b, _]) = test_db().await;
        let conn = repo.create_connection(a, b).await.unwrap();
        assert_eq!(conn.status, ConnectionStatus::Pending);
        assert_eq!(conn.requester_profile_id, a);
        assert_eq!(conn.target_profile_id, b);
        assert_eq!(repo.get_connection(conn.id).await.unwrap().unwrap(), conn);
    }

    #[tokio::test]
    async fn test_duplicate_ordered_pair_rejected_by_constraint() {
        let (db, repo, [a, b, _]) = test_db().await;
        repo.create_connection(a, b).await.unwrap();

        let result = repo.create_connection(a, b).await;
        assert!(
            matches!(result, Err(PersistenceError::Duplicate(_))),
            "expected Duplicate, got {:?}",
            result
        );

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM connections WHERE requester_profile_id = ? AND target_profile_id = ?",
        )
        .bind(a)
        .bind(b)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);

        // The reverse direction is a different pair.
        repo.create_connection(b, a).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_status_sets_updated_at() {
        let (_db, repo, [a, b, _]) = test_db().await;
        let conn = repo.create_connection(a, b).await.unwrap();

        let updated = repo
            .update_status(conn.id, ConnectionStatus::Accepted)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ConnectionStatus::Accepted);
        assert!(updated.updated_at >= conn.updated_at);
        assert_eq!(updated.created_at, conn.created_at);

        assert!(repo
            .update_status(9999, ConnectionStatus::Rejected)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_includes_both_sides_newest_first() {
        let (_db, repo, [a, b, c]) = test_db().await;
        let ab = repo.create_connection(a, b).await.unwrap();
        let ca = repo.create_connection(c, a).await.unwrap();
        let bc = repo.create_connection(b, c).await.unwrap();

        let ids: Vec<i64> = repo
            .list_connections(a)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![ca.id, ab.id]);
        assert!(!ids.contains(&bc.id));
    }

    #[tokio::test]
    async fn test_accepted_between_ignores_pending() {
        let (_db, repo, [a, b, _]) = test_db().await;
        let ab = repo.create_connection(a, b).await.unwrap();
        repo.create_connection(b, a).await.unwrap();
        repo.update_status(ab.id, ConnectionStatus::Accepted)
            .await
            .unwrap();

        let rows = repo.accepted_between(a, b).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ab.id);
        assert_eq!(repo.accepted_between(b, a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_connection() {
        let (_db, repo, [a, b, _]) = test_db().await;
        let conn = repo.create_connection(a, b).await.unwrap();
        assert!(repo.delete_connection(conn.id).await.unwrap());
        assert!(!repo.delete_connection(conn.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_connection_rejected_by_schema() {
        let (_db, repo, [a, _, _]) = test_db().await;
        assert!(repo.create_connection(a, a).await.is_err());
    }
}
