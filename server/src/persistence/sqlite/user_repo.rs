//! SQLite-backed implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::helpers::unique_violation_as;
use crate::persistence::traits::UserRepository;
use crate::persistence::{now_timestamp, NewUser, PersistenceError, User, UserCredentials};

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                name: self.name,
                email: self.email,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<User, PersistenceError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?) \
             RETURNING id, name, email, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation_as("user with this email"))?;

        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, PersistenceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, PersistenceError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CredentialRow::into_credentials))
    }

    async fn list_users(&self) -> Result<Vec<User>, PersistenceError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Aiko".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
        }
    }

    async fn test_db() -> (Database, SqliteUserRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqliteUserRepository::new(db.pool().clone());
        (db, repo)
    }

    #[tokio::test]
    async fn test_create_and_find_credentials() {
        let (_db, repo) = test_db().await;

        let aiko = new_user("aiko@example.com");
        let user = repo.create_user(&aiko).await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.email, "aiko@example.com");

        let creds = repo
            .find_credentials("aiko@example.com")
            .await
            .unwrap()
            .expect("credentials should exist");
        assert_eq!(creds.user, user);
        assert_eq!(creds.password_hash, "$argon2id$v=19$stub");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_duplicate_error() {
        let (_db, repo) = test_db().await;
        let dup = new_user("dup@example.com");
        repo.create_user(&dup).await.unwrap();

        let result = repo.create_user(&dup).await;
        assert!(
            matches!(result, Err(PersistenceError::Duplicate(_))),
            "expected Duplicate, got {:?}",
            result
        );
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_email_is_none() {
        let (_db, repo) = test_db().await;
        let ghost = repo.find_credentials("ghost@example.com").await.unwrap();
        assert!(ghost.is_none());
        assert!(repo.get_user(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_users_in_id_order() {
        let (_db, repo) = test_db().await;
        let a = repo.create_user(&new_user("a@example.com")).await.unwrap();
        let b = repo.create_user(&new_user("b@example.com")).await.unwrap();

        let users = repo.list_users().await.unwrap();
        assert_eq!(users, vec![a, b]);
    }
}
