//! SQLite-backed implementation of [`OptionProfileRepository`].

use sqlx::SqlitePool;

use crate::persistence::traits::OptionProfileRepository;
use crate::persistence::{NewOptionProfile, OptionProfile, PersistenceError};

pub struct SqliteOptionProfileRepository {
    pool: SqlitePool,
}

impl SqliteOptionProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl OptionProfileRepository for SqliteOptionProfileRepository {
    async fn create_option_profile(
        &self,
        option: &NewOptionProfile,
    ) -> Result<OptionProfile, PersistenceError> {
        let created = sqlx::query_as::<_, OptionProfile>(
            "INSERT INTO option_profiles (profile_id, title, content) VALUES (?, ?, ?) \
             RETURNING id, profile_id, title, content",
        )
        .bind(option.profile_id)
        .bind(&option.title)
        .bind(&option.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_option_profile(&self, id: i64) -> Result<Option<OptionProfile>, PersistenceError> {
        let option = sqlx::query_as::<_, OptionProfile>(
            "SELECT id, profile_id, title, content FROM option_profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(option)
    }

    async fn list_option_profiles(
        &self,
        profile_id: i64,
    ) -> Result<Vec<OptionProfile>, PersistenceError> {
        let options = sqlx::query_as::<_, OptionProfile>(
            "SELECT id, profile_id, title, content FROM option_profiles \
             WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    async fn update_option_profile(
        &self,
        option: &OptionProfile,
    ) -> Result<bool, PersistenceError> {
        let result = sqlx::query("UPDATE option_profiles SET title = ?, content = ? WHERE id = ?")
            .bind(&option.title)
            .bind(&option.content)
            .bind(option.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_option_profile(&self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM option_profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
