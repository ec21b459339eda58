//! SQLite-backed implementation of [`LinkRepository`].

use sqlx::SqlitePool;

use super::helpers::non_empty;
use crate::persistence::traits::LinkRepository;
use crate::persistence::{now_timestamp, Link, NewLink, PersistenceError};

const LINK_COLUMNS: &str =
    "id, profile_id, title, url, description, image_ref, created_at, updated_at";

pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LinkRepository for SqliteLinkRepository {
    async fn create_link(&self, link: &NewLink) -> Result<Link, PersistenceError> {
        let now = now_timestamp();
        let sql = format!(
            "INSERT INTO links \
             (profile_id, title, url, description, image_ref, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {LINK_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Link>(&sql)
            .bind(link.profile_id)
            .bind(&link.title)
            .bind(&link.url)
            .bind(non_empty(&link.description))
            .bind(non_empty(&link.image_ref))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn get_link(&self, id: i64) -> Result<Option<Link>, PersistenceError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?");
        let link = sqlx::query_as::<_, Link>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    async fn list_links(&self, profile_id: i64) -> Result<Vec<Link>, PersistenceError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE profile_id = ? ORDER BY created_at DESC, id DESC"
        );
        let links = sqlx::query_as::<_, Link>(&sql)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(links)
    }

    async fn update_link(&self, link: &Link) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            "UPDATE links SET title = ?, url = ?, description = ?, image_ref = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&link.title)
        .bind(&link.url)
        .bind(non_empty(&link.description))
        .bind(non_empty(&link.image_ref))
        .bind(link.updated_at)
        .bind(link.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_link(&self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
