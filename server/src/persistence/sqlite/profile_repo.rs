//! SQLite-backed implementation of [`ProfileRepository`].

use sqlx::SqlitePool;

use super::helpers::non_empty;
use crate::persistence::traits::ProfileRepository;
use crate::persistence::{now_timestamp, DeletedProfile, NewProfile, PersistenceError, Profile};

const PROFILE_COLUMNS: &str = "id, user_id, display_name, icon_ref, aka, hometown, birthdate, \
     hobby, comment, title, description, created_at, updated_at";

pub struct SqliteProfileRepository {
    pool: SqlitePool,
}

impl SqliteProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ProfileRepository for SqliteProfileRepository {
    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, PersistenceError> {
        let now = now_timestamp();
        let sql = format!(
            "INSERT INTO profiles \
             (user_id, display_name, icon_ref, aka, hometown, birthdate, hobby, comment, \
              title, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {PROFILE_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Profile>(&sql)
            .bind(profile.user_id)
            .bind(&profile.display_name)
            .bind(non_empty(&profile.icon_ref))
            .bind(non_empty(&profile.aka))
            .bind(non_empty(&profile.hometown))
            .bind(profile.birthdate)
            .bind(non_empty(&profile.hobby))
            .bind(non_empty(&profile.comment))
            .bind(non_empty(&profile.title))
            .bind(non_empty(&profile.description))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, PersistenceError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn list_profiles_by_user(&self, user_id: i64) -> Result<Vec<Profile>, PersistenceError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ? ORDER BY id DESC"
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn update_profile(&self, profile: &Profile) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            "UPDATE profiles SET \
             display_name = ?, icon_ref = ?, aka = ?, hometown = ?, birthdate = ?, \
             hobby = ?, comment = ?, title = ?, description = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&profile.display_name)
        .bind(non_empty(&profile.icon_ref))
        .bind(non_empty(&profile.aka))
        .bind(non_empty(&profile.hometown))
        .bind(profile.birthdate)
        .bind(non_empty(&profile.hobby))
        .bind(non_empty(&profile.comment))
        .bind(non_empty(&profile.title))
        .bind(non_empty(&profile.description))
        .bind(profile.updated_at)
        .bind(profile.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_profile_cascade(
        &self,
        id: i64,
    ) -> Result<Option<DeletedProfile>, PersistenceError> {
        // Dropping `tx` on any early return rolls the whole cascade back.
        let mut tx = self.pool.begin().await?;

        let icon: Option<(Option<String>,)> =
            sqlx::query_as("SELECT icon_ref FROM profiles WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((icon_ref,)) = icon else {
            return Ok(None);
        };

        let link_images: Vec<(String,)> = sqlx::query_as(
            "SELECT image_ref FROM links WHERE profile_id = ? AND image_ref IS NOT NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let option_profiles = sqlx::query("DELETE FROM option_profiles WHERE profile_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let connections = sqlx::query(
            "DELETE FROM connections WHERE requester_profile_id = ? OR target_profile_id = ?",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let links = sqlx::query("DELETE FROM links WHERE profile_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Ok(None);
        }

        tx.commit().await?;

        Ok(Some(DeletedProfile {
            icon_ref,
            link_image_refs: link_images.into_iter().map(|(r,)| r).collect(),
            option_profiles,
            connections,
            links,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;
    use chrono::NaiveDate;

    async fn test_db() -> (Database, SqliteProfileRepository, i64) {
        let db = Database::new_in_memory().await.unwrap();
        let (user_id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (name, email, password_hash, created_at) \
             VALUES ('Ren', 'ren@example.com', 'h', '2024-01-01T00:00:00Z') RETURNING id",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        let repo = SqliteProfileRepository::new(db.pool().clone());
        (db, repo, user_id)
    }

    fn sample_profile(user_id: i64, name: &str) -> NewProfile {
        NewProfile {
            user_id,
            display_name: name.to_string(),
            hometown: Some("Sapporo".to_string()),
            birthdate: NaiveDate::from_ymd_opt(1999, 4, 1),
            hobby: Some(String::new()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_db, repo, user_id) = test_db().await;

        let ren = sample_profile(user_id, "Ren");
        let created = repo.create_profile(&ren).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.display_name, "Ren");
        assert_eq!(created.birthdate, NaiveDate::from_ymd_opt(1999, 4, 1));
        assert_eq!(created.hobby, None, "empty optional text is stored as NULL");
        assert_eq!(created.created_at, created.updated_at);

        let loaded = repo.get_profile(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_db, repo, _) = test_db().await;
        assert!(repo.get_profile(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_user_newest_first() {
        let (_db, repo, user_id) = test_db().await;
        let work = sample_profile(user_id, "Work");
        let play = sample_profile(user_id, "Play");
        let first = repo.create_profile(&work).await.unwrap();
        let second = repo.create_profile(&play).await.unwrap();

        let list = repo.list_profiles_by_user(user_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);

        let strangers = repo.list_profiles_by_user(user_id + 1).await.unwrap();
        assert!(strangers.is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_all_fields() {
        let (_db, repo, user_id) = test_db().await;
        let ren = sample_profile(user_id, "Ren");
        let mut profile = repo.create_profile(&ren).await.unwrap();

        profile.display_name = "Ren K.".to_string();
        profile.hometown = None;
        profile.title = Some("Engineer".to_string());
        profile.icon_ref = Some("abc.png".to_string());
        profile.updated_at = now_timestamp();
        assert!(repo.update_profile(&profile).await.unwrap());

        let loaded = repo.get_profile(profile.id).await.unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let (_db, repo, user_id) = test_db().await;
        let ren = sample_profile(user_id, "Ren");
        let mut profile = repo.create_profile(&ren).await.unwrap();
        profile.id = 4242;
        assert!(!repo.update_profile(&profile).await.unwrap());
    }

    #[tokio::test]
    async fn test_cascade_delete_missing_is_none() {
        let (_db, repo, _) = test_db().await;
        assert!(repo.delete_profile_cascade(77).await.unwrap().is_none());
    }
}
