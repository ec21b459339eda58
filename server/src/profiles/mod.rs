//! Profile lifecycle: creation with an optional icon, partial updates, and
//! the cascading delete.
//!
//! Icons are written to storage before the row that references them. When
//! the database write fails the fresh icon is removed again; when it
//! succeeds, any icon it replaced is removed. Both removals run detached.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::patch::Patch;
use crate::persistence::traits::ProfileRepository;
use crate::persistence::{
    now_timestamp, with_timeout, DeletedProfile, NewProfile, Persistence, PersistenceError, Profile,
};
use crate::storage::{spawn_cleanup, ImageStore, StorageError, StoredImage};

const MAX_DISPLAY_NAME_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("profile not found")]
    NotFound,
    #[error("you do not own this profile")]
    Forbidden,
    #[error(transparent)]
    Image(#[from] StorageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Body of `POST /api/profiles`.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    pub display_name: String,
    pub icon_base64: Option<String>,
    pub aka: Option<String>,
    pub hometown: Option<String>,
    pub birthdate: Option<String>,
    pub hobby: Option<String>,
    pub comment: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Body of `PUT /api/profiles/:id`. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub display_name: Patch<String>,
    #[serde(default)]
    pub icon_base64: Patch<String>,
    #[serde(default)]
    pub aka: Patch<String>,
    #[serde(default)]
    pub hometown: Patch<String>,
    #[serde(default)]
    pub birthdate: Patch<String>,
    #[serde(default)]
    pub hobby: Patch<String>,
    #[serde(default)]
    pub comment: Patch<String>,
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
}

impl ProfilePatch {
    fn is_empty(&self) -> bool {
        self.display_name.is_unchanged()
            && self.icon_base64.is_unchanged()
            && self.aka.is_unchanged()
            && self.hometown.is_unchanged()
            && self.birthdate.is_unchanged()
            && self.hobby.is_unchanged()
            && self.comment.is_unchanged()
            && self.title.is_unchanged()
            && self.description.is_unchanged()
    }

    /// Apply every field except the icon, which needs storage.
    fn apply_fields(self, profile: &mut Profile) -> Result<Patch<String>, ProfileError> {
        match self.display_name {
            Patch::Unchanged => {}
            Patch::Clear => {
                return Err(ProfileError::InvalidInput("display_name cannot be null".into()))
            }
            Patch::Set(name) => profile.display_name = validate_display_name(&name)?,
        }

        match self.birthdate.empty_as_clear() {
            Patch::Unchanged => {}
            Patch::Clear => profile.birthdate = None,
            Patch::Set(date) => profile.birthdate = Some(parse_birthdate(&date)?),
        }

        self.aka.apply_text(&mut profile.aka);
        self.hometown.apply_text(&mut profile.hometown);
        self.hobby.apply_text(&mut profile.hobby);
        self.comment.apply_text(&mut profile.comment);
        self.title.apply_text(&mut profile.title);
        self.description.apply_text(&mut profile.description);

        Ok(self.icon_base64.empty_as_clear())
    }
}

fn validate_display_name(name: &str) -> Result<String, ProfileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProfileError::InvalidInput("display_name is required".into()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(ProfileError::InvalidInput(format!(
            "display_name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Parse a `YYYY-MM-DD` birthdate.
pub fn parse_birthdate(value: &str) -> Result<NaiveDate, ProfileError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ProfileError::InvalidInput("birthdate must be YYYY-MM-DD".into()))
}

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub db: Duration,
    pub cascade: Duration,
}

pub struct ProfileManager<D: Persistence> {
    store: Arc<D>,
    images: Arc<ImageStore>,
    timeouts: Timeouts,
}

impl<D: Persistence> ProfileManager<D> {
    pub fn new(store: Arc<D>, images: Arc<ImageStore>, timeouts: Timeouts) -> Self {
        Self {
            store,
            images,
            timeouts,
        }
    }

    pub async fn create(&self, owner: i64, input: ProfileInput) -> Result<Profile, ProfileError> {
        let birthdate = match input.birthdate.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => Some(parse_birthdate(date)?),
            _ => None,
        };
        let mut new = NewProfile {
            user_id: owner,
            display_name: validate_display_name(&input.display_name)?,
            icon_ref: None,
            aka: input.aka,
            hometown: input.hometown,
            birthdate,
            hobby: input.hobby,
            comment: input.comment,
            title: input.title,
            description: input.description,
        };

        if let Some(payload) = input.icon_base64.filter(|p| !p.trim().is_empty()) {
            new.icon_ref = Some(self.images.store_base64(&payload).await?);
        }

        match with_timeout(self.timeouts.db, self.store.profiles().create_profile(&new)).await {
            Ok(profile) => {
                tracing::info!(profile_id = profile.id, user_id = owner, "profile created");
                Ok(profile)
            }
            Err(e) => {
                spawn_cleanup(self.images.clone(), new.icon_ref.into_iter().collect());
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<Profile, ProfileError> {
        with_timeout(self.timeouts.db, self.store.profiles().get_profile(id))
            .await?
            .ok_or(ProfileError::NotFound)
    }

    /// Load a profile and check that `caller` owns it.
    pub async fn get_owned(&self, caller: i64, id: i64) -> Result<Profile, ProfileError> {
        let profile = self.get(id).await?;
        if profile.user_id != caller {
            return Err(ProfileError::Forbidden);
        }
        Ok(profile)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Profile>, ProfileError> {
        let profiles = with_timeout(
            self.timeouts.db,
            self.store.profiles().list_profiles_by_user(user_id),
        )
        .await?;
        Ok(profiles)
    }

    pub async fn update(
        &self,
        caller: i64,
        id: i64,
        patch: ProfilePatch,
    ) -> Result<Profile, ProfileError> {
        if patch.is_empty() {
            return Err(ProfileError::InvalidInput("no fields to update".into()));
        }
        let mut profile = self.get_owned(caller, id).await?;
        let previous_icon = profile.icon_ref.clone();

        match patch.apply_fields(&mut profile)? {
            Patch::Unchanged => {}
            Patch::Clear => profile.icon_ref = None,
            Patch::Set(payload) => {
                profile.icon_ref = Some(self.images.store_base64(&payload).await?);
            }
        }
        profile.updated_at = now_timestamp();

        let written = with_timeout(
            self.timeouts.db,
            self.store.profiles().update_profile(&profile),
        )
        .await;
        let written = match written {
            Ok(true) => Ok(()),
            Ok(false) => Err(ProfileError::NotFound),
            Err(e) => Err(ProfileError::from(e)),
        };
        let icon_changed = profile.icon_ref != previous_icon;
        if let Err(e) = written {
            if icon_changed {
                spawn_cleanup(self.images.clone(), profile.icon_ref.into_iter().collect());
            }
            return Err(e);
        }

        if icon_changed {
            spawn_cleanup(self.images.clone(), previous_icon.into_iter().collect());
        }
        tracing::info!(profile_id = id, "profile updated");
        Ok(profile)
    }

    /// Delete the profile and everything attached to it in one transaction,
    /// then remove its images in the background.
    pub async fn delete(&self, caller: i64, id: i64) -> Result<DeletedProfile, ProfileError> {
        self.get_owned(caller, id).await?;

        let deleted = with_timeout(
            self.timeouts.cascade,
            self.store.profiles().delete_profile_cascade(id),
        )
        .await?
        .ok_or(ProfileError::NotFound)?;

        tracing::info!(
            profile_id = id,
            option_profiles = deleted.option_profiles,
            connections = deleted.connections,
            links = deleted.links,
            "profile deleted"
        );

        let images: Vec<String> = deleted
            .icon_ref
            .iter()
            .chain(deleted.link_image_refs.iter())
            .cloned()
            .collect();
        spawn_cleanup(self.images.clone(), images);
        Ok(deleted)
    }

    /// The stored icon of a profile, or [`StoredImage::Missing`] when it has
    /// none.
    pub async fn icon(&self, id: i64) -> Result<StoredImage, ProfileError> {
        let profile = self.get(id).await?;
        match profile.icon_ref {
            Some(reference) => Ok(self.images.load(&reference).await?),
            None => Ok(StoredImage::Missing),
        }
    }
}
