//! Option profile endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::patch::Patch;
use crate::persistence::traits::OptionProfileRepository;
use crate::persistence::{with_timeout, NewOptionProfile, OptionProfile, Persistence};
use crate::service::context::AppState;
use crate::service::error::ApiError;
use crate::service::extractors::{ApiJson, ApiPath, AuthUser};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOptionProfileRequest {
    pub profile_id: i64,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "is required"))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OptionProfilePatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionProfileListResponse {
    pub option_profiles: Vec<OptionProfile>,
    pub count: usize,
}

/// Both fields are required text; `null` and blank values are rejected.
fn required_text(
    field: &str,
    patch: Patch<String>,
    max: Option<usize>,
) -> Result<Option<String>, ApiError> {
    match patch {
        Patch::Unchanged => Ok(None),
        Patch::Clear => Err(ApiError::validation(format!("{field} cannot be null"))),
        Patch::Set(value) if value.trim().is_empty() => {
            Err(ApiError::validation(format!("{field} cannot be empty")))
        }
        Patch::Set(value) => match max {
            Some(max) if value.chars().count() > max => {
                Err(ApiError::validation(format!("{field} must be at most {max} characters")))
            }
            _ => Ok(Some(value)),
        },
    }
}

async fn load_owned<D: Persistence>(
    state: &AppState<D>,
    caller: &AuthUser,
    id: i64,
) -> Result<OptionProfile, ApiError> {
    let option = with_timeout(
        state.settings.timeouts.db,
        state.store.option_profiles().get_option_profile(id),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("option profile not found"))?;
    state
        .profiles
        .get_owned(caller.user_id, option.profile_id)
        .await?;
    Ok(option)
}

pub async fn create_option_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<CreateOptionProfileRequest>,
) -> Result<(StatusCode, Json<OptionProfile>), ApiError> {
    req.validate()?;
    tracing::info!(profile_id = req.profile_id, "HTTP create_option_profile");
    state
        .profiles
        .get_owned(caller.user_id, req.profile_id)
        .await?;

    let new = NewOptionProfile {
        profile_id: req.profile_id,
        title: req.title,
        content: req.content,
    };
    let option = with_timeout(
        state.settings.timeouts.db,
        state.store.option_profiles().create_option_profile(&new),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn list_option_profiles<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(profile_id): ApiPath<i64>,
) -> Result<Json<OptionProfileListResponse>, ApiError> {
    tracing::info!(profile_id, "HTTP list_option_profiles");
    let repo = state.store.option_profiles();
    let option_profiles = with_timeout(
        state.settings.timeouts.db,
        repo.list_option_profiles(profile_id),
    )
    .await?;
    Ok(Json(OptionProfileListResponse {
        count: option_profiles.len(),
        option_profiles,
    }))
}

pub async fn update_option_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<OptionProfilePatch>,
) -> Result<Json<OptionProfile>, ApiError> {
    tracing::info!(option_profile_id = id, "HTTP update_option_profile");
    if patch.title.is_unchanged() && patch.content.is_unchanged() {
        return Err(ApiError::validation("no fields to update"));
    }
    let title = required_text("title", patch.title, Some(100))?;
    let content = required_text("content", patch.content, None)?;

    let mut option = load_owned(&state, &caller, id).await?;
    if let Some(title) = title {
        option.title = title;
    }
    if let Some(content) = content {
        option.content = content;
    }

    let updated = with_timeout(
        state.settings.timeouts.db,
        state.store.option_profiles().update_option_profile(&option),
    )
    .await?;
    if !updated {
        return Err(ApiError::not_found("option profile not found"));
    }
    Ok(Json(option))
}

pub async fn delete_option_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(option_profile_id = id, "HTTP delete_option_profile");
    load_owned(&state, &caller, id).await?;

    let deleted = with_timeout(
        state.settings.timeouts.db,
        state.store.option_profiles().delete_option_profile(id),
    )
    .await?;
    if !deleted {
        return Err(ApiError::not_found("option profile not found"));
    }
    Ok(Json(json!({ "result": "deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        let unchanged = required_text("title", Patch::Unchanged, None);
        assert_eq!(unchanged.unwrap(), None);
        assert!(required_text("title", Patch::Clear, None).is_err());
        assert!(required_text("title", Patch::Set(" ".into()), None).is_err());
        assert!(required_text("title", Patch::Set("abcd".into()), Some(3)).is_err());
        assert_eq!(
            required_text("title", Patch::Set("abc".into()), Some(3)).unwrap(),
            Some("abc".to_string())
        );
    }
}
