//! User listing endpoints

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::persistence::traits::UserRepository;
use crate::persistence::{with_timeout, Persistence, User};
use crate::service::context::AppState;
use crate::service::converters::{convert_profile, ProfileResponse};
use crate::service::error::ApiError;
use crate::service::extractors::{ApiPath, AuthUser};

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<ProfileResponse>,
    pub count: usize,
}

pub async fn list_users<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
) -> Result<Json<UserListResponse>, ApiError> {
    tracing::info!(caller = caller.user_id, "HTTP list_users");
    let users = with_timeout(state.settings.timeouts.db, state.store.users().list_users()).await?;
    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}

pub async fn list_user_profiles<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<ProfileListResponse>, ApiError> {
    tracing::info!(caller = caller.user_id, user_id, "HTTP list_user_profiles");

    with_timeout(
        state.settings.timeouts.db,
        state.store.users().get_user(user_id),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("user not found"))?;

    let profiles: Vec<ProfileResponse> = state
        .profiles
        .list_for_user(user_id)
        .await?
        .into_iter()
        .map(|p| convert_profile(p, &state.settings.public_url))
        .collect();

    Ok(Json(ProfileListResponse {
        count: profiles.len(),
        profiles,
    }))
}
