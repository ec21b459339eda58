//! Profile endpoints

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::persistence::Persistence;
use crate::profiles::{ProfileInput, ProfilePatch};
use crate::service::context::AppState;
use crate::service::converters::{convert_profile, ProfileResponse};
use crate::service::error::ApiError;
use crate::service::extractors::{ApiJson, ApiPath, AuthUser};
use crate::storage::StoredImage;

#[derive(Debug, Serialize)]
pub struct DeleteProfileResponse {
    pub message: &'static str,
    pub profile_id: i64,
}

pub async fn create_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiJson(input): ApiJson<ProfileInput>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    tracing::info!(user_id = caller.user_id, "HTTP create_profile");
    let profile = state.profiles.create(caller.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(convert_profile(profile, &state.settings.public_url)),
    ))
}

pub async fn get_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    tracing::info!(profile_id = id, "HTTP get_profile");
    let profile = state.profiles.get(id).await?;
    Ok(Json(convert_profile(profile, &state.settings.public_url)))
}

/// Serve the icon bytes, redirect to the hosted copy, or fall back to the
/// default icon asset.
pub async fn get_profile_icon<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    tracing::debug!(profile_id = id, "HTTP get_profile_icon");
    match state.profiles.icon(id).await? {
        StoredImage::Bytes {
            bytes,
            content_type,
        } => Ok(([(CONTENT_TYPE, content_type)], bytes).into_response()),
        StoredImage::Redirect(url) => Ok(Redirect::temporary(&url).into_response()),
        StoredImage::Missing => default_icon(&state).await,
    }
}

async fn default_icon<D: Persistence>(state: &AppState<D>) -> Result<Response, ApiError> {
    match tokio::fs::read(&state.settings.default_icon_path).await {
        Ok(bytes) => Ok(([(CONTENT_TYPE, "image/png")], bytes).into_response()),
        Err(e) => {
            tracing::warn!(
                path = %state.settings.default_icon_path.display(),
                error = %e,
                "default icon unavailable"
            );
            Err(ApiError::not_found("icon not found"))
        }
    }
}

pub async fn update_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<Json<ProfileResponse>, ApiError> {
    tracing::info!(
        profile_id = id,
        user_id = caller.user_id,
        "HTTP update_profile"
    );
    let profile = state.profiles.update(caller.user_id, id, patch).await?;
    Ok(Json(convert_profile(profile, &state.settings.public_url)))
}

pub async fn delete_profile<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteProfileResponse>, ApiError> {
    tracing::info!(
        profile_id = id,
        user_id = caller.user_id,
        "HTTP delete_profile"
    );
    state.profiles.delete(caller.user_id, id).await?;
    Ok(Json(DeleteProfileResponse {
        message: "profile and related data deleted",
        profile_id: id,
    }))
}
