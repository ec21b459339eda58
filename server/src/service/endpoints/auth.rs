//! Sign-up and sign-in endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{hash_password_blocking, verify_password_blocking};
use crate::persistence::traits::UserRepository;
use crate::persistence::{with_timeout, NewUser, Persistence, User};
use crate::service::context::AppState;
use crate::service::error::ApiError;
use crate::service::extractors::ApiJson;

/// Shared by the unknown-email and wrong-password paths.
const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn signup<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiJson(mut req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    req.name = req.name.trim().to_string();
    req.email = normalize_email(&req.email);
    req.validate()?;
    tracing::info!(email = %req.email, "HTTP signup");

    let password_hash = hash_password_blocking(req.password).await?;
    let user = with_timeout(
        state.settings.timeouts.db,
        state.store.users().create_user(&NewUser {
            name: req.name,
            email: req.email,
            password_hash,
        }),
    )
    .await?;

    let token = state.tokens.issue(user.id, &user.email)?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn signin<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiJson(req): ApiJson<SigninRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate()?;
    let email = normalize_email(&req.email);
    tracing::info!(email = %email, "HTTP signin");

    let credentials = with_timeout(
        state.settings.timeouts.db,
        state.store.users().find_credentials(&email),
    )
    .await?
    .ok_or_else(|| ApiError::Auth(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password_blocking(req.password, credentials.password_hash).await? {
        tracing::info!(user_id = credentials.user.id, "sign-in rejected");
        return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    let user = credentials.user;
    let token = state.tokens.issue(user.id, &user.email)?;
    Ok(Json(AuthResponse { user, token }))
}
