//! The HTTP error taxonomy. Every failure leaves the server as
//! `{"error": "<message>"}` with the matching status code.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::{PasswordError, TokenError};
use crate::connections::ConnectionError;
use crate::persistence::PersistenceError;
use crate::profiles::ProfileError;
use crate::qr::QrError;
use crate::storage::StorageError;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    /// Log `err` and hide it behind a generic message.
    fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        ApiError::Internal(INTERNAL_MESSAGE.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Duplicate(what) => {
                ApiError::Conflict(format!("{what} already exists"))
            }
            PersistenceError::Timeout(limit) => {
                tracing::error!(?limit, "database operation timed out");
                ApiError::Internal("database operation timed out".to_string())
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidBase64
            | StorageError::TooLarge { .. }
            | StorageError::UnsupportedFormat => ApiError::Validation(err.to_string()),
            other => ApiError::internal(other),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::InvalidInput(msg) => ApiError::Validation(msg),
            ProfileError::NotFound => ApiError::NotFound(err.to_string()),
            ProfileError::Forbidden => ApiError::Forbidden(err.to_string()),
            ProfileError::Image(e) => e.into(),
            ProfileError::Persistence(e) => e.into(),
        }
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::InvalidInput(msg) => ApiError::Validation(msg.to_string()),
            ConnectionError::ProfileNotFound(_) | ConnectionError::NotFound => {
                ApiError::NotFound(err.to_string())
            }
            ConnectionError::Forbidden(msg) => ApiError::Forbidden(msg.to_string()),
            ConnectionError::AlreadyExists => ApiError::Conflict(err.to_string()),
            ConnectionError::Persistence(e) => e.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid => ApiError::Auth(err.to_string()),
            TokenError::Signing(_) => ApiError::internal(err),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::internal(err)
    }
}

impl From<QrError> for ApiError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::Encode(_) => ApiError::Validation(err.to_string()),
            QrError::Png(_) => ApiError::internal(err),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join("; "))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(ApiError::Conflict("connection already exists".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({ "error": "connection already exists" }));
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err: ApiError = PersistenceError::Migration("secret table detail".into()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::validation("x"), StatusCode::BAD_REQUEST),
            (ApiError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
        let internal = ApiError::Internal("x".into());
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_conversions() {
        let err: ApiError = PersistenceError::Duplicate("user with this email").into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = PersistenceError::Timeout(std::time::Duration::from_secs(5)).into();
        assert!(matches!(err, ApiError::Internal(ref m) if m.contains("timed out")));

        let err: ApiError = ConnectionError::AlreadyExists.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = ProfileError::Forbidden.into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = StorageError::UnsupportedFormat.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = TokenError::Expired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
