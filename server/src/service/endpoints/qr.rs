//! QR code generation endpoint

use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::qr::render_data_uri;
use crate::service::error::ApiError;
use crate::service::extractors::ApiJson;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQrRequest {
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateQrResponse {
    pub qr_data: String,
    pub url: String,
}

pub async fn generate_qr(
    ApiJson(req): ApiJson<GenerateQrRequest>,
) -> Result<Json<GenerateQrResponse>, ApiError> {
    req.validate()?;
    tracing::info!(url = %req.url, "HTTP generate_qr");

    let qr_data = render_data_uri(&req.url)?;
    Ok(Json(GenerateQrResponse {
        qr_data,
        url: req.url,
    }))
}
