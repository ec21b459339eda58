//! Images hosted on Cloudinary through its signed upload API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{DecodedImage, ImageBackend, StorageError};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const FOLDER: &str = "qrsona/profiles";

pub struct CloudinaryStorage {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.config.cloud_name)
    }

    /// Form fields for a signed request: `params` plus key, signature and
    /// algorithm.
    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        let mut form = params;
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        form
    }

    async fn post(
        &self,
        action: &str,
        form: Vec<(&'static str, String)>,
    ) -> Result<reqwest::Response, StorageError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Remote(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

impl ImageBackend for CloudinaryStorage {
    async fn store(&self, image: &DecodedImage) -> Result<String, StorageError> {
        let mut form = self.signed_form(vec![
            ("folder", FOLDER.to_string()),
            ("public_id", Uuid::new_v4().to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);
        let payload = STANDARD.encode(&image.bytes);
        let data_uri = format!("data:{};base64,{payload}", image.mime_type());
        form.push(("file", data_uri));

        let uploaded: UploadResponse = self.post("upload", form).await?.json().await?;
        tracing::debug!(url = %uploaded.secure_url, "uploaded image to cloudinary");
        Ok(uploaded.secure_url)
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let public_id = public_id_from_url(reference, FOLDER)
            .ok_or_else(|| StorageError::InvalidReference(reference.to_string()))?;
        let form = self.signed_form(vec![
            ("public_id", public_id),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let destroyed: DestroyResponse = self.post("destroy", form).await?.json().await?;
        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Remote(format!("destroy returned {other}"))),
        }
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, suffixed with the API secret, SHA-256 hex digest.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Recover `folder/name` (without extension) from a delivery URL such as
/// `https://res.cloudinary.com/demo/image/upload/v17/qrsona/profiles/abc.png`.
fn public_id_from_url(url: &str, folder: &str) -> Option<String> {
    let start = url.find(&format!("/{folder}/"))? + 1;
    let path = url[start..].split(['?', '#']).next()?;
    let id = match path.rsplit_once('.') {
        Some((stem, _)) if !stem.ends_with('/') && stem.len() > folder.len() + 1 => stem,
        _ => path,
    };
    (id.len() > folder.len() + 1).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_sorts_parameters() {
        let a = sign(
            &[("timestamp", "1".to_string()), ("folder", "f".to_string())],
            "secret",
        );
        let b = sign(
            &[("folder", "f".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=f&timestamp=1secret");
        assert_eq!(a, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(
            public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/v1712/qrsona/profiles/abc-123.png",
                FOLDER
            )
            .as_deref(),
            Some("qrsona/profiles/abc-123")
        );
        assert_eq!(
            public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/qrsona/profiles/noext",
                FOLDER
            )
            .as_deref(),
            Some("qrsona/profiles/noext")
        );
        assert_eq!(
            public_id_from_url("https://example.com/other/abc.png", FOLDER),
            None
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/x/qrsona/profiles/", FOLDER),
            None
        );
    }

    #[test]
    fn test_signed_form_carries_credentials() {
        let storage = CloudinaryStorage::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        });
        let form = storage.signed_form(vec![("timestamp", "1".to_string())]);
        let keys: Vec<&str> = form.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["timestamp", "api_key", "signature", "signature_algorithm"]
        );
        assert_eq!(
            storage.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
