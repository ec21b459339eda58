//! Image storage for profile icons and link images.
//!
//! New images go to Cloudinary when it is configured and to the local upload
//! directory otherwise. A stored *reference* is either a bare file name
//! (local) or the hosted `https://` URL (Cloudinary), so references written
//! by either backend stay readable after the configuration changes.

mod cloudinary;
mod local;

pub use cloudinary::CloudinaryStorage;
pub use local::LocalStorage;

use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use tokio::task::JoinHandle;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("image data is not valid base64")]
    InvalidBase64,
    #[error("image is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("invalid storage reference: {0}")]
    InvalidReference(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image host rejected the request: {0}")]
    Remote(String),
}

/// A validated, decoded image payload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl DecodedImage {
    /// Decode a base64 payload (optionally a `data:` URI) and check that it
    /// is a recognizable image within `limit` bytes.
    pub fn from_base64(payload: &str, limit: usize) -> Result<Self, StorageError> {
        let encoded = match payload.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => payload,
        }
        .trim();

        if encoded.len() / 4 * 3 > limit + 3 {
            return Err(StorageError::TooLarge {
                size: encoded.len() / 4 * 3,
                limit,
            });
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| StorageError::InvalidBase64)?;
        if bytes.len() > limit {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit,
            });
        }

        let format = image::guess_format(&bytes).map_err(|_| StorageError::UnsupportedFormat)?;
        Ok(Self { bytes, format })
    }

    pub fn extension(&self) -> &'static str {
        let extensions = self.format.extensions_str();
        extensions.first().copied().unwrap_or("img")
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// A place images can be written to and removed from.
pub trait ImageBackend: Send + Sync {
    /// Persist the image and return its storage reference.
    fn store(
        &self,
        image: &DecodedImage,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;
    /// Remove a previously stored image. Removing something already gone
    /// succeeds.
    fn delete(&self, reference: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// How to serve a stored image.
#[derive(Debug, PartialEq, Eq)]
pub enum StoredImage {
    Bytes {
        bytes: Vec<u8>,
        content_type: &'static str,
    },
    Redirect(String),
    Missing,
}

pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("https://") || reference.starts_with("http://")
}

/// The configured backends.
pub struct ImageStore {
    local: LocalStorage,
    remote: Option<CloudinaryStorage>,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(local: LocalStorage, remote: Option<CloudinaryStorage>, max_bytes: usize) -> Self {
        Self {
            local,
            remote,
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let remote = config.cloudinary.clone().map(CloudinaryStorage::new);
        Self::new(
            LocalStorage::new(config.upload_dir.clone()),
            remote,
            config.max_image_bytes,
        )
    }

    pub fn backend_name(&self) -> &'static str {
        if self.remote.is_some() {
            "cloudinary"
        } else {
            "local"
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        self.local.dir()
    }

    /// Decode and store a base64 payload, returning the new reference.
    pub async fn store_base64(&self, payload: &str) -> Result<String, StorageError> {
        let image = DecodedImage::from_base64(payload, self.max_bytes)?;
        match &self.remote {
            Some(remote) => remote.store(&image).await,
            None => self.local.store(&image).await,
        }
    }

    pub async fn load(&self, reference: &str) -> Result<StoredImage, StorageError> {
        if is_remote(reference) {
            return Ok(StoredImage::Redirect(reference.to_string()));
        }
        match self.local.read(reference).await? {
            Some(bytes) => {
                let content_type = image::guess_format(&bytes)
                    .map(|f| f.to_mime_type())
                    .unwrap_or("application/octet-stream");
                Ok(StoredImage::Bytes {
                    bytes,
                    content_type,
                })
            }
            None => Ok(StoredImage::Missing),
        }
    }

    pub async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        if !is_remote(reference) {
            return self.local.delete(reference).await;
        }
        match &self.remote {
            Some(remote) => remote.delete(reference).await,
            None => {
                tracing::warn!(
                    reference,
                    "hosted image left in place, image host not configured"
                );
                Ok(())
            }
        }
    }
}

/// Delete `references` in a detached task. Failures are logged, never
/// surfaced to the request that triggered the cleanup.
pub fn spawn_cleanup(store: Arc<ImageStore>, references: Vec<String>) -> Option<JoinHandle<()>> {
    if references.is_empty() {
        return None;
    }
    Some(tokio::spawn(async move {
        for reference in references {
            match store.delete(&reference).await {
                Ok(()) => tracing::debug!(reference = %reference, "removed stored image"),
                Err(e) => {
                    tracing::warn!(%reference, error = %e, "failed to remove stored image");
                }
            }
        }
    }))
}

#[cfg(test)]
pub(crate) mod test_images {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;

    /// A small valid PNG.
    pub fn png_bytes() -> Vec<u8> {
        let img = image::ImageBuffer::from_pixel(4, 4, Luma([128u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub fn png_base64() -> String {
        STANDARD.encode(png_bytes())
    }
}
