//! Images stored as files under one upload directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{DecodedImage, ImageBackend, StorageError};

pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a reference to a path inside the upload directory. Only bare
    /// file names are accepted.
    fn path_for(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let valid = !reference.is_empty()
            && !reference.starts_with('.')
            && !reference.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.dir.join(reference))
    }

    pub async fn read(&self, reference: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ImageBackend for LocalStorage {
    async fn store(&self, image: &DecodedImage) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let reference = format!("{}.{}", Uuid::new_v4(), image.extension());
        tokio::fs::write(self.dir.join(&reference), &image.bytes).await?;
        tracing::debug!(reference = %reference, bytes = image.bytes.len(), "stored image on disk");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_images::png_bytes;
    use image::ImageFormat;

    fn image() -> DecodedImage {
        DecodedImage {
            bytes: png_bytes(),
            format: ImageFormat::Png,
        }
    }

    #[tokio::test]
    async fn test_store_creates_directory_and_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"));

        let a = storage.store(&image()).await.unwrap();
        let b = storage.store(&image()).await.unwrap();
        assert_ne!(a, b);
        assert!(storage.dir().join(&a).exists());
        assert_eq!(storage.read(&a).await.unwrap(), Some(png_bytes()));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf());
        storage.delete("nothing-here.png").await.unwrap();
        assert_eq!(storage.read("nothing-here.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf());
        for reference in ["../secret", "a/b.png", "..", ""] {
            assert!(
                matches!(
                    storage.read(reference).await,
                    Err(StorageError::InvalidReference(_))
                ),
                "{reference:?} should be rejected"
            );
        }
    }
}
