//! Product image storage on local disk.
//!
//! Files are written under the configured upload directory with generated
//! names and served back from `/images/{file}`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

/// Image extensions accepted on upload.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file in field `product`")]
    MissingFile,

    #[error("uploaded file is empty")]
    Empty,

    #[error("malformed upload: {0}")]
    Malformed(String),

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploaded images and builds their public URLs.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_base: String,
}

impl ImageStore {
    /// `public_base` is the server's external base URL; images resolve to
    /// `{public_base}/images/{file}`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` and return the public URL.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` unless the original file name has
    /// an allowed image extension, `UploadError::Empty` for empty bodies, or
    /// `UploadError::Io` if writing fails.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let extension = image_extension(original_name)?;
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let file_name = format!(
            "product_{}_{:08x}.{extension}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().as_fields().0
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        tracing::info!(file = %file_name, size = bytes.len(), "image stored");

        Ok(format!("{}/images/{file_name}", self.public_base))
    }
}

fn image_extension(name: &str) -> Result<String, UploadError> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| UploadError::UnsupportedType(name.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"), "http://localhost:4000/");

        let url = store.save("Photo.PNG", b"\x89PNG").await.unwrap();

        let file = url.strip_prefix("http://localhost:4000/images/").unwrap();
        assert!(file.starts_with("product_"));
        assert!(file.ends_with(".png"));
        assert_eq!(std::fs::read(store.dir().join(file)).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn rejects_non_images_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), "http://localhost:4000");

        assert!(matches!(
            store.save("notes.txt", b"hi").await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.save("no-extension", b"hi").await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.save("a.jpg", b"").await,
            Err(UploadError::Empty)
        ));
    }
}
