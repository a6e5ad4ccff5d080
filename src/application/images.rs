//! Image blob store contract and best-effort cleanup.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use crate::domain::validation::{ImageKind, ValidationErrors, validate_image};

const SOURCE: &str = "nextconfig::application::images";

#[derive(Debug, Error)]
pub enum ImageStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("image not found")]
    NotFound,
    #[error("uploaded image is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level folder an image is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Blog,
    Projects,
}

impl ImageFolder {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFolder::Blog => "blog",
            ImageFolder::Projects => "projects",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Path relative to the store root, e.g. `projects/<id>.jpg`.
    pub path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ImageContent {
    pub bytes: Bytes,
    pub content_type: String,
}

/// An image received from a form, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn validate(&self, max_bytes: u64) -> Result<ImageKind, ValidationErrors> {
        validate_image(
            &self.field,
            &self.file_name,
            self.content_type.as_deref(),
            self.data.len() as u64,
            max_bytes,
        )
    }
}

/// Validate every upload, collecting all field errors.
pub fn validate_uploads(
    uploads: &[ImageUpload],
    max_bytes: u64,
) -> Result<Vec<ImageKind>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut kinds = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match upload.validate(max_bytes) {
            Ok(kind) => kinds.push(kind),
            Err(err) => errors.merge(err),
        }
    }
    errors.into_result().map(|()| kinds)
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(
        &self,
        folder: ImageFolder,
        kind: ImageKind,
        data: Bytes,
    ) -> Result<StoredImage, ImageStorageError>;

    async fn open(&self, path: &str) -> Result<ImageContent, ImageStorageError>;

    /// Remove a stored image. Missing images are treated as success.
    async fn delete(&self, path: &str) -> Result<(), ImageStorageError>;
}

/// Delete images that are no longer referenced. Failures are logged only.
pub async fn discard_images<'a>(
    store: &dyn ImageStore,
    paths: impl IntoIterator<Item = &'a str>,
) {
    for path in paths {
        if let Err(err) = store.delete(path).await {
            warn!(
                target = SOURCE,
                path = path,
                error = %err,
                "failed to delete stored image"
            );
        }
    }
}
