//! Filesystem image storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::application::images::{
    ImageContent, ImageFolder, ImageStorageError, ImageStore, StoredImage,
};
use crate::domain::validation::ImageKind;

const SOURCE: &str = "nextconfig::infra::uploads";

/// Images stored as files below a root directory.
#[derive(Debug)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve the absolute filesystem path for a stored image.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, ImageStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ImageStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for ImageStorage {
    async fn store(
        &self,
        folder: ImageFolder,
        kind: ImageKind,
        data: Bytes,
    ) -> Result<StoredImage, ImageStorageError> {
        if data.is_empty() {
            return Err(ImageStorageError::EmptyPayload);
        }

        let stored_path = format!(
            "{}/{}.{}",
            folder.as_str(),
            Uuid::new_v4().simple(),
            kind.extension()
        );
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&data));
        debug!(
            target = SOURCE,
            path = %stored_path,
            checksum = %checksum,
            size_bytes = data.len(),
            "stored image"
        );

        Ok(StoredImage {
            path: stored_path,
            checksum,
            size_bytes: data.len() as u64,
        })
    }

    async fn open(&self, path: &str) -> Result<ImageContent, ImageStorageError> {
        let absolute = self.resolve(path)?;
        let data = match fs::read(&absolute).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImageStorageError::NotFound);
            }
            Err(err) => return Err(err.into()),
        };
        let content_type = mime_guess::from_path(&absolute)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(ImageContent {
            bytes: Bytes::from(data),
            content_type,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), ImageStorageError> {
        let absolute = self.resolve(path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ImageStorageError::Io(err)),
        }
    }
}
