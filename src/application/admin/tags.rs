use std::sync::Arc;

use tracing::info;

use crate::application::repos::{ContentRepository, RepoError};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::TagRecord;
use crate::domain::inputs::TagInput;
use crate::domain::slug::{generate_unique_slug_async, slug_or_derive};
use crate::domain::validation::ValidationErrors;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::tags";

#[derive(Clone)]
pub struct AdminTagService {
    reads: Arc<dyn ContentRepository>,
    writer: ContentWriter,
}

impl AdminTagService {
    pub fn new(reads: Arc<dyn ContentRepository>, writer: ContentWriter) -> Self {
        Self { reads, writer }
    }

    pub async fn create(&self, input: TagInput) -> Result<Committed<TagRecord>, AdminError> {
        input.validate()?;
        let name = input.name.trim();

        let taken = self
            .reads
            .list_tags()
            .await?
            .iter()
            .any(|tag| tag.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(ValidationErrors::single("name", "The name has already been taken.").into());
        }

        let slug = self.resolve_slug(input.slug.as_deref(), name).await?;
        let committed = self
            .writer
            .create_tag(name, &slug)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { constraint } if constraint.contains("name") => {
                    ValidationErrors::single("name", "The name has already been taken.").into()
                }
                RepoError::Duplicate { .. } => {
                    ValidationErrors::single("slug", "The slug has already been taken.").into()
                }
                other => AdminError::from(other),
            })?;

        info!(
            target = SOURCE,
            tag_id = committed.value.id,
            slug = %committed.value.slug,
            "tag created"
        );
        Ok(committed)
    }

    /// Delete a tag; its post links cascade.
    pub async fn delete(&self, id: i64) -> Result<Committed<TagRecord>, AdminError> {
        let committed = self
            .writer
            .delete_tag(id)
            .await
            .map_err(AdminError::repo("tag"))?;
        info!(target = SOURCE, tag_id = id, "tag deleted");
        Ok(committed)
    }

    async fn resolve_slug(&self, explicit: Option<&str>, name: &str) -> Result<String, AdminError> {
        let reads = &self.reads;
        let is_free = |candidate: String| async move {
            Ok::<_, RepoError>(reads.find_tag_by_slug(&candidate).await?.is_none())
        };

        match explicit.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                let slug = slug_or_derive(Some(value), name)?;
                if is_free(slug.clone()).await? {
                    Ok(slug)
                } else {
                    Err(ValidationErrors::single("slug", "The slug has already been taken.").into())
                }
            }
            None => Ok(
                generate_unique_slug_async(name, |candidate| is_free(candidate.to_string()))
                    .await?,
            ),
        }
    }
}
