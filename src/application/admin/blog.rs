//! Blog post administration: slugs, tags and featured images.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::application::content::ContentService;
use crate::application::images::{ImageFolder, ImageStore, ImageUpload, discard_images};
use crate::application::repos::{
    ContentRepository, PostFilter, PostOrder, PostParams, RepoError,
};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::{PostRecord, TagRecord};
use crate::domain::inputs::PostInput;
use crate::domain::slug::{generate_unique_slug_async, slug_or_derive};
use crate::domain::validation::ValidationErrors;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::blog";

/// A create or update request for a post.
#[derive(Debug, Clone)]
pub struct PostCommand {
    pub input: PostInput,
    pub image: Option<ImageUpload>,
    /// Drop the current featured image when no replacement is uploaded.
    pub delete_image: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogListView {
    pub posts: Vec<PostRecord>,
    pub tags: Vec<TagRecord>,
}

#[derive(Clone)]
pub struct AdminBlogService {
    reads: Arc<dyn ContentRepository>,
    content: ContentService,
    writer: ContentWriter,
    images: Arc<dyn ImageStore>,
    max_image_bytes: u64,
}

impl AdminBlogService {
    pub fn new(
        reads: Arc<dyn ContentRepository>,
        content: ContentService,
        writer: ContentWriter,
        images: Arc<dyn ImageStore>,
        max_image_bytes: u64,
    ) -> Self {
        Self {
            reads,
            content,
            writer,
            images,
            max_image_bytes,
        }
    }

    /// Every post, drafts included, in display order, with the tag catalogue.
    pub async fn list(&self) -> Result<BlogListView, AdminError> {
        let posts = self
            .reads
            .list_posts(&PostFilter::default(), PostOrder::Display, None)
            .await?;
        let tags = self.content.all_tags().await?;
        Ok(BlogListView { posts, tags })
    }

    pub async fn create(&self, command: PostCommand) -> Result<Committed<PostRecord>, AdminError> {
        self.validate(&command).await?;
        let slug = self.resolve_slug(&command.input, None).await?;

        let featured_image = match command.image.as_ref() {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let params = to_params(command.input, slug, featured_image.clone());
        match self.writer.create_post(params).await {
            Ok(committed) => {
                info!(
                    target = SOURCE,
                    post_id = committed.value.id,
                    slug = %committed.value.slug,
                    "post created"
                );
                Ok(committed)
            }
            Err(err) => {
                discard_images(self.images.as_ref(), featured_image.as_deref()).await;
                Err(slug_conflict(err))
            }
        }
    }

    pub async fn update(
        &self,
        id: i64,
        command: PostCommand,
    ) -> Result<Committed<PostRecord>, AdminError> {
        let existing = self.find(id).await?;
        self.validate(&command).await?;
        let slug = self.resolve_slug(&command.input, Some(existing.id)).await?;

        let uploaded = match command.image.as_ref() {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };
        let featured_image = match (&uploaded, command.delete_image) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => existing.featured_image.clone(),
        };

        let params = to_params(command.input, slug, featured_image);
        let committed = match self.writer.update_post(id, params).await {
            Ok(committed) => committed,
            Err(err) => {
                discard_images(self.images.as_ref(), uploaded.as_deref()).await;
                return Err(slug_conflict(err));
            }
        };

        let replaced = &committed.value;
        if replaced.previous.featured_image != replaced.current.featured_image {
            discard_images(
                self.images.as_ref(),
                replaced.previous.featured_image.as_deref(),
            )
            .await;
        }

        info!(target = SOURCE, post_id = id, "post updated");
        Ok(committed.map(|replaced| replaced.current))
    }

    pub async fn delete(&self, id: i64) -> Result<Committed<PostRecord>, AdminError> {
        let committed = self
            .writer
            .delete_post(id)
            .await
            .map_err(AdminError::repo("post"))?;
        discard_images(
            self.images.as_ref(),
            committed.value.featured_image.as_deref(),
        )
        .await;
        info!(target = SOURCE, post_id = id, "post deleted");
        Ok(committed)
    }

    async fn find(&self, id: i64) -> Result<PostRecord, AdminError> {
        let filter = PostFilter {
            id: Some(id),
            ..PostFilter::default()
        };
        self.reads
            .find_post(&filter)
            .await?
            .ok_or(AdminError::NotFound { entity: "post" })
    }

    async fn validate(&self, command: &PostCommand) -> Result<(), AdminError> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = command.input.validate() {
            errors.merge(err);
        }
        if let Some(upload) = command.image.as_ref() {
            if let Err(err) = upload.validate(self.max_image_bytes) {
                errors.merge(err);
            }
        }

        let requested: BTreeSet<i64> = command.input.tag_ids.iter().copied().collect();
        if !requested.is_empty() {
            let ids: Vec<i64> = requested.iter().copied().collect();
            let found = self.reads.find_tags(&ids).await?;
            if found.len() != requested.len() {
                errors.add("tag_ids", "The selected tag_ids is invalid.");
            }
        }

        errors.into_result().map_err(AdminError::from)
    }

    /// Normalize an explicit slug and reject it when taken, or derive a free
    /// one from the title.
    async fn resolve_slug(
        &self,
        input: &PostInput,
        current_id: Option<i64>,
    ) -> Result<String, AdminError> {
        let explicit = input
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let reads = &self.reads;
        let is_free = |candidate: String| async move {
            let filter = PostFilter {
                slug: Some(candidate),
                ..PostFilter::default()
            };
            let found = reads.find_post(&filter).await?;
            Ok::<_, RepoError>(found.is_none_or(|post| Some(post.id) == current_id))
        };

        match explicit {
            Some(value) => {
                let slug = slug_or_derive(Some(value), &input.title)?;
                if is_free(slug.clone()).await? {
                    Ok(slug)
                } else {
                    Err(ValidationErrors::single("slug", "The slug has already been taken.").into())
                }
            }
            None => Ok(generate_unique_slug_async(&input.title, |candidate| {
                is_free(candidate.to_string())
            })
            .await?),
        }
    }

    async fn store_image(&self, upload: &ImageUpload) -> Result<String, AdminError> {
        let kind = upload.validate(self.max_image_bytes)?;
        let stored = self
            .images
            .store(ImageFolder::Blog, kind, upload.data.clone())
            .await?;
        Ok(stored.path)
    }
}

fn to_params(input: PostInput, slug: String, featured_image: Option<String>) -> PostParams {
    let mut tag_ids = input.tag_ids;
    tag_ids.sort_unstable();
    tag_ids.dedup();
    PostParams {
        title: input.title.trim().to_string(),
        slug,
        excerpt: input
            .excerpt
            .map(|excerpt| excerpt.trim().to_string())
            .filter(|excerpt| !excerpt.is_empty()),
        content: input.content,
        featured_image,
        is_published: input.is_published,
        order: input.order,
        tag_ids,
    }
}

/// A unique-constraint race on the slug surfaces as a field error.
fn slug_conflict(err: RepoError) -> AdminError {
    match err {
        RepoError::Duplicate { constraint } if constraint.contains("slug") => {
            ValidationErrors::single("slug", "The slug has already been taken.").into()
        }
        other => AdminError::repo("post")(other),
    }
}
