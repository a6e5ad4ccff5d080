use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::application::content::ContentService;
use crate::application::repos::{ContentRepository, ReviewFilter, ReviewOrder};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::ReviewRecord;
use crate::domain::inputs::ReviewInput;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::reviews";

#[derive(Debug, Clone, Serialize)]
pub struct ReviewListView {
    pub reviews: Vec<ReviewRecord>,
    pub pending_count: u64,
}

#[derive(Clone)]
pub struct AdminReviewService {
    reads: Arc<dyn ContentRepository>,
    content: ContentService,
    writer: ContentWriter,
}

impl AdminReviewService {
    pub fn new(
        reads: Arc<dyn ContentRepository>,
        content: ContentService,
        writer: ContentWriter,
    ) -> Self {
        Self {
            reads,
            content,
            writer,
        }
    }

    /// Every review, newest first.
    pub async fn list(&self) -> Result<ReviewListView, AdminError> {
        let reviews = self
            .reads
            .list_reviews(&ReviewFilter::default(), ReviewOrder::Newest, None)
            .await?;
        let pending_count = self.content.pending_review_count().await?;
        Ok(ReviewListView {
            reviews,
            pending_count,
        })
    }

    pub async fn create(&self, input: ReviewInput) -> Result<Committed<ReviewRecord>, AdminError> {
        input.validate()?;
        let committed = self.writer.create_review(input).await?;
        info!(target = SOURCE, review_id = committed.value.id, "review created");
        Ok(committed)
    }

    pub async fn update(
        &self,
        id: i64,
        input: ReviewInput,
    ) -> Result<Committed<ReviewRecord>, AdminError> {
        input.validate()?;
        self.writer
            .update_review(id, input)
            .await
            .map_err(AdminError::repo("review"))
    }

    pub async fn set_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<Committed<ReviewRecord>, AdminError> {
        let committed = self
            .writer
            .set_review_approved(id, approved)
            .await
            .map_err(AdminError::repo("review"))?;
        info!(target = SOURCE, review_id = id, approved, "review moderated");
        Ok(committed)
    }

    pub async fn delete(&self, id: i64) -> Result<Committed<ReviewRecord>, AdminError> {
        self.writer
            .delete_review(id)
            .await
            .map_err(AdminError::repo("review"))
    }
}
