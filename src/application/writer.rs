//! Write path: commit through the repository, then invalidate.
//!
//! Invalidation runs only after the repository call returned successfully,
//! so any later miss recomputes from committed state. A failed write
//! invalidates nothing.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{
    CommentParams, ContentRepository, ContentWriteRepository, PostParams, Replaced, RepoError,
};
use crate::cache::{Change, InvalidationReport, Invalidator};
use crate::domain::entities::{
    CommentRecord, FaqRecord, MonthlyRevenueRecord, PostRecord, ProjectImageRecord, ProjectRecord,
    ReviewRecord, TagRecord,
};
use crate::domain::inputs::{FaqInput, ImageOrder, ProjectInput, RevenueInput, ReviewInput};

const SOURCE: &str = "nextconfig::application::writer";

/// A committed write and the outcome of its cache invalidation.
#[derive(Debug, Clone, Serialize)]
pub struct Committed<T> {
    pub value: T,
    #[serde(skip)]
    pub invalidation: InvalidationReport,
}

impl<T> Committed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            invalidation: self.invalidation,
        }
    }

    /// Fold an earlier write's report into this one.
    pub fn absorb(mut self, report: InvalidationReport) -> Self {
        self.invalidation.merge(report);
        self
    }
}

#[derive(Clone)]
pub struct ContentWriter {
    reads: Arc<dyn ContentRepository>,
    writes: Arc<dyn ContentWriteRepository>,
    invalidator: Invalidator,
}

impl ContentWriter {
    pub fn new(
        reads: Arc<dyn ContentRepository>,
        writes: Arc<dyn ContentWriteRepository>,
        invalidator: Invalidator,
    ) -> Self {
        Self {
            reads,
            writes,
            invalidator,
        }
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    async fn commit<T, Fut>(
        &self,
        write: Fut,
        change: impl FnOnce(&T) -> Change,
    ) -> Result<Committed<T>, RepoError>
    where
        Fut: Future<Output = Result<T, RepoError>>,
    {
        let value = write.await?;
        let change = change(&value);
        let invalidation = self.invalidator.invalidate(&change).await;
        debug!(
            target = SOURCE,
            entity = change.entity(),
            clean = invalidation.is_clean(),
            "write committed"
        );
        Ok(Committed {
            value,
            invalidation,
        })
    }

    pub async fn create_post(&self, params: PostParams) -> Result<Committed<PostRecord>, RepoError> {
        self.commit(self.writes.create_post(params), |post| {
            Change::post([post.slug.as_str()])
        })
        .await
    }

    /// Both the previous and the new slug are invalidated.
    pub async fn update_post(
        &self,
        id: i64,
        params: PostParams,
    ) -> Result<Committed<Replaced<PostRecord>>, RepoError> {
        self.commit(self.writes.update_post(id, params), |replaced| {
            Change::post([
                replaced.previous.slug.as_str(),
                replaced.current.slug.as_str(),
            ])
        })
        .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<Committed<PostRecord>, RepoError> {
        self.commit(self.writes.delete_post(id), |post| {
            Change::post([post.slug.as_str()])
        })
        .await
    }

    pub async fn create_tag(&self, name: &str, slug: &str) -> Result<Committed<TagRecord>, RepoError> {
        self.commit(self.writes.create_tag(name, slug), |_| Change::Tag)
            .await
    }

    pub async fn delete_tag(&self, id: i64) -> Result<Committed<TagRecord>, RepoError> {
        self.commit(self.writes.delete_tag(id), |_| Change::Tag).await
    }

    pub async fn create_comment(
        &self,
        params: CommentParams,
    ) -> Result<Committed<CommentRecord>, RepoError> {
        self.commit(self.writes.create_comment(params), comment_change)
            .await
    }

    pub async fn approve_comment(&self, id: i64) -> Result<Committed<CommentRecord>, RepoError> {
        self.commit(self.writes.set_comment_approved(id, true), comment_change)
            .await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<Committed<CommentRecord>, RepoError> {
        self.commit(self.writes.delete_comment(id), comment_change)
            .await
    }

    pub async fn create_review(
        &self,
        input: ReviewInput,
    ) -> Result<Committed<ReviewRecord>, RepoError> {
        self.commit(self.writes.create_review(input), |_| Change::Review)
            .await
    }

    pub async fn update_review(
        &self,
        id: i64,
        input: ReviewInput,
    ) -> Result<Committed<ReviewRecord>, RepoError> {
        self.commit(self.writes.update_review(id, input), |_| Change::Review)
            .await
    }

    pub async fn set_review_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<Committed<ReviewRecord>, RepoError> {
        self.commit(self.writes.set_review_approved(id, approved), |_| {
            Change::Review
        })
        .await
    }

    pub async fn delete_review(&self, id: i64) -> Result<Committed<ReviewRecord>, RepoError> {
        self.commit(self.writes.delete_review(id), |_| Change::Review)
            .await
    }

    pub async fn create_faq(&self, input: FaqInput) -> Result<Committed<FaqRecord>, RepoError> {
        self.commit(self.writes.create_faq(input), |_| Change::Faq).await
    }

    pub async fn update_faq(
        &self,
        id: i64,
        input: FaqInput,
    ) -> Result<Committed<FaqRecord>, RepoError> {
        self.commit(self.writes.update_faq(id, input), |_| Change::Faq)
            .await
    }

    pub async fn delete_faq(&self, id: i64) -> Result<Committed<FaqRecord>, RepoError> {
        self.commit(self.writes.delete_faq(id), |_| Change::Faq).await
    }

    pub async fn create_project(
        &self,
        input: ProjectInput,
    ) -> Result<Committed<ProjectRecord>, RepoError> {
        self.commit(self.writes.create_project(input), |_| Change::Project)
            .await
    }

    pub async fn update_project(
        &self,
        id: i64,
        input: ProjectInput,
    ) -> Result<Committed<ProjectRecord>, RepoError> {
        self.commit(self.writes.update_project(id, input), |_| {
            Change::Project
        })
        .await
    }

    pub async fn delete_project(&self, id: i64) -> Result<Committed<ProjectRecord>, RepoError> {
        self.commit(self.writes.delete_project(id), |_| Change::Project)
            .await
    }

    /// Append images to a project, after its existing ones, and resync its main image.
    pub async fn add_project_images(
        &self,
        project_id: i64,
        image_paths: &[String],
    ) -> Result<Committed<ProjectRecord>, RepoError> {
        self.commit(
            async {
                let project = self.load_project(project_id).await?;
                let mut order = project.next_image_order();
                for path in image_paths {
                    self.writes
                        .add_project_image(project_id, path, order)
                        .await?;
                    order = order.saturating_add(1);
                }
                self.sync_main_image(project_id).await
            },
            |_| Change::ProjectImage,
        )
        .await
    }

    /// Remove images that belong to the project; ids of other projects are ignored.
    pub async fn remove_project_images(
        &self,
        project_id: i64,
        image_ids: &[i64],
    ) -> Result<Committed<(ProjectRecord, Vec<ProjectImageRecord>)>, RepoError> {
        self.commit(
            async {
                self.load_project(project_id).await?;
                let mut removed = Vec::with_capacity(image_ids.len());
                for image_id in image_ids {
                    if let Some(image) = self
                        .writes
                        .delete_project_image(project_id, *image_id)
                        .await?
                    {
                        removed.push(image);
                    }
                }
                let project = self.sync_main_image(project_id).await?;
                Ok((project, removed))
            },
            |_| Change::ProjectImage,
        )
        .await
    }

    pub async fn reorder_project_images(
        &self,
        project_id: i64,
        orders: &[ImageOrder],
    ) -> Result<Committed<ProjectRecord>, RepoError> {
        self.commit(
            async {
                self.load_project(project_id).await?;
                for entry in orders {
                    self.writes
                        .set_project_image_order(project_id, entry.id, entry.order)
                        .await?;
                }
                self.sync_main_image(project_id).await
            },
            |_| Change::ProjectImage,
        )
        .await
    }

    pub async fn upsert_revenue(
        &self,
        input: RevenueInput,
    ) -> Result<Committed<MonthlyRevenueRecord>, RepoError> {
        self.commit(self.writes.upsert_revenue(input), |record| {
            Change::MonthlyRevenue { year: record.year }
        })
        .await
    }

    /// Invalidate every cached query. Revenue keys are enumerated from the
    /// stored years plus the window around the current year.
    pub async fn flush_cache(&self) -> Result<InvalidationReport, RepoError> {
        let mut years = self.reads.revenue_years().await?;
        let current = OffsetDateTime::now_utc().year();
        years.extend([current - 1, current, current + 1]);
        years.sort_unstable();
        years.dedup();
        Ok(self.invalidator.flush_all(&years).await)
    }

    async fn load_project(&self, project_id: i64) -> Result<ProjectRecord, RepoError> {
        self.reads
            .find_project(project_id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn sync_main_image(&self, project_id: i64) -> Result<ProjectRecord, RepoError> {
        let project = self.load_project(project_id).await?;
        if project.main_image_in_sync() {
            return Ok(project);
        }
        let main_image_id = project.main_image_candidate().map(|image| image.id);
        self.writes.set_main_image(project_id, main_image_id).await
    }
}

fn comment_change(comment: &CommentRecord) -> Change {
    Change::comment(comment.post_slug.clone())
}
