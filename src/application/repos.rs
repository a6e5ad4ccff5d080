//! Repository traits describing persistence adapters.
//!
//! Read traits follow one shape per entity: `list_*` with a filter, an order
//! and an optional limit, `count_*` with a filter, and `find_*` for a single
//! record. Write traits return the affected records so callers can derive
//! invalidation sets and clean up stored images.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    CommentRecord, FaqRecord, MonthlyRevenueRecord, PostRecord, ProjectImageRecord, ProjectRecord,
    ReviewRecord, TagRecord,
};
use crate::domain::inputs::{FaqInput, ProjectInput, RevenueInput, ReviewInput};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A record before and after an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Replaced<T> {
    pub previous: T,
    pub current: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub published: Option<bool>,
    pub id: Option<i64>,
    pub slug: Option<String>,
    /// Matches posts linked to any of these tags.
    pub any_tag_ids: Vec<i64>,
    pub exclude_id: Option<i64>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    /// `created_at` DESC, then `id` DESC.
    Newest,
    /// Explicit `order` ASC, then newest.
    Display,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostParams {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub order: i32,
    pub tag_ids: Vec<i64>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: Option<u32>,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn find_post(&self, filter: &PostFilter) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: PostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(
        &self,
        id: i64,
        params: PostParams,
    ) -> Result<Replaced<PostRecord>, RepoError>;

    /// Delete the post and, by cascade, its comments and tag links.
    async fn delete_post(&self, id: i64) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// All tags ordered by name.
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_tags(&self, ids: &[i64]) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, name: &str, slug: &str) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: i64) -> Result<TagRecord, RepoError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentFilter {
    pub approved: Option<bool>,
    pub post_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentParams {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub content: String,
    pub is_approved: bool,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments newest first, joined with their post.
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, RepoError>;

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CommentParams) -> Result<CommentRecord, RepoError>;

    async fn set_comment_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: i64) -> Result<CommentRecord, RepoError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub approved: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOrder {
    /// `created_at` DESC, then `id` DESC.
    Newest,
    /// Explicit `order` ASC, then newest.
    Display,
}

#[async_trait]
pub trait ReviewsRepo: Send + Sync {
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        order: ReviewOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, RepoError>;

    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<u64, RepoError>;

    /// `(rating, count)` pairs for every rating present.
    async fn rating_counts(&self) -> Result<Vec<(i16, u64)>, RepoError>;
}

#[async_trait]
pub trait ReviewsWriteRepo: Send + Sync {
    async fn create_review(&self, input: ReviewInput) -> Result<ReviewRecord, RepoError>;

    async fn update_review(&self, id: i64, input: ReviewInput) -> Result<ReviewRecord, RepoError>;

    async fn set_review_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<ReviewRecord, RepoError>;

    async fn delete_review(&self, id: i64) -> Result<ReviewRecord, RepoError>;
}

#[async_trait]
pub trait FaqsRepo: Send + Sync {
    /// FAQs by `order`; hidden entries only when `include_hidden`.
    async fn list_faqs(&self, include_hidden: bool) -> Result<Vec<FaqRecord>, RepoError>;
}

#[async_trait]
pub trait FaqsWriteRepo: Send + Sync {
    async fn create_faq(&self, input: FaqInput) -> Result<FaqRecord, RepoError>;

    async fn update_faq(&self, id: i64, input: FaqInput) -> Result<FaqRecord, RepoError>;

    async fn delete_faq(&self, id: i64) -> Result<FaqRecord, RepoError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOrder {
    /// Explicit `order` ASC, then `id` ASC.
    Display,
    /// `created_at` DESC, then `id` DESC.
    Newest,
}

#[async_trait]
pub trait ProjectsRepo: Send + Sync {
    /// Projects with their images ordered by `order`.
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        order: ProjectOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ProjectRecord>, RepoError>;

    async fn count_projects(&self, filter: &ProjectFilter) -> Result<u64, RepoError>;

    async fn find_project(&self, id: i64) -> Result<Option<ProjectRecord>, RepoError>;
}

#[async_trait]
pub trait ProjectsWriteRepo: Send + Sync {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectRecord, RepoError>;

    async fn update_project(&self, id: i64, input: ProjectInput)
    -> Result<ProjectRecord, RepoError>;

    /// Delete the project and, by cascade, its images.
    async fn delete_project(&self, id: i64) -> Result<ProjectRecord, RepoError>;

    async fn add_project_image(
        &self,
        project_id: i64,
        image_path: &str,
        order: i32,
    ) -> Result<ProjectImageRecord, RepoError>;

    /// Delete an image of `project_id`; `None` when it belongs to another project.
    async fn delete_project_image(
        &self,
        project_id: i64,
        image_id: i64,
    ) -> Result<Option<ProjectImageRecord>, RepoError>;

    /// Set the order of an image of `project_id`; `false` when it belongs to another project.
    async fn set_project_image_order(
        &self,
        project_id: i64,
        image_id: i64,
        order: i32,
    ) -> Result<bool, RepoError>;

    /// Mark `main_image_id` as the only main image and mirror its path on the project.
    async fn set_main_image(
        &self,
        project_id: i64,
        main_image_id: Option<i64>,
    ) -> Result<ProjectRecord, RepoError>;
}

#[async_trait]
pub trait RevenueRepo: Send + Sync {
    async fn list_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenueRecord>, RepoError>;

    async fn sum_revenue(&self, year: i32) -> Result<f64, RepoError>;

    /// Distinct years with at least one record, ascending.
    async fn revenue_years(&self) -> Result<Vec<i32>, RepoError>;
}

#[async_trait]
pub trait RevenueWriteRepo: Send + Sync {
    /// Insert or replace the amount of `(month, year)`.
    async fn upsert_revenue(&self, input: RevenueInput)
    -> Result<MonthlyRevenueRecord, RepoError>;
}

#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Every read repository, as consumed by the cached accessors.
pub trait ContentRepository:
    PostsRepo + TagsRepo + CommentsRepo + ReviewsRepo + FaqsRepo + ProjectsRepo + RevenueRepo
{
}

impl<T> ContentRepository for T where
    T: PostsRepo + TagsRepo + CommentsRepo + ReviewsRepo + FaqsRepo + ProjectsRepo + RevenueRepo
{
}

/// Every write repository, as consumed by the write path.
pub trait ContentWriteRepository:
    PostsWriteRepo
    + TagsWriteRepo
    + CommentsWriteRepo
    + ReviewsWriteRepo
    + FaqsWriteRepo
    + ProjectsWriteRepo
    + RevenueWriteRepo
{
}

impl<T> ContentWriteRepository for T where
    T: PostsWriteRepo
        + TagsWriteRepo
        + CommentsWriteRepo
        + ReviewsWriteRepo
        + FaqsWriteRepo
        + ProjectsWriteRepo
        + RevenueWriteRepo
{
}
