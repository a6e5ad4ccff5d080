//! Application services for the administrative surface.

pub mod blog;
pub mod comments;
pub mod dashboard;
pub mod faqs;
pub mod portfolio;
pub mod reviews;
pub mod tags;

pub use blog::{AdminBlogService, PostCommand};
pub use comments::{AdminCommentService, CommentModerationView};
pub use dashboard::{AdminDashboardService, DashboardView};
pub use faqs::AdminFaqService;
pub use portfolio::{AdminPortfolioService, ProjectCommand};
pub use reviews::{AdminReviewService, ReviewListView};
pub use tags::AdminTagService;

use thiserror::Error;

use crate::application::content::ContentError;
use crate::application::images::ImageStorageError;
use crate::application::repos::RepoError;
use crate::domain::slug::{SlugAsyncError, SlugError};
use crate::domain::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Content(ContentError),
    #[error(transparent)]
    Image(#[from] ImageStorageError),
}

impl AdminError {
    /// Map a repository error, naming the entity a `NotFound` refers to.
    pub(crate) fn repo(entity: &'static str) -> impl Fn(RepoError) -> AdminError {
        move |err| match err {
            RepoError::NotFound => AdminError::NotFound { entity },
            other => AdminError::Repo(other),
        }
    }

    fn slug(field: &'static str, err: SlugError) -> AdminError {
        AdminError::Validation(ValidationErrors::single(field, err.to_string()))
    }
}

impl From<RepoError> for AdminError {
    fn from(err: RepoError) -> Self {
        AdminError::Repo(err)
    }
}

impl From<ContentError> for AdminError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound { entity } => AdminError::NotFound { entity },
            other => AdminError::Content(other),
        }
    }
}

impl From<SlugAsyncError<RepoError>> for AdminError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => AdminError::slug("slug", err),
            SlugAsyncError::Predicate(err) => AdminError::Repo(err),
        }
    }
}

impl From<SlugError> for AdminError {
    fn from(err: SlugError) -> Self {
        AdminError::slug("slug", err)
    }
}
