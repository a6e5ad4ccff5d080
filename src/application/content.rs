//! Cached read accessors.
//!
//! One method per logical query. Each derives its key from `cache::keys`,
//! picks a TTL by write frequency and runs the repository query on a miss.
//! Callers never learn whether a value came from the cache.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::application::repos::{
    CommentFilter, ContentRepository, PostFilter, PostOrder, ProjectFilter, ProjectOrder,
    RepoError, ReviewFilter, ReviewOrder,
};
use crate::cache::{CacheAside, CacheStore, ScopedKey, TtlClass, TtlPolicy, keys};
use crate::domain::entities::{
    CommentRecord, FaqRecord, MonthlyRevenue, PostDetail, PostRecord, ProjectRecord,
    RatingDistribution, ReviewRecord, TagRecord,
};

pub const RELATED_POSTS_LIMIT: u32 = 3;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    cache: CacheAside,
    ttl: TtlPolicy,
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepository>, store: Arc<dyn CacheStore>, ttl: TtlPolicy) -> Self {
        Self {
            repo,
            cache: CacheAside::new(store),
            ttl,
        }
    }

    fn ttl(&self, class: TtlClass) -> std::time::Duration {
        self.ttl.ttl(class)
    }

    /// Published posts, newest first, with their tags.
    pub async fn published_posts(&self) -> Result<Vec<PostRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::BLOG_POSTS, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo
                    .list_posts(&PostFilter::published(), PostOrder::Newest, None)
                    .await?)
            })
            .await
    }

    /// A published post with its approved comments and related posts.
    ///
    /// Unknown or unpublished slugs yield [`ContentError::NotFound`], which is
    /// never cached.
    pub async fn post_detail(&self, slug: &str) -> Result<PostDetail, ContentError> {
        let repo = &self.repo;
        let key = ScopedKey::post_detail(slug);
        self.cache
            .fetch_scoped(&key, self.ttl(TtlClass::Editorial), || async move {
                let filter = PostFilter {
                    slug: Some(slug.to_string()),
                    ..PostFilter::published()
                };
                let post = repo
                    .find_post(&filter)
                    .await?
                    .ok_or(ContentError::NotFound { entity: "post" })?;

                let comments = repo
                    .list_comments(
                        &CommentFilter {
                            approved: Some(true),
                            post_id: Some(post.id),
                        },
                        None,
                    )
                    .await?;

                let related = if post.tags.is_empty() {
                    Vec::new()
                } else {
                    let filter = PostFilter {
                        any_tag_ids: post.tags.iter().map(|tag| tag.id).collect(),
                        exclude_id: Some(post.id),
                        ..PostFilter::published()
                    };
                    repo.list_posts(&filter, PostOrder::Newest, Some(RELATED_POSTS_LIMIT))
                        .await?
                };

                Ok(PostDetail {
                    post,
                    comments,
                    related,
                })
            })
            .await
    }

    pub async fn all_tags(&self) -> Result<Vec<TagRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::TAGS, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo.list_tags().await?)
            })
            .await
    }

    pub async fn post_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::POST_COUNT, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo.count_posts(&PostFilter::default()).await?)
            })
            .await
    }

    /// Latest approved comments across all posts, newest first.
    pub async fn approved_comments_latest(
        &self,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, ContentError> {
        let repo = &self.repo;
        let key = ScopedKey::ApprovedComments { limit };
        self.cache
            .fetch_scoped(&key, self.ttl(TtlClass::Volatile), || async move {
                let filter = CommentFilter {
                    approved: Some(true),
                    post_id: None,
                };
                Ok(repo.list_comments(&filter, Some(limit)).await?)
            })
            .await
    }

    pub async fn pending_comments(&self) -> Result<Vec<CommentRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                keys::PENDING_COMMENTS,
                self.ttl(TtlClass::Volatile),
                || async move {
                    let filter = CommentFilter {
                        approved: Some(false),
                        post_id: None,
                    };
                    Ok(repo.list_comments(&filter, None).await?)
                },
            )
            .await
    }

    pub async fn pending_comment_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                keys::PENDING_COMMENT_COUNT,
                self.ttl(TtlClass::Volatile),
                || async move {
                    let filter = CommentFilter {
                        approved: Some(false),
                        post_id: None,
                    };
                    Ok(repo.count_comments(&filter).await?)
                },
            )
            .await
    }

    pub async fn comment_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::COMMENT_COUNT, self.ttl(TtlClass::Volatile), || async move {
                Ok(repo.count_comments(&CommentFilter::default()).await?)
            })
            .await
    }

    /// Approved, featured reviews by explicit order, then newest.
    pub async fn featured_reviews(&self, limit: u32) -> Result<Vec<ReviewRecord>, ContentError> {
        let repo = &self.repo;
        let key = ScopedKey::FeaturedReviews { limit };
        self.cache
            .fetch_scoped(&key, self.ttl(TtlClass::Volatile), || async move {
                Ok(repo
                    .list_reviews(&featured_filter(), ReviewOrder::Display, Some(limit))
                    .await?)
            })
            .await
    }

    /// Featured reviews, topped up with the newest approved non-featured ones.
    pub async fn showcase_reviews(&self, limit: u32) -> Result<Vec<ReviewRecord>, ContentError> {
        let repo = &self.repo;
        let key = ScopedKey::ShowcaseReviews { limit };
        self.cache
            .fetch_scoped(&key, self.ttl(TtlClass::Volatile), || async move {
                let mut reviews = repo
                    .list_reviews(&featured_filter(), ReviewOrder::Display, Some(limit))
                    .await?;

                let remaining = limit.saturating_sub(u32::try_from(reviews.len()).unwrap_or(limit));
                if remaining > 0 {
                    let filter = ReviewFilter {
                        approved: Some(true),
                        featured: Some(false),
                    };
                    let latest = repo
                        .list_reviews(&filter, ReviewOrder::Newest, Some(remaining))
                        .await?;
                    reviews.extend(latest);
                }

                Ok(reviews)
            })
            .await
    }

    pub async fn review_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::REVIEW_COUNT, self.ttl(TtlClass::Volatile), || async move {
                Ok(repo.count_reviews(&ReviewFilter::default()).await?)
            })
            .await
    }

    pub async fn pending_review_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                keys::PENDING_REVIEW_COUNT,
                self.ttl(TtlClass::Volatile),
                || async move {
                    let filter = ReviewFilter {
                        approved: Some(false),
                        featured: None,
                    };
                    Ok(repo.count_reviews(&filter).await?)
                },
            )
            .await
    }

    pub async fn review_rating_distribution(&self) -> Result<RatingDistribution, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                keys::REVIEW_RATINGS,
                self.ttl(TtlClass::Volatile),
                || async move {
                    Ok(RatingDistribution::from_counts(
                        repo.rating_counts().await?,
                    ))
                },
            )
            .await
    }

    pub async fn visible_faqs(&self) -> Result<Vec<FaqRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::VISIBLE_FAQS, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo.list_faqs(false).await?)
            })
            .await
    }

    pub async fn all_faqs(&self) -> Result<Vec<FaqRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::ALL_FAQS, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo.list_faqs(true).await?)
            })
            .await
    }

    pub async fn visible_projects(&self) -> Result<Vec<ProjectRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                keys::VISIBLE_PROJECTS,
                self.ttl(TtlClass::Editorial),
                || async move {
                    let filter = ProjectFilter {
                        visible: Some(true),
                    };
                    Ok(repo
                        .list_projects(&filter, ProjectOrder::Display, None)
                        .await?)
                },
            )
            .await
    }

    pub async fn all_projects(&self) -> Result<Vec<ProjectRecord>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::ALL_PROJECTS, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo
                    .list_projects(&ProjectFilter::default(), ProjectOrder::Display, None)
                    .await?)
            })
            .await
    }

    pub async fn project_count(&self) -> Result<u64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::PROJECT_COUNT, self.ttl(TtlClass::Editorial), || async move {
                Ok(repo.count_projects(&ProjectFilter::default()).await?)
            })
            .await
    }

    /// Revenue per month of `year`; months without a record are 0.
    pub async fn monthly_revenue(&self, year: i32) -> Result<MonthlyRevenue, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                &keys::monthly_revenue(year),
                self.ttl(TtlClass::Static),
                || async move {
                    let records = repo.list_revenue(year).await?;
                    Ok(MonthlyRevenue::from_records(year, &records))
                },
            )
            .await
    }

    pub async fn total_revenue(&self, year: i32) -> Result<f64, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(
                &keys::total_revenue(year),
                self.ttl(TtlClass::Static),
                || async move { Ok(repo.sum_revenue(year).await?) },
            )
            .await
    }

    /// Years with stored revenue plus the current year and its neighbours,
    /// ascending. Only the stored years are cached, so the window follows the
    /// clock even while the cached list is live.
    pub async fn available_years(&self) -> Result<Vec<i32>, ContentError> {
        let stored = self.stored_revenue_years().await?;
        Ok(merge_years(stored, OffsetDateTime::now_utc().year()))
    }

    /// Distinct years that hold at least one revenue record.
    pub async fn stored_revenue_years(&self) -> Result<Vec<i32>, ContentError> {
        let repo = &self.repo;
        self.cache
            .fetch_or_compute(keys::REVENUE_YEARS, self.ttl(TtlClass::Static), || async move {
                Ok(repo.revenue_years().await?)
            })
            .await
    }
}

fn featured_filter() -> ReviewFilter {
    ReviewFilter {
        approved: Some(true),
        featured: Some(true),
    }
}

fn merge_years(mut years: Vec<i32>, current: i32) -> Vec<i32> {
    years.extend([current - 1, current, current + 1]);
    years.sort_unstable();
    years.dedup();
    years
}
