//! Back-office dashboard: counts, revenue and recent activity.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::application::content::ContentService;
use crate::application::repos::{
    CommentFilter, ContentRepository, PostFilter, PostOrder, ProjectFilter, ProjectOrder,
    ReviewFilter, ReviewOrder,
};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::{
    CommentRecord, MonthlyRevenueRecord, PostRecord, ProjectRecord,
    RatingDistribution, ReviewRecord,
};
use crate::domain::inputs::RevenueInput;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::dashboard";
const RECENT_REVIEWS: u32 = 5;
const RECENT_PROJECTS: u32 = 5;
const RECENT_POSTS: u32 = 3;
const RECENT_COMMENTS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub projects: u64,
    pub reviews: u64,
    pub posts: u64,
    pub comments: u64,
    pub pending_comments: u64,
    pub pending_reviews: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueView {
    pub year: i32,
    pub months: [f64; 12],
    pub total: f64,
    pub available_years: Vec<i32>,
    pub current_month: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub reviews: Vec<ReviewRecord>,
    pub projects: Vec<ProjectRecord>,
    pub posts: Vec<PostRecord>,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub ratings: RatingDistribution,
    pub revenue: RevenueView,
    pub recent: RecentActivity,
}

#[derive(Clone)]
pub struct AdminDashboardService {
    reads: Arc<dyn ContentRepository>,
    content: ContentService,
    writer: ContentWriter,
}

impl AdminDashboardService {
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

    /// Dashboard for `year`, defaulting to the current year.
    pub async fn view(&self, year: Option<i32>) -> Result<DashboardView, AdminError> {
        let now = OffsetDateTime::now_utc();
        let year = year.unwrap_or_else(|| now.year());

        let stats = DashboardStats {
            projects: self.content.project_count().await?,
            reviews: self.content.review_count().await?,
            posts: self.content.post_count().await?,
            comments: self.content.comment_count().await?,
            pending_comments: self.content.pending_comment_count().await?,
            pending_reviews: self.content.pending_review_count().await?,
        };
        let ratings = self.content.review_rating_distribution().await?;

        let monthly = self.content.monthly_revenue(year).await?;
        let total = self.content.total_revenue(year).await?;
        let available_years = self.content.available_years().await?;
        let current_month = if year == now.year() {
            monthly.month(u8::from(now.month()))
        } else {
            self.content
                .monthly_revenue(now.year())
                .await?
                .month(u8::from(now.month()))
        };

        let revenue = RevenueView {
            year,
            months: monthly.months,
            total,
            available_years,
            current_month,
        };

        Ok(DashboardView {
            stats,
            ratings,
            revenue,
            recent: self.recent_activity().await?,
        })
    }

    pub async fn upsert_revenue(
        &self,
        input: RevenueInput,
    ) -> Result<Committed<MonthlyRevenueRecord>, AdminError> {
        input.validate()?;
        let committed = self.writer.upsert_revenue(input).await?;
        info!(
            target = SOURCE,
            month = input.month,
            year = input.year,
            "monthly revenue recorded"
        );
        Ok(committed)
    }

    async fn recent_activity(&self) -> Result<RecentActivity, AdminError> {
        let reviews = self
            .reads
            .list_reviews(
                &ReviewFilter::default(),
                ReviewOrder::Newest,
                Some(RECENT_REVIEWS),
            )
            .await?;
        let projects = self
            .reads
            .list_projects(
                &ProjectFilter::default(),
                ProjectOrder::Newest,
                Some(RECENT_PROJECTS),
            )
            .await?;
        let posts = self
            .reads
            .list_posts(&PostFilter::default(), PostOrder::Newest, Some(RECENT_POSTS))
            .await?;
        let comments = self
            .reads
            .list_comments(&CommentFilter::default(), Some(RECENT_COMMENTS))
            .await?;

        Ok(RecentActivity {
            reviews,
            projects,
            posts,
            comments,
        })
    }
}
