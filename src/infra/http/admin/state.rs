use std::sync::Arc;

use crate::application::admin::{
    AdminBlogService, AdminCommentService, AdminDashboardService, AdminFaqService,
    AdminPortfolioService, AdminReviewService, AdminTagService,
};
use crate::application::repos::DatabaseProbe;
use crate::application::writer::ContentWriter;

#[derive(Clone)]
pub struct AdminState {
    pub dashboard: Arc<AdminDashboardService>,
    pub blog: Arc<AdminBlogService>,
    pub portfolio: Arc<AdminPortfolioService>,
    pub comments: Arc<AdminCommentService>,
    pub reviews: Arc<AdminReviewService>,
    pub faqs: Arc<AdminFaqService>,
    pub tags: Arc<AdminTagService>,
    pub writer: ContentWriter,
    pub db: Arc<dyn DatabaseProbe>,
}
