mod blog;
mod cache;
mod catalog;
mod dashboard;
mod forms;
mod moderation;
mod portfolio;
mod state;

pub use state::AdminState;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    middleware,
    response::Response,
    routing::{delete, get, patch, post, put},
};

use super::db_health_response;
use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState, upload_body_limit: usize) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard::admin_dashboard))
        .route(
            "/dashboard/monthly-revenue",
            post(dashboard::admin_monthly_revenue),
        )
        .route(
            "/faq",
            get(catalog::admin_faqs).post(catalog::admin_faq_create),
        )
        .route(
            "/faq/{id}",
            put(catalog::admin_faq_update).delete(catalog::admin_faq_delete),
        )
        .route(
            "/portfolio",
            get(portfolio::admin_portfolio_index)
                .post(portfolio::admin_portfolio_create)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/portfolio/{id}",
            post(portfolio::admin_portfolio_update)
                .delete(portfolio::admin_portfolio_delete)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/portfolio/{id}/images/order",
            post(portfolio::admin_portfolio_reorder_images),
        )
        .route(
            "/blog",
            get(blog::admin_blog_index)
                .post(blog::admin_blog_create)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/blog/{id}",
            post(blog::admin_blog_update)
                .delete(blog::admin_blog_delete)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/comments", get(moderation::admin_comments))
        .route(
            "/comments/{id}/approve",
            patch(moderation::admin_comment_approve),
        )
        .route("/comments/{id}", delete(moderation::admin_comment_delete))
        .route("/tags", post(catalog::admin_tag_create))
        .route("/tags/{id}", delete(catalog::admin_tag_delete))
        .route(
            "/reviews",
            get(moderation::admin_reviews).post(moderation::admin_review_create),
        )
        .route(
            "/reviews/{id}",
            put(moderation::admin_review_update).delete(moderation::admin_review_delete),
        )
        .route(
            "/reviews/{id}/approval",
            patch(moderation::admin_review_approval),
        )
        .route("/cache/flush", post(cache::flush_cache))
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.as_ref()).await
}
