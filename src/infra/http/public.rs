use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::application::content::ContentService;
use crate::application::images::{ImageContent, ImageStore};
use crate::application::repos::DatabaseProbe;
use crate::application::submissions::SubmissionService;
use crate::domain::entities::{FaqRecord, PostRecord, ProjectRecord, ReviewRecord};
use crate::domain::inputs::{CommentInput, ContactMessage, QuoteRequest, ReviewInput};

use super::db_health_response;
use super::error::{ApiError, committed_response};
use super::middleware::{log_responses, set_request_context};

/// Reviews shown on the home page.
pub const HOME_REVIEW_LIMIT: u32 = 6;

#[derive(Clone)]
pub struct PublicState {
    pub content: ContentService,
    pub submissions: SubmissionService,
    pub images: Arc<dyn ImageStore>,
    pub db: Arc<dyn DatabaseProbe>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/portfolio", get(portfolio))
        .route("/blog", get(blog_index))
        .route("/blog/{slug}", get(blog_show))
        .route("/blog/{slug}/comment", post(submit_comment))
        .route("/reviews", post(submit_review))
        .route("/contact/send", post(send_contact))
        .route("/devis/submit", post(submit_quote))
        .route("/faq", get(faq))
        .route("/uploads/{*path}", get(serve_image))
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Serialize)]
struct HomeBody {
    reviews: Vec<ReviewRecord>,
}

#[derive(Debug, Serialize)]
struct PortfolioBody {
    projects: Vec<ProjectRecord>,
}

#[derive(Debug, Serialize)]
struct BlogBody {
    posts: Vec<PostRecord>,
}

#[derive(Debug, Serialize)]
struct FaqBody {
    faqs: Vec<FaqRecord>,
}

#[derive(Debug, Serialize)]
struct AcceptedBody {
    message: &'static str,
}

async fn home(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let reviews = state.content.showcase_reviews(HOME_REVIEW_LIMIT).await?;
    Ok(Json(HomeBody { reviews }))
}

async fn portfolio(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.content.visible_projects().await?;
    Ok(Json(PortfolioBody { projects }))
}

async fn blog_index(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.content.published_posts().await?;
    Ok(Json(BlogBody { posts }))
}

async fn blog_show(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.post_detail(&slug).await?))
}

async fn faq(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let faqs = state.content.visible_faqs().await?;
    Ok(Json(FaqBody { faqs }))
}

async fn submit_comment(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    payload: Result<Json<CommentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.submissions.submit_comment(&slug, input).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

async fn submit_review(
    State(state): State<PublicState>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.submissions.submit_review(input).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

async fn send_contact(
    State(state): State<PublicState>,
    payload: Result<Json<ContactMessage>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(message) = payload?;
    state.submissions.send_contact(message).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedBody {
            message: "Your message has been sent.",
        }),
    ))
}

async fn submit_quote(
    State(state): State<PublicState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    state.submissions.submit_quote(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedBody {
            message: "Your quote request has been sent.",
        }),
    ))
}

async fn serve_image(
    State(state): State<PublicState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.images.open(&path).await?;
    Ok(build_image_response(content))
}

fn build_image_response(content: ImageContent) -> Response {
    let length = content.bytes.len();
    let mut response = Response::new(Body::from(content.bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<PublicState>) -> Response {
    db_health_response(state.db.as_ref()).await
}
