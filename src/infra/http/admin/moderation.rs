use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::domain::inputs::ReviewInput;

use super::super::error::{ApiError, committed_response};
use super::AdminState;

#[derive(Debug, Deserialize)]
pub(super) struct ApprovalRequest {
    approved: bool,
}

pub(super) async fn admin_comments(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.comments.moderation_view().await?))
}

pub(super) async fn admin_comment_approve(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.comments.approve(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_comment_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.comments.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_reviews(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reviews.list().await?))
}

pub(super) async fn admin_review_create(
    State(state): State<AdminState>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.reviews.create(input).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

pub(super) async fn admin_review_update(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.reviews.update(id, input).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_review_approval(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    payload: Result<Json<ApprovalRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let committed = state.reviews.set_approval(id, request.approved).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_review_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.reviews.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}
