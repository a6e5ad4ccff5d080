//! FAQ and tag endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::inputs::{FaqInput, TagInput};

use super::super::error::{ApiError, committed_response};
use super::AdminState;

pub(super) async fn admin_faqs(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.faqs.list().await?))
}

pub(super) async fn admin_faq_create(
    State(state): State<AdminState>,
    payload: Result<Json<FaqInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.faqs.create(input).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

pub(super) async fn admin_faq_update(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    payload: Result<Json<FaqInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.faqs.update(id, input).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_faq_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.faqs.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_tag_create(
    State(state): State<AdminState>,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.tags.create(input).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

pub(super) async fn admin_tag_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.tags.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}
