use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::application::admin::ProjectCommand;
use crate::domain::inputs::{ImageOrder, ProjectInput};
use crate::domain::validation::ValidationErrors;

use super::super::error::{ApiError, committed_response};
use super::AdminState;
use super::forms::FormData;

#[derive(Debug, Deserialize)]
pub(super) struct ImageOrderRequest {
    images: Vec<ImageOrder>,
}

pub(super) async fn admin_portfolio_index(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.portfolio.list().await?))
}

pub(super) async fn admin_portfolio_create(
    State(state): State<AdminState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let command = project_command(FormData::read(multipart).await?)?;
    let committed = state.portfolio.create(command).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

pub(super) async fn admin_portfolio_update(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let command = project_command(FormData::read(multipart).await?)?;
    let committed = state.portfolio.update(id, command).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_portfolio_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.portfolio.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_portfolio_reorder_images(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    payload: Result<Json<ImageOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let committed = state.portfolio.reorder_images(id, &request.images).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

fn project_command(mut form: FormData) -> Result<ProjectCommand, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let input = ProjectInput {
        title: form.text("title"),
        description: form.optional_text("description").unwrap_or_default(),
        specs: form.optional_text("specs"),
        order: form.number("order", 0, &mut errors),
        is_featured: form.flag("is_featured"),
        is_visible: form.flag_or("is_visible", true),
    };
    let delete_images = form.numbers("delete_images", &mut errors);
    let images = form.take_files("images");

    errors.into_result()?;
    Ok(ProjectCommand {
        input,
        images,
        delete_images,
    })
}
