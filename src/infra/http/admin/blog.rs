use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;

use crate::application::admin::PostCommand;
use crate::domain::inputs::PostInput;
use crate::domain::validation::ValidationErrors;

use super::super::error::{ApiError, committed_response};
use super::AdminState;
use super::forms::FormData;

pub(super) async fn admin_blog_index(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.list().await?))
}

pub(super) async fn admin_blog_create(
    State(state): State<AdminState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let command = post_command(FormData::read(multipart).await?)?;
    let committed = state.blog.create(command).await?;
    Ok(committed_response(StatusCode::CREATED, committed))
}

pub(super) async fn admin_blog_update(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let command = post_command(FormData::read(multipart).await?)?;
    let committed = state.blog.update(id, command).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

pub(super) async fn admin_blog_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let committed = state.blog.delete(id).await?;
    Ok(committed_response(StatusCode::OK, committed))
}

fn post_command(mut form: FormData) -> Result<PostCommand, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let input = PostInput {
        title: form.text("title"),
        slug: form.optional_text("slug"),
        excerpt: form.optional_text("excerpt"),
        content: form.optional_text("content").unwrap_or_default(),
        is_published: form.flag("is_published"),
        order: form.number("order", 0, &mut errors),
        tag_ids: form.numbers("tag_ids", &mut errors),
    };
    let delete_image = form.flag("delete_image");
    let image = form.take_file("image");

    errors.into_result()?;
    Ok(PostCommand {
        input,
        image,
        delete_image,
    })
}
