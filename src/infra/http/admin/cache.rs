use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::info;

use super::super::error::ApiError;
use super::AdminState;

#[derive(Debug, Serialize)]
struct FlushBody {
    attempted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub(super) async fn flush_cache(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.writer.flush_cache().await?;
    info!(
        target = "nextconfig::http::admin::cache",
        attempted = report.attempted,
        failed = report.failures.len(),
        "cache flushed"
    );
    Ok(Json(FlushBody {
        attempted: report.attempted,
        warnings: report.warnings(),
    }))
}
