use axum::{
    Json,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::domain::inputs::RevenueInput;

use super::super::error::{ApiError, committed_response};
use super::AdminState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DashboardQuery {
    year: Option<i32>,
}

pub(super) async fn admin_dashboard(
    State(state): State<AdminState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.dashboard.view(query.year).await?))
}

pub(super) async fn admin_monthly_revenue(
    State(state): State<AdminState>,
    payload: Result<Json<RevenueInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let committed = state.dashboard.upsert_revenue(input).await?;
    Ok(committed_response(StatusCode::OK, committed))
}
