mod admin;
pub mod error;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use error::{ApiError, ApiErrorBody, WriteBody};
pub use public::{PublicState, build_public_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::{DatabaseProbe, RepoError};

async fn db_health_response(db: &dyn DatabaseProbe) -> Response {
    match db.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => db_unavailable(&err),
    }
}

fn db_unavailable(err: &RepoError) -> Response {
    let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
    ErrorReport::from_error(
        "nextconfig::http::db_health",
        StatusCode::SERVICE_UNAVAILABLE,
        err,
    )
    .attach(&mut response);
    response
}
