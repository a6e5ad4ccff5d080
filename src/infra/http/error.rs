//! JSON error bodies shared by the public and admin listeners.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::AdminError;
use crate::application::content::ContentError;
use crate::application::error::ErrorReport;
use crate::application::images::ImageStorageError;
use crate::application::repos::RepoError;
use crate::application::submissions::SubmissionError;
use crate::application::writer::Committed;
use crate::cache::InvalidationReport;
use crate::domain::validation::ValidationErrors;

const SOURCE: &str = "nextconfig::http::error";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_failed";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const IMAGE: &str = "image_error";
    pub const MAIL: &str = "mail_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    fields: Option<ValidationErrors>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            fields: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(format!("{entity} not found")),
        )
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: codes::VALIDATION,
            message: "The given data was invalid",
            hint: None,
            fields: Some(errors),
        }
    }

    pub fn from_repo(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => Self::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Resource not found",
                None,
            ),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }

    fn from_image(err: ImageStorageError) -> Self {
        match err {
            ImageStorageError::InvalidPath | ImageStorageError::NotFound => Self::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Image not found",
                None,
            ),
            ImageStorageError::EmptyPayload => Self::new(
                StatusCode::BAD_REQUEST,
                codes::IMAGE,
                "Uploaded image is empty",
                None,
            ),
            ImageStorageError::Io(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::IMAGE,
                "Image storage failed",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        Self::from_repo(err)
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound { entity } => Self::not_found(entity),
            ContentError::Repo(err) => Self::from_repo(err),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(errors) => Self::validation(errors),
            AdminError::NotFound { entity } => Self::not_found(entity),
            AdminError::Repo(err) => Self::from_repo(err),
            AdminError::Content(err) => Self::from(err),
            AdminError::Image(err) => Self::from_image(err),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(errors) => Self::validation(errors),
            SubmissionError::NotFound { entity } => Self::not_found(entity),
            SubmissionError::Repo(err) => Self::from_repo(err),
            SubmissionError::Mail(err) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::MAIL,
                "Message could not be delivered",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            codes::BAD_REQUEST,
            "Malformed JSON body",
            Some(rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Malformed query string", Some(rejection.body_text()))
    }
}

impl From<ImageStorageError> for ApiError {
    fn from(err: ImageStorageError) -> Self {
        Self::from_image(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match (&self.hint, &self.fields) {
            (Some(hint), _) => hint.clone(),
            (None, Some(fields)) => fields.to_string(),
            (None, None) => self.message.to_string(),
        };
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
                fields: self.fields,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(SOURCE, self.status, format!("{}: {detail}", self.code))
            .attach(&mut response);
        response
    }
}

/// Success body of a write; `warnings` lists cache keys that could not be invalidated.
#[derive(Debug, Serialize)]
pub struct WriteBody<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> WriteBody<T> {
    pub fn new(data: T, report: &InvalidationReport) -> Self {
        Self {
            data,
            warnings: report.warnings(),
        }
    }
}

impl<T> From<Committed<T>> for WriteBody<T> {
    fn from(committed: Committed<T>) -> Self {
        Self::new(committed.value, &committed.invalidation)
    }
}

/// Render a committed write with the given status.
pub fn committed_response<T: Serialize>(status: StatusCode, committed: Committed<T>) -> Response {
    (status, Json(WriteBody::from(committed))).into_response()
}
