//! Multipart form parsing for the blog and portfolio editors.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::MultipartError;

use crate::application::images::ImageUpload;
use crate::domain::validation::ValidationErrors;

use super::super::error::{ApiError, codes};

/// Text values and files of a submitted form. Array fields (`name[]`) are
/// stored under their bare name.
#[derive(Debug, Default)]
pub(super) struct FormData {
    values: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, Vec<ImageUpload>>,
}

impl FormData {
    pub(super) async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(raw_name) = field.name().map(str::to_string) else {
                continue;
            };
            let (name, is_array) = match raw_name.strip_suffix("[]") {
                Some(bare) => (bare.to_string(), true),
                None => (raw_name, false),
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(multipart_error)?;
                    // Browsers submit untouched file inputs as an empty, unnamed part.
                    if file_name.trim().is_empty() && data.is_empty() {
                        continue;
                    }
                    let files = form.files.entry(name.clone()).or_default();
                    let field_name = if is_array {
                        format!("{name}.{}", files.len())
                    } else {
                        name
                    };
                    files.push(ImageUpload {
                        field: field_name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.values.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// The trimmed value, empty when the field is missing.
    pub(super) fn text(&self, name: &str) -> String {
        self.first(name).map(str::trim).unwrap_or_default().to_string()
    }

    /// The value, or `None` when missing or blank.
    pub(super) fn optional_text(&self, name: &str) -> Option<String> {
        self.first(name)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    }

    pub(super) fn flag(&self, name: &str) -> bool {
        self.flag_or(name, false)
    }

    pub(super) fn flag_or(&self, name: &str, default: bool) -> bool {
        match self.first(name) {
            Some(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            ),
            None => default,
        }
    }

    /// Parse a numeric field; a blank or missing field yields `default`.
    pub(super) fn number<T: FromStr>(
        &self,
        name: &str,
        default: T,
        errors: &mut ValidationErrors,
    ) -> T {
        match self.first(name).map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => match value.parse() {
                Ok(parsed) => parsed,
                Err(_) => {
                    errors.add(name, format!("The {name} must be an integer."));
                    default
                }
            },
            None => default,
        }
    }

    /// Parse every non-blank value of an array field.
    pub(super) fn numbers<T: FromStr>(&self, name: &str, errors: &mut ValidationErrors) -> Vec<T> {
        let mut parsed = Vec::new();
        for value in self.values.get(name).into_iter().flatten() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match value.parse() {
                Ok(number) => parsed.push(number),
                Err(_) => errors.add(name, format!("The {name} must contain integers only.")),
            }
        }
        parsed
    }

    pub(super) fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files
            .get_mut(name)
            .and_then(|files| (!files.is_empty()).then(|| files.remove(0)))
    }

    pub(super) fn take_files(&mut self, name: &str) -> Vec<ImageUpload> {
        self.files.remove(name).unwrap_or_default()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(
            status,
            codes::PAYLOAD_TOO_LARGE,
            "Request body too large",
            Some(err.body_text()),
        )
    } else {
        ApiError::bad_request("Invalid form data", Some(err.body_text()))
    }
}
