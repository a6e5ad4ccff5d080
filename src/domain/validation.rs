//! Field-level validation collected into a single error.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const MAX_STRING_LEN: usize = 255;
pub const MAX_PHONE_LEN: usize = 20;

const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif"];
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Messages keyed by field name, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed for ")?;
        let mut first = true;
        for field in self.fields.keys() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "`{field}`")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field checks; call [`Validator::finish`] to get the result.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.add(field, format!("The {field} field is required."));
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.errors.add(
                field,
                format!("The {field} field must not be greater than {max} characters."),
            );
        }
        self
    }

    pub fn required_max(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            return self.required(field, value);
        }
        self.max_len(field, value, max)
    }

    pub fn optional_max(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.max_len(field, value, max);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.required(field, value);
        }
        if !is_email(value) {
            self.errors
                .add(field, format!("The {field} field must be a valid email address."));
        }
        self.max_len(field, value, MAX_STRING_LEN)
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) if !value.trim().is_empty() => self.email(field, value),
            _ => self,
        }
    }

    pub fn between<T>(&mut self, field: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if value < min || value > max {
            self.errors.add(
                field,
                format!("The {field} field must be between {min} and {max}."),
            );
        }
        self
    }

    pub fn at_least<T>(&mut self, field: &str, value: T, min: T) -> &mut Self
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if value < min {
            self.errors
                .add(field, format!("The {field} field must be at least {min}."));
        }
        self
    }

    pub fn finite(&mut self, field: &str, value: f64) -> &mut Self {
        if !value.is_finite() {
            self.errors.add(field, format!("The {field} field must be a number."));
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.errors
                .add(field, format!("The selected {field} is invalid."));
        }
        self
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.add(field, message);
        self
    }

    pub fn finish(&mut self) -> Result<(), ValidationErrors> {
        std::mem::take(&mut self.errors).into_result()
    }
}

fn is_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Kind of an accepted image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }
}

/// Check an uploaded image by extension, declared content type and size.
pub fn validate_image(
    field: &str,
    file_name: &str,
    declared_type: Option<&str>,
    size: u64,
    max_bytes: u64,
) -> Result<ImageKind, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let guessed = mime_guess::from_ext(&extension).first();

    let kind = match guessed.as_ref().map(|mime| mime.essence_str()) {
        Some("image/jpeg") if ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) => {
            Some(ImageKind::Jpeg)
        }
        Some("image/png") => Some(ImageKind::Png),
        Some("image/gif") => Some(ImageKind::Gif),
        _ => None,
    };

    if kind.is_none() {
        errors.add(
            field,
            format!("The {field} field must be a file of type: jpeg, png, jpg, gif."),
        );
    }

    if let Some(declared) = declared_type.map(str::trim).filter(|value| !value.is_empty()) {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or(declared)
            .trim()
            .to_ascii_lowercase();
        if essence != "application/octet-stream" && !ALLOWED_IMAGE_TYPES.contains(&essence.as_str())
        {
            errors.add(field, format!("The {field} field must be an image."));
        }
    }

    if size > max_bytes {
        errors.add(
            field,
            format!(
                "The {field} field must not be greater than {} kilobytes.",
                max_bytes / 1024
            ),
        );
    }

    match kind {
        Some(kind) if errors.is_empty() => Ok(kind),
        _ => Err(errors),
    }
}
