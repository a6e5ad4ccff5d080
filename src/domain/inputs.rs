//! Write-side payloads and their validation rules.

use serde::{Deserialize, Serialize};

use super::validation::{MAX_PHONE_LEN, MAX_STRING_LEN, ValidationErrors, Validator};

pub const MAX_COMMENT_LEN: usize = 1000;
pub const MAX_REVIEW_COMMENT_LEN: usize = 150;
pub const MIN_REVENUE_YEAR: i32 = 2020;
pub const MIN_QUOTE_BUDGET: f64 = 500.0;
pub const MAX_QUOTE_BUDGET: f64 = 10_000.0;

pub const USAGE_TYPES: &[&str] = &["gaming", "streaming", "content_creation", "office", "other"];
pub const TIMEFRAMES: &[&str] = &["asap", "1month", "3months", "no_rush"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    pub order: i32,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("title", &self.title, MAX_STRING_LEN)
            .optional_max("slug", self.slug.as_deref(), MAX_STRING_LEN)
            .required("content", &self.content)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl TagInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("name", &self.name, MAX_STRING_LEN)
            .optional_max("slug", self.slug.as_deref(), MAX_STRING_LEN)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentInput {
    pub name: String,
    pub email: String,
    pub content: String,
}

impl CommentInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("name", &self.name, MAX_STRING_LEN)
            .email("email", &self.email)
            .required_max("content", &self.content, MAX_COMMENT_LEN)
            .finish()
    }
}

/// Review payload. Public submissions ignore the moderation flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub rating: i16,
    pub comment: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub order: i32,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("name", &self.name, MAX_STRING_LEN)
            .optional_email("email", self.email.as_deref())
            .between("rating", self.rating, 1, 5)
            .required_max("comment", &self.comment, MAX_REVIEW_COMMENT_LEN)
            .finish()
    }

    /// Strip moderation flags from a visitor submission.
    pub fn into_submission(self) -> Self {
        Self {
            is_approved: false,
            is_featured: false,
            order: 0,
            email: self.email.filter(|email| !email.trim().is_empty()),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

impl FaqInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("question", &self.question, MAX_STRING_LEN)
            .required("answer", &self.answer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub specs: Option<String>,
    pub order: i32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

impl ProjectInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("title", &self.title, MAX_STRING_LEN)
            .required("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RevenueInput {
    pub month: i16,
    pub year: i32,
    pub amount: f64,
}

impl RevenueInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .between("month", self.month, 1, 12)
            .at_least("year", self.year, MIN_REVENUE_YEAR)
            .finite("amount", self.amount)
            .at_least("amount", self.amount, 0.0)
            .finish()
    }
}

/// One entry of an image reordering request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageOrder {
    pub id: i64,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("name", &self.name, MAX_STRING_LEN)
            .email("email", &self.email)
            .optional_max("phone", self.phone.as_deref(), MAX_PHONE_LEN)
            .required_max("subject", &self.subject, MAX_STRING_LEN)
            .required("message", &self.message)
            .finish()
    }
}

/// A request for a custom build quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub usage_type: String,
    pub usage_details: String,
    pub budget: f64,
    #[serde(default)]
    pub preferred_brands: Vec<String>,
    #[serde(default)]
    pub rgb_lighting: Option<bool>,
    pub timeframe: String,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl QuoteRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required_max("name", &self.name, MAX_STRING_LEN)
            .email("email", &self.email)
            .optional_max("phone", self.phone.as_deref(), MAX_PHONE_LEN)
            .one_of("usage_type", &self.usage_type, USAGE_TYPES)
            .required("usage_details", &self.usage_details)
            .finite("budget", self.budget)
            .between("budget", self.budget, MIN_QUOTE_BUDGET, MAX_QUOTE_BUDGET)
            .one_of("timeframe", &self.timeframe, TIMEFRAMES)
            .finish()
    }
}

fn default_true() -> bool {
    true
}
