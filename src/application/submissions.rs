//! Visitor submissions from the public site.
//!
//! Comments and reviews enter moderation unapproved. Contact messages and
//! quote requests are forwarded to the configured recipient.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::mail::{MailError, Mailer, OutboundMail};
use crate::application::repos::{CommentParams, ContentRepository, PostFilter, RepoError};
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::{CommentRecord, ReviewRecord};
use crate::domain::inputs::{CommentInput, ContactMessage, QuoteRequest, ReviewInput};
use crate::domain::validation::ValidationErrors;

const SOURCE: &str = "nextconfig::application::submissions";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Clone)]
pub struct SubmissionService {
    reads: Arc<dyn ContentRepository>,
    writer: ContentWriter,
    mailer: Arc<dyn Mailer>,
    recipient: String,
}

impl SubmissionService {
    pub fn new(
        reads: Arc<dyn ContentRepository>,
        writer: ContentWriter,
        mailer: Arc<dyn Mailer>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            reads,
            writer,
            mailer,
            recipient: recipient.into(),
        }
    }

    /// Attach a comment to the post identified by `slug`, whether or not it is published.
    pub async fn submit_comment(
        &self,
        slug: &str,
        input: CommentInput,
    ) -> Result<Committed<CommentRecord>, SubmissionError> {
        let filter = PostFilter {
            slug: Some(slug.to_string()),
            ..PostFilter::default()
        };
        let post = self
            .reads
            .find_post(&filter)
            .await?
            .ok_or(SubmissionError::NotFound { entity: "post" })?;

        input.validate()?;

        let params = CommentParams {
            post_id: post.id,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            content: input.content,
            is_approved: false,
        };
        let committed = self.writer.create_comment(params).await?;
        info!(
            target = SOURCE,
            comment_id = committed.value.id,
            post_slug = %committed.value.post_slug,
            "comment submitted for moderation"
        );
        Ok(committed)
    }

    pub async fn submit_review(
        &self,
        input: ReviewInput,
    ) -> Result<Committed<ReviewRecord>, SubmissionError> {
        let input = input.into_submission();
        input.validate()?;

        let committed = self.writer.create_review(input).await?;
        info!(
            target = SOURCE,
            review_id = committed.value.id,
            rating = committed.value.rating,
            "review submitted for moderation"
        );
        Ok(committed)
    }

    pub async fn send_contact(&self, message: ContactMessage) -> Result<(), SubmissionError> {
        message.validate()?;

        let mut body = String::new();
        let _ = writeln!(body, "Name: {}", message.name);
        let _ = writeln!(body, "Email: {}", message.email);
        if let Some(phone) = message.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            let _ = writeln!(body, "Phone: {phone}");
        }
        let _ = writeln!(body);
        body.push_str(&message.message);

        self.mailer
            .send(OutboundMail {
                to: self.recipient.clone(),
                reply_to: message.email.clone(),
                subject: format!("Contact: {}", message.subject),
                body,
            })
            .await?;
        Ok(())
    }

    pub async fn submit_quote(&self, request: QuoteRequest) -> Result<(), SubmissionError> {
        request.validate()?;

        self.mailer
            .send(OutboundMail {
                to: self.recipient.clone(),
                reply_to: request.email.clone(),
                subject: format!("Quote request from {}", request.name),
                body: quote_body(&request),
            })
            .await?;
        Ok(())
    }
}

fn quote_body(request: &QuoteRequest) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "Name: {}", request.name);
    let _ = writeln!(body, "Email: {}", request.email);
    if let Some(phone) = request.phone.as_deref() {
        let _ = writeln!(body, "Phone: {phone}");
    }
    let _ = writeln!(body, "Usage: {}", request.usage_type);
    let _ = writeln!(body, "Details: {}", request.usage_details);
    let _ = writeln!(body, "Budget: {:.0} EUR", request.budget);
    if !request.preferred_brands.is_empty() {
        let _ = writeln!(body, "Preferred brands: {}", request.preferred_brands.join(", "));
    }
    match request.rgb_lighting {
        Some(true) => {
            let _ = writeln!(body, "RGB lighting: yes");
        }
        Some(false) => {
            let _ = writeln!(body, "RGB lighting: no");
        }
        None => {}
    }
    let _ = writeln!(body, "Timeframe: {}", request.timeframe);
    if let Some(notes) = request.additional_notes.as_deref() {
        let _ = writeln!(body);
        body.push_str(notes);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_body_lists_optional_fields_only_when_present() {
        let request = QuoteRequest {
            name: "Sam".to_string(),
            email: "sam@example.be".to_string(),
            phone: None,
            usage_type: "streaming".to_string(),
            usage_details: "OBS at 1080p60".to_string(),
            budget: 2500.0,
            preferred_brands: vec!["AMD".to_string(), "Corsair".to_string()],
            rgb_lighting: Some(false),
            timeframe: "asap".to_string(),
            additional_notes: None,
        };

        let body = quote_body(&request);
        assert!(body.contains("Budget: 2500 EUR"));
        assert!(body.contains("Preferred brands: AMD, Corsair"));
        assert!(body.contains("RGB lighting: no"));
        assert!(!body.contains("Phone:"));
    }
}
