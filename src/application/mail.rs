//! Outbound mail for contact and quote requests.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

const SOURCE: &str = "nextconfig::application::mail";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        info!(
            target = SOURCE,
            to = %mail.to,
            reply_to = %mail.reply_to,
            subject = %mail.subject,
            body = %mail.body,
            "outbound mail"
        );
        Ok(())
    }
}
