use serde::Serialize;
use tracing::info;

use crate::application::content::ContentService;
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::CommentRecord;

use super::AdminError;

const SOURCE: &str = "nextconfig::application::admin::comments";
const RECENT_APPROVED_LIMIT: u32 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct CommentModerationView {
    pub pending: Vec<CommentRecord>,
    pub approved: Vec<CommentRecord>,
    pub pending_count: u64,
}

#[derive(Clone)]
pub struct AdminCommentService {
    content: ContentService,
    writer: ContentWriter,
}

impl AdminCommentService {
    pub fn new(content: ContentService, writer: ContentWriter) -> Self {
        Self { content, writer }
    }

    /// Pending comments plus the most recent approved ones.
    pub async fn moderation_view(&self) -> Result<CommentModerationView, AdminError> {
        let pending = self.content.pending_comments().await?;
        let approved = self
            .content
            .approved_comments_latest(RECENT_APPROVED_LIMIT)
            .await?;
        let pending_count = self.content.pending_comment_count().await?;
        Ok(CommentModerationView {
            pending,
            approved,
            pending_count,
        })
    }

    pub async fn approve(&self, id: i64) -> Result<Committed<CommentRecord>, AdminError> {
        let committed = self
            .writer
            .approve_comment(id)
            .await
            .map_err(AdminError::repo("comment"))?;
        info!(target = SOURCE, comment_id = id, "comment approved");
        Ok(committed)
    }

    pub async fn delete(&self, id: i64) -> Result<Committed<CommentRecord>, AdminError> {
        let committed = self
            .writer
            .delete_comment(id)
            .await
            .map_err(AdminError::repo("comment"))?;
        info!(target = SOURCE, comment_id = id, "comment deleted");
        Ok(committed)
    }
}
