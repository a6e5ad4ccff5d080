use crate::application::content::ContentService;
use crate::application::writer::{Committed, ContentWriter};
use crate::domain::entities::FaqRecord;
use crate::domain::inputs::FaqInput;

use super::AdminError;

#[derive(Clone)]
pub struct AdminFaqService {
    content: ContentService,
    writer: ContentWriter,
}

impl AdminFaqService {
    pub fn new(content: ContentService, writer: ContentWriter) -> Self {
        Self { content, writer }
    }

    pub async fn list(&self) -> Result<Vec<FaqRecord>, AdminError> {
        Ok(self.content.all_faqs().await?)
    }

    pub async fn create(&self, input: FaqInput) -> Result<Committed<FaqRecord>, AdminError> {
        input.validate()?;
        Ok(self.writer.create_faq(input).await?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: FaqInput,
    ) -> Result<Committed<FaqRecord>, AdminError> {
        input.validate()?;
        self.writer
            .update_faq(id, input)
            .await
            .map_err(AdminError::repo("faq"))
    }

    pub async fn delete(&self, id: i64) -> Result<Committed<FaqRecord>, AdminError> {
        self.writer
            .delete_faq(id)
            .await
            .map_err(AdminError::repo("faq"))
    }
}
