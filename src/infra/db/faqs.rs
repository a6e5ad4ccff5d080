use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{FaqsRepo, FaqsWriteRepo, RepoError};
use crate::domain::entities::FaqRecord;
use crate::domain::inputs::FaqInput;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FaqRow {
    id: i64,
    question: String,
    answer: String,
    order: i32,
    is_visible: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<FaqRow> for FaqRecord {
    fn from(row: FaqRow) -> Self {
        Self {
            id: row.id,
            question: row.question,
            answer: row.answer,
            order: row.order,
            is_visible: row.is_visible,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl FaqsRepo for PostgresRepositories {
    async fn list_faqs(&self, include_hidden: bool) -> Result<Vec<FaqRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FaqRow>(
            r#"
            SELECT id, question, answer, "order", is_visible, created_at, updated_at
            FROM faqs
            WHERE $1 OR is_visible
            ORDER BY "order" ASC, id ASC
            "#,
        )
        .bind(include_hidden)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FaqRecord::from).collect())
    }
}

#[async_trait]
impl FaqsWriteRepo for PostgresRepositories {
    async fn create_faq(&self, input: FaqInput) -> Result<FaqRecord, RepoError> {
        let row = sqlx::query_as::<_, FaqRow>(
            r#"
            INSERT INTO faqs (question, answer, "order", is_visible)
            VALUES ($1, $2, $3, $4)
            RETURNING id, question, answer, "order", is_visible, created_at, updated_at
            "#,
        )
        .bind(input.question.trim())
        .bind(&input.answer)
        .bind(input.order)
        .bind(input.is_visible)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FaqRecord::from(row))
    }

    async fn update_faq(&self, id: i64, input: FaqInput) -> Result<FaqRecord, RepoError> {
        let row = sqlx::query_as::<_, FaqRow>(
            r#"
            UPDATE faqs
            SET question = $2, answer = $3, "order" = $4, is_visible = $5, updated_at = now()
            WHERE id = $1
            RETURNING id, question, answer, "order", is_visible, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.question.trim())
        .bind(&input.answer)
        .bind(input.order)
        .bind(input.is_visible)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(FaqRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_faq(&self, id: i64) -> Result<FaqRecord, RepoError> {
        let row = sqlx::query_as::<_, FaqRow>(
            r#"
            DELETE FROM faqs
            WHERE id = $1
            RETURNING id, question, answer, "order", is_visible, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(FaqRecord::from).ok_or(RepoError::NotFound)
    }
}
