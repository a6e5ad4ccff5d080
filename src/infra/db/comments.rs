use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    CommentFilter, CommentParams, CommentsRepo, CommentsWriteRepo, RepoError,
};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = "SELECT c.id, c.blog_post_id, p.slug AS post_slug, \
    p.title AS post_title, c.name, c.email, c.content, c.is_approved, c.created_at, c.updated_at \
    FROM comments c INNER JOIN blog_posts p ON p.id = c.blog_post_id WHERE TRUE";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    blog_post_id: i64,
    post_slug: String,
    post_title: String,
    name: String,
    email: String,
    content: String,
    is_approved: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            blog_post_id: row.blog_post_id,
            post_slug: row.post_slug,
            post_title: row.post_title,
            name: row.name,
            email: row.email,
            content: row.content,
            is_approved: row.is_approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn apply_comment_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CommentFilter) {
        if let Some(approved) = filter.approved {
            qb.push(" AND c.is_approved = ");
            qb.push_bind(approved);
        }
        if let Some(post_id) = filter.post_id {
            qb.push(" AND c.blog_post_id = ");
            qb.push_bind(post_id);
        }
    }

    async fn load_comment(&self, id: i64) -> Result<CommentRecord, RepoError> {
        self.find_comment(id).await?.ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(COMMENT_COLUMNS);
        Self::apply_comment_filter(&mut qb, filter);
        qb.push(" ORDER BY c.created_at DESC, c.id DESC");
        Self::push_limit(&mut qb, limit);

        let rows = qb
            .build_query_as::<CommentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM comments c WHERE TRUE");
        Self::apply_comment_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(COMMENT_COLUMNS);
        qb.push(" AND c.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<CommentRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CommentRecord::from))
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(&self, params: CommentParams) -> Result<CommentRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (blog_post_id, name, email, content, is_approved)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(params.post_id)
        .bind(&params.name)
        .bind(&params.email)
        .bind(&params.content)
        .bind(params.is_approved)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.load_comment(id).await
    }

    async fn set_comment_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<CommentRecord, RepoError> {
        let updated = sqlx::query(
            "UPDATE comments SET is_approved = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(approved)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.load_comment(id).await
    }

    async fn delete_comment(&self, id: i64) -> Result<CommentRecord, RepoError> {
        let comment = self.load_comment(id).await?;
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(comment)
    }
}
