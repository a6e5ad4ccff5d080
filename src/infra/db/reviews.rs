use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    RepoError, ReviewFilter, ReviewOrder, ReviewsRepo, ReviewsWriteRepo,
};
use crate::domain::entities::ReviewRecord;
use crate::domain::inputs::ReviewInput;

use super::{PostgresRepositories, map_sqlx_error};

const REVIEW_RETURNING: &str = "id, name, email, rating, comment, is_approved, is_featured, \
    \"order\", created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    name: String,
    email: Option<String>,
    rating: i16,
    comment: String,
    is_approved: bool,
    is_featured: bool,
    order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ReviewRow> for ReviewRecord {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            rating: row.rating,
            comment: row.comment,
            is_approved: row.is_approved,
            is_featured: row.is_featured,
            order: row.order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RatingCountRow {
    rating: i16,
    count: i64,
}

impl PostgresRepositories {
    fn apply_review_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
        if let Some(approved) = filter.approved {
            qb.push(" AND is_approved = ");
            qb.push_bind(approved);
        }
        if let Some(featured) = filter.featured {
            qb.push(" AND is_featured = ");
            qb.push_bind(featured);
        }
    }
}

#[async_trait]
impl ReviewsRepo for PostgresRepositories {
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        order: ReviewOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REVIEW_RETURNING} FROM reviews WHERE TRUE"
        ));
        Self::apply_review_filter(&mut qb, filter);
        qb.push(match order {
            ReviewOrder::Newest => " ORDER BY created_at DESC, id DESC",
            ReviewOrder::Display => " ORDER BY \"order\" ASC, created_at DESC, id DESC",
        });
        Self::push_limit(&mut qb, limit);

        let rows = qb
            .build_query_as::<ReviewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ReviewRecord::from).collect())
    }

    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews WHERE TRUE");
        Self::apply_review_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn rating_counts(&self) -> Result<Vec<(i16, u64)>, RepoError> {
        let rows = sqlx::query_as::<_, RatingCountRow>(
            r#"
            SELECT rating, COUNT(*) AS count
            FROM reviews
            GROUP BY rating
            ORDER BY rating DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| Ok((row.rating, Self::convert_count(row.count)?)))
            .collect()
    }
}

#[async_trait]
impl ReviewsWriteRepo for PostgresRepositories {
    async fn create_review(&self, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (name, email, rating, comment, is_approved, is_featured, "order")
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REVIEW_RETURNING}
            "#
        ))
        .bind(input.name.trim())
        .bind(input.email.as_deref())
        .bind(input.rating)
        .bind(&input.comment)
        .bind(input.is_approved)
        .bind(input.is_featured)
        .bind(input.order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ReviewRecord::from(row))
    }

    async fn update_review(&self, id: i64, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET name = $2, email = $3, rating = $4, comment = $5, is_approved = $6,
                is_featured = $7, "order" = $8, updated_at = now()
            WHERE id = $1
            RETURNING {REVIEW_RETURNING}
            "#
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.email.as_deref())
        .bind(input.rating)
        .bind(&input.comment)
        .bind(input.is_approved)
        .bind(input.is_featured)
        .bind(input.order)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ReviewRecord::from).ok_or(RepoError::NotFound)
    }

    async fn set_review_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET is_approved = $2, updated_at = now()
            WHERE id = $1
            RETURNING {REVIEW_RETURNING}
            "#
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ReviewRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_review(&self, id: i64) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "DELETE FROM reviews WHERE id = $1 RETURNING {REVIEW_RETURNING}"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ReviewRecord::from).ok_or(RepoError::NotFound)
    }
}
