use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, RevenueRepo, RevenueWriteRepo};
use crate::domain::entities::MonthlyRevenueRecord;
use crate::domain::inputs::RevenueInput;

use super::{PostgresRepositories, map_sqlx_error};

// `amount` is NUMERIC(10,2); it is read as float8 and bound through a cast.
const REVENUE_COLUMNS: &str =
    "id, month, year, amount::float8 AS amount, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RevenueRow {
    id: i64,
    month: i16,
    year: i32,
    amount: f64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RevenueRow> for MonthlyRevenueRecord {
    fn from(row: RevenueRow) -> Self {
        Self {
            id: row.id,
            month: row.month,
            year: row.year,
            amount: row.amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl RevenueRepo for PostgresRepositories {
    async fn list_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenueRecord>, RepoError> {
        let rows = sqlx::query_as::<_, RevenueRow>(&format!(
            "SELECT {REVENUE_COLUMNS} FROM monthly_revenues WHERE year = $1 ORDER BY month ASC"
        ))
        .bind(year)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MonthlyRevenueRecord::from).collect())
    }

    async fn sum_revenue(&self, year: i32) -> Result<f64, RepoError> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(amount), 0)::float8 FROM monthly_revenues WHERE year = $1",
        )
        .bind(year)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn revenue_years(&self) -> Result<Vec<i32>, RepoError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT year FROM monthly_revenues ORDER BY year ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl RevenueWriteRepo for PostgresRepositories {
    async fn upsert_revenue(
        &self,
        input: RevenueInput,
    ) -> Result<MonthlyRevenueRecord, RepoError> {
        let row = sqlx::query_as::<_, RevenueRow>(&format!(
            r#"
            INSERT INTO monthly_revenues (month, year, amount)
            VALUES ($1, $2, $3::float8::numeric)
            ON CONFLICT (month, year)
            DO UPDATE SET amount = EXCLUDED.amount, updated_at = now()
            RETURNING {REVENUE_COLUMNS}
            "#
        ))
        .bind(input.month)
        .bind(input.year)
        .bind(input.amount)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(MonthlyRevenueRecord::from(row))
    }
}
