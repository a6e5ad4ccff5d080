use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    ProjectFilter, ProjectOrder, ProjectsRepo, ProjectsWriteRepo, RepoError,
};
use crate::domain::entities::{ProjectImageRecord, ProjectRecord};
use crate::domain::inputs::ProjectInput;

use super::{PostgresRepositories, map_sqlx_error};

const PROJECT_COLUMNS: &str = "SELECT id, title, description, specs, image_path, is_featured, \
    \"order\", is_visible, created_at, updated_at FROM projects WHERE TRUE";

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    title: String,
    description: String,
    specs: Option<String>,
    image_path: Option<String>,
    is_featured: bool,
    order: i32,
    is_visible: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl ProjectRow {
    fn into_record(self, images: Vec<ProjectImageRecord>) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            specs: self.specs,
            image_path: self.image_path,
            is_featured: self.is_featured,
            order: self.order,
            is_visible: self.is_visible,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectImageRow {
    id: i64,
    project_id: i64,
    image_path: String,
    order: i32,
    is_main: bool,
    created_at: OffsetDateTime,
}

impl From<ProjectImageRow> for ProjectImageRecord {
    fn from(row: ProjectImageRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            image_path: row.image_path,
            order: row.order,
            is_main: row.is_main,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    /// Attach images, ordered by `order` then id, to each project row.
    async fn with_images(&self, rows: Vec<ProjectRow>) -> Result<Vec<ProjectRecord>, RepoError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let images = sqlx::query_as::<_, ProjectImageRow>(
            r#"
            SELECT id, project_id, image_path, "order", is_main, created_at
            FROM project_images
            WHERE project_id = ANY($1)
            ORDER BY "order" ASC, id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut by_project: HashMap<i64, Vec<ProjectImageRecord>> = HashMap::new();
        for image in images {
            by_project
                .entry(image.project_id)
                .or_default()
                .push(ProjectImageRecord::from(image));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let images = by_project.remove(&row.id).unwrap_or_default();
                row.into_record(images)
            })
            .collect())
    }

    async fn load_project(&self, id: i64) -> Result<ProjectRecord, RepoError> {
        self.find_project(id).await?.ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ProjectsRepo for PostgresRepositories {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        order: ProjectOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ProjectRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(PROJECT_COLUMNS);
        if let Some(visible) = filter.visible {
            qb.push(" AND is_visible = ");
            qb.push_bind(visible);
        }
        qb.push(match order {
            ProjectOrder::Display => " ORDER BY \"order\" ASC, id ASC",
            ProjectOrder::Newest => " ORDER BY created_at DESC, id DESC",
        });
        Self::push_limit(&mut qb, limit);

        let rows = qb
            .build_query_as::<ProjectRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        self.with_images(rows).await
    }

    async fn count_projects(&self, filter: &ProjectFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects WHERE TRUE");
        if let Some(visible) = filter.visible {
            qb.push(" AND is_visible = ");
            qb.push_bind(visible);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn find_project(&self, id: i64) -> Result<Option<ProjectRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(PROJECT_COLUMNS);
        qb.push(" AND id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<ProjectRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(self.with_images(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProjectsWriteRepo for PostgresRepositories {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO projects (title, description, specs, is_featured, "order", is_visible)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.specs.as_deref())
        .bind(input.is_featured)
        .bind(input.order)
        .bind(input.is_visible)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.load_project(id).await
    }

    async fn update_project(
        &self,
        id: i64,
        input: ProjectInput,
    ) -> Result<ProjectRecord, RepoError> {
        let updated = sqlx::query(
            r#"
            UPDATE projects
            SET title = $2, description = $3, specs = $4, is_featured = $5, "order" = $6,
                is_visible = $7, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.specs.as_deref())
        .bind(input.is_featured)
        .bind(input.order)
        .bind(input.is_visible)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.load_project(id).await
    }

    async fn delete_project(&self, id: i64) -> Result<ProjectRecord, RepoError> {
        let project = self.load_project(id).await?;
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(project)
    }

    async fn add_project_image(
        &self,
        project_id: i64,
        image_path: &str,
        order: i32,
    ) -> Result<ProjectImageRecord, RepoError> {
        let row = sqlx::query_as::<_, ProjectImageRow>(
            r#"
            INSERT INTO project_images (project_id, image_path, "order", is_main)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, project_id, image_path, "order", is_main, created_at
            "#,
        )
        .bind(project_id)
        .bind(image_path)
        .bind(order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProjectImageRecord::from(row))
    }

    async fn delete_project_image(
        &self,
        project_id: i64,
        image_id: i64,
    ) -> Result<Option<ProjectImageRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectImageRow>(
            r#"
            DELETE FROM project_images
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, image_path, "order", is_main, created_at
            "#,
        )
        .bind(image_id)
        .bind(project_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectImageRecord::from))
    }

    async fn set_project_image_order(
        &self,
        project_id: i64,
        image_id: i64,
        order: i32,
    ) -> Result<bool, RepoError> {
        let updated = sqlx::query(
            r#"
            UPDATE project_images
            SET "order" = $3, updated_at = now()
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(image_id)
        .bind(project_id)
        .bind(order)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(updated.rows_affected() > 0)
    }

    async fn set_main_image(
        &self,
        project_id: i64,
        main_image_id: Option<i64>,
    ) -> Result<ProjectRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE project_images
            SET is_main = (id IS NOT DISTINCT FROM $2), updated_at = now()
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .bind(main_image_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE projects
            SET image_path = (
                    SELECT image_path FROM project_images
                    WHERE project_id = $1 AND id = $2
                ),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .bind(main_image_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        self.load_project(project_id).await
    }
}
