use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    PostFilter, PostOrder, PostParams, PostsRepo, PostsWriteRepo, Replaced, RepoError,
};
use crate::domain::entities::{PostRecord, TagRecord};

use super::tags::TagRow;
use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "SELECT p.id, p.title, p.slug, p.excerpt, p.content, \
    p.featured_image, p.is_published, p.\"order\", p.created_at, p.updated_at \
    FROM blog_posts p WHERE TRUE";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: String,
    featured_image: Option<String>,
    is_published: bool,
    order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl PostRow {
    fn into_record(self, tags: Vec<TagRecord>) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            content: self.content,
            featured_image: self.featured_image,
            is_published: self.is_published,
            order: self.order,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    blog_post_id: i64,
    #[sqlx(flatten)]
    tag: TagRow,
}

impl PostgresRepositories {
    fn apply_post_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
        if let Some(published) = filter.published {
            qb.push(" AND p.is_published = ");
            qb.push_bind(published);
        }
        if let Some(id) = filter.id {
            qb.push(" AND p.id = ");
            qb.push_bind(id);
        }
        if let Some(slug) = filter.slug.as_ref() {
            qb.push(" AND p.slug = ");
            qb.push_bind(slug.clone());
        }
        if !filter.any_tag_ids.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM blog_post_tag bpt \
                 WHERE bpt.blog_post_id = p.id AND bpt.tag_id = ANY(",
            );
            qb.push_bind(filter.any_tag_ids.clone());
            qb.push("))");
        }
        if let Some(exclude_id) = filter.exclude_id {
            qb.push(" AND p.id <> ");
            qb.push_bind(exclude_id);
        }
    }

    /// Attach tags, ordered by name, to each post row.
    async fn with_tags(&self, rows: Vec<PostRow>) -> Result<Vec<PostRecord>, RepoError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let links = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT bpt.blog_post_id, t.id, t.name, t.slug, t.created_at, t.updated_at
            FROM blog_post_tag bpt
            INNER JOIN tags t ON t.id = bpt.tag_id
            WHERE bpt.blog_post_id = ANY($1)
            ORDER BY t.name ASC, t.id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut by_post: HashMap<i64, Vec<TagRecord>> = HashMap::new();
        for link in links {
            by_post
                .entry(link.blog_post_id)
                .or_default()
                .push(TagRecord::from(link.tag));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_post.remove(&row.id).unwrap_or_default();
                row.into_record(tags)
            })
            .collect())
    }

    async fn load_post(&self, id: i64) -> Result<PostRecord, RepoError> {
        let filter = PostFilter {
            id: Some(id),
            ..PostFilter::default()
        };
        self.find_post(&filter).await?.ok_or(RepoError::NotFound)
    }

    async fn replace_post_tags(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        post_id: i64,
        tag_ids: &[i64],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM blog_post_tag WHERE blog_post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO blog_post_tag (blog_post_id, tag_id) \
                 SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_ids)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: Option<u32>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_COLUMNS);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(match order {
            PostOrder::Newest => " ORDER BY p.created_at DESC, p.id DESC",
            PostOrder::Display => " ORDER BY p.\"order\" ASC, p.created_at DESC, p.id DESC",
        });
        Self::push_limit(&mut qb, limit);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        self.with_tags(rows).await
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blog_posts p WHERE TRUE");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn find_post(&self, filter: &PostFilter) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.list_posts(filter, PostOrder::Newest, Some(1)).await?;
        Ok(posts.into_iter().next())
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: PostParams) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO blog_posts
                (title, slug, excerpt, content, featured_image, is_published, "order")
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&params.title)
        .bind(&params.slug)
        .bind(params.excerpt.as_deref())
        .bind(&params.content)
        .bind(params.featured_image.as_deref())
        .bind(params.is_published)
        .bind(params.order)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_post_tags(&mut tx, id, &params.tag_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.load_post(id).await
    }

    async fn update_post(
        &self,
        id: i64,
        params: PostParams,
    ) -> Result<Replaced<PostRecord>, RepoError> {
        let previous = self.load_post(id).await?;
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE blog_posts
            SET title = $2, slug = $3, excerpt = $4, content = $5, featured_image = $6,
                is_published = $7, "order" = $8, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&params.title)
        .bind(&params.slug)
        .bind(params.excerpt.as_deref())
        .bind(&params.content)
        .bind(params.featured_image.as_deref())
        .bind(params.is_published)
        .bind(params.order)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Self::replace_post_tags(&mut tx, id, &params.tag_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        let current = self.load_post(id).await?;
        Ok(Replaced { previous, current })
    }

    async fn delete_post(&self, id: i64) -> Result<PostRecord, RepoError> {
        let post = self.load_post(id).await?;
        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if deleted.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(post)
    }
}
