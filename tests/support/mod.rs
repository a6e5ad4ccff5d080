//! Shared doubles for the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;

use nextconfig::application::content::ContentService;
use nextconfig::application::repos::{
    CommentFilter, CommentParams, CommentsRepo, CommentsWriteRepo, ContentRepository,
    ContentWriteRepository, DatabaseProbe, FaqsRepo, FaqsWriteRepo, PostFilter, PostOrder,
    PostParams, PostsRepo, PostsWriteRepo, ProjectFilter, ProjectOrder, ProjectsRepo,
    ProjectsWriteRepo, Replaced, RepoError, RevenueRepo, RevenueWriteRepo, ReviewFilter,
    ReviewOrder, ReviewsRepo, ReviewsWriteRepo, TagsRepo, TagsWriteRepo,
};
use nextconfig::application::writer::ContentWriter;
use nextconfig::cache::{CacheError, CacheStore, Invalidator, MemoryStore, TtlPolicy};
use nextconfig::domain::entities::{
    CommentRecord, FaqRecord, MonthlyRevenueRecord, PostRecord, ProjectImageRecord, ProjectRecord,
    ReviewRecord, TagRecord,
};
use nextconfig::domain::inputs::{FaqInput, ProjectInput, RevenueInput, ReviewInput};

const EPOCH: OffsetDateTime = datetime!(2025-01-01 00:00 UTC);

#[derive(Debug, Clone)]
struct StoredPost {
    record: PostRecord,
    tag_ids: Vec<i64>,
}

#[derive(Default)]
struct State {
    clock: i64,
    next_id: i64,
    tags: Vec<TagRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<CommentRecord>,
    reviews: Vec<ReviewRecord>,
    faqs: Vec<FaqRecord>,
    projects: Vec<ProjectRecord>,
    images: Vec<ProjectImageRecord>,
    revenue: Vec<MonthlyRevenueRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so "newest" is deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += 1;
        EPOCH + time::Duration::seconds(self.clock)
    }

    fn post(&self, stored: &StoredPost) -> PostRecord {
        let mut tags: Vec<TagRecord> = self
            .tags
            .iter()
            .filter(|tag| stored.tag_ids.contains(&tag.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        PostRecord {
            tags,
            ..stored.record.clone()
        }
    }

    fn comment(&self, comment: &CommentRecord) -> CommentRecord {
        let mut joined = comment.clone();
        if let Some(post) = self
            .posts
            .iter()
            .find(|post| post.record.id == comment.blog_post_id)
        {
            joined.post_slug = post.record.slug.clone();
            joined.post_title = post.record.title.clone();
        }
        joined
    }

    fn project(&self, project: &ProjectRecord) -> ProjectRecord {
        let mut images: Vec<ProjectImageRecord> = self
            .images
            .iter()
            .filter(|image| image.project_id == project.id)
            .cloned()
            .collect();
        images.sort_by_key(|image| (image.order, image.id));
        ProjectRecord {
            images,
            ..project.clone()
        }
    }

    fn matching_posts(&self, filter: &PostFilter) -> Vec<&StoredPost> {
        self.posts
            .iter()
            .filter(|post| {
                filter
                    .published
                    .is_none_or(|published| post.record.is_published == published)
                    && filter.id.is_none_or(|id| post.record.id == id)
                    && filter
                        .slug
                        .as_deref()
                        .is_none_or(|slug| post.record.slug == slug)
                    && filter.exclude_id.is_none_or(|id| post.record.id != id)
                    && (filter.any_tag_ids.is_empty()
                        || post
                            .tag_ids
                            .iter()
                            .any(|id| filter.any_tag_ids.contains(id)))
            })
            .collect()
    }

    fn ensure_unique_slug(&self, slug: &str, except: Option<i64>) -> Result<(), RepoError> {
        let taken = self
            .posts
            .iter()
            .any(|post| post.record.slug == slug && Some(post.record.id) != except);
        if taken {
            return Err(RepoError::Duplicate {
                constraint: "blog_posts_slug_key".to_string(),
            });
        }
        Ok(())
    }
}

fn truncate<T>(mut rows: Vec<T>, limit: Option<u32>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit as usize);
    }
    rows
}

/// In-memory implementation of every repository trait. Each query bumps a
/// per-method counter so tests can tell cache hits from recomputations.
#[derive(Default)]
pub struct InMemoryRepo {
    state: Mutex<State>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl InMemoryRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn record(&self, method: &'static str) {
        *self.calls.lock().await.entry(method).or_default() += 1;
    }

    /// How many times the read query `method` ran.
    pub async fn calls(&self, method: &str) -> usize {
        self.calls.lock().await.get(method).copied().unwrap_or(0)
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepo {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: Option<u32>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.record("list_posts").await;
        let state = self.state.lock().await;
        let mut posts: Vec<PostRecord> = state
            .matching_posts(filter)
            .into_iter()
            .map(|post| state.post(post))
            .collect();
        match order {
            PostOrder::Newest => posts.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
            }),
            PostOrder::Display => posts.sort_by(|a, b| {
                a.order
                    .cmp(&b.order)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            }),
        }
        Ok(truncate(posts, limit))
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.record("count_posts").await;
        let state = self.state.lock().await;
        Ok(state.matching_posts(filter).len() as u64)
    }

    async fn find_post(&self, filter: &PostFilter) -> Result<Option<PostRecord>, RepoError> {
        self.record("find_post").await;
        let state = self.state.lock().await;
        Ok(state
            .matching_posts(filter)
            .first()
            .map(|post| state.post(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepo {
    async fn create_post(&self, params: PostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        state.ensure_unique_slug(&params.slug, None)?;
        let id = state.next_id();
        let now = state.tick();
        let stored = StoredPost {
            record: PostRecord {
                id,
                title: params.title,
                slug: params.slug,
                excerpt: params.excerpt,
                content: params.content,
                featured_image: params.featured_image,
                is_published: params.is_published,
                order: params.order,
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            tag_ids: params.tag_ids,
        };
        let record = state.post(&stored);
        state.posts.push(stored);
        Ok(record)
    }

    async fn update_post(
        &self,
        id: i64,
        params: PostParams,
    ) -> Result<Replaced<PostRecord>, RepoError> {
        let mut state = self.state.lock().await;
        state.ensure_unique_slug(&params.slug, Some(id))?;
        let now = state.tick();
        let index = state
            .posts
            .iter()
            .position(|post| post.record.id == id)
            .ok_or(RepoError::NotFound)?;
        let previous = state.post(&state.posts[index]);

        let stored = &mut state.posts[index];
        stored.record.title = params.title;
        stored.record.slug = params.slug;
        stored.record.excerpt = params.excerpt;
        stored.record.content = params.content;
        stored.record.featured_image = params.featured_image;
        stored.record.is_published = params.is_published;
        stored.record.order = params.order;
        stored.record.updated_at = now;
        stored.tag_ids = params.tag_ids;

        let current = state.post(&state.posts[index]);
        Ok(Replaced { previous, current })
    }

    async fn delete_post(&self, id: i64) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .posts
            .iter()
            .position(|post| post.record.id == id)
            .ok_or(RepoError::NotFound)?;
        let removed = state.post(&state.posts[index]);
        state.posts.remove(index);
        state.comments.retain(|comment| comment.blog_post_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl TagsRepo for InMemoryRepo {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        self.record("list_tags").await;
        let mut tags = self.state.lock().await.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_tags(&self, ids: &[i64]) -> Result<Vec<TagRecord>, RepoError> {
        self.record("find_tags").await;
        let state = self.state.lock().await;
        Ok(state
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .cloned()
            .collect())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        self.record("find_tag_by_slug").await;
        let state = self.state.lock().await;
        Ok(state.tags.iter().find(|tag| tag.slug == slug).cloned())
    }
}

#[async_trait]
impl TagsWriteRepo for InMemoryRepo {
    async fn create_tag(&self, name: &str, slug: &str) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.tags.iter().any(|tag| tag.name == name) {
            return Err(RepoError::Duplicate {
                constraint: "tags_name_key".to_string(),
            });
        }
        if state.tags.iter().any(|tag| tag.slug == slug) {
            return Err(RepoError::Duplicate {
                constraint: "tags_slug_key".to_string(),
            });
        }
        let id = state.next_id();
        let now = state.tick();
        let tag = TagRecord {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn delete_tag(&self, id: i64) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .tags
            .iter()
            .position(|tag| tag.id == id)
            .ok_or(RepoError::NotFound)?;
        let removed = state.tags.remove(index);
        for post in &mut state.posts {
            post.tag_ids.retain(|tag_id| *tag_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepo {
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        self.record("list_comments").await;
        let state = self.state.lock().await;
        let mut comments: Vec<CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| {
                filter
                    .approved
                    .is_none_or(|approved| comment.is_approved == approved)
                    && filter
                        .post_id
                        .is_none_or(|post_id| comment.blog_post_id == post_id)
            })
            .map(|comment| state.comment(comment))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(truncate(comments, limit))
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64, RepoError> {
        self.record("count_comments").await;
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| {
                filter
                    .approved
                    .is_none_or(|approved| comment.is_approved == approved)
                    && filter
                        .post_id
                        .is_none_or(|post_id| comment.blog_post_id == post_id)
            })
            .count() as u64)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        self.record("find_comment").await;
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| state.comment(comment)))
    }
}

#[async_trait]
impl CommentsWriteRepo for InMemoryRepo {
    async fn create_comment(&self, params: CommentParams) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        if !state
            .posts
            .iter()
            .any(|post| post.record.id == params.post_id)
        {
            return Err(RepoError::Integrity {
                message: "comment references a missing post".to_string(),
            });
        }
        let id = state.next_id();
        let now = state.tick();
        let comment = CommentRecord {
            id,
            blog_post_id: params.post_id,
            post_slug: String::new(),
            post_title: String::new(),
            name: params.name,
            email: params.email,
            content: params.content,
            is_approved: params.is_approved,
            created_at: now,
            updated_at: now,
        };
        let joined = state.comment(&comment);
        state.comments.push(comment);
        Ok(joined)
    }

    async fn set_comment_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let comment = state
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.is_approved = approved;
        comment.updated_at = now;
        let comment = comment.clone();
        Ok(state.comment(&comment))
    }

    async fn delete_comment(&self, id: i64) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .comments
            .iter()
            .position(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        let joined = state.comment(&state.comments[index]);
        state.comments.remove(index);
        Ok(joined)
    }
}

#[async_trait]
impl ReviewsRepo for InMemoryRepo {
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        order: ReviewOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewRecord>, RepoError> {
        self.record("list_reviews").await;
        let state = self.state.lock().await;
        let mut reviews: Vec<ReviewRecord> = state
            .reviews
            .iter()
            .filter(|review| {
                filter
                    .approved
                    .is_none_or(|approved| review.is_approved == approved)
                    && filter
                        .featured
                        .is_none_or(|featured| review.is_featured == featured)
            })
            .cloned()
            .collect();
        match order {
            ReviewOrder::Newest => reviews.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
            }),
            ReviewOrder::Display => reviews.sort_by(|a, b| {
                a.order
                    .cmp(&b.order)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            }),
        }
        Ok(truncate(reviews, limit))
    }

    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<u64, RepoError> {
        self.record("count_reviews").await;
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .iter()
            .filter(|review| {
                filter
                    .approved
                    .is_none_or(|approved| review.is_approved == approved)
                    && filter
                        .featured
                        .is_none_or(|featured| review.is_featured == featured)
            })
            .count() as u64)
    }

    async fn rating_counts(&self) -> Result<Vec<(i16, u64)>, RepoError> {
        self.record("rating_counts").await;
        let state = self.state.lock().await;
        let mut counts: BTreeMap<i16, u64> = BTreeMap::new();
        for review in &state.reviews {
            *counts.entry(review.rating).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[async_trait]
impl ReviewsWriteRepo for InMemoryRepo {
    async fn create_review(&self, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = state.tick();
        let review = ReviewRecord {
            id,
            name: input.name,
            email: input.email,
            rating: input.rating,
            comment: input.comment,
            is_approved: input.is_approved,
            is_featured: input.is_featured,
            order: input.order,
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn update_review(&self, id: i64, input: ReviewInput) -> Result<ReviewRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let review = state
            .reviews
            .iter_mut()
            .find(|review| review.id == id)
            .ok_or(RepoError::NotFound)?;
        review.name = input.name;
        review.email = input.email;
        review.rating = input.rating;
        review.comment = input.comment;
        review.is_approved = input.is_approved;
        review.is_featured = input.is_featured;
        review.order = input.order;
        review.updated_at = now;
        Ok(review.clone())
    }

    async fn set_review_approved(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<ReviewRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let review = state
            .reviews
            .iter_mut()
            .find(|review| review.id == id)
            .ok_or(RepoError::NotFound)?;
        review.is_approved = approved;
        review.updated_at = now;
        Ok(review.clone())
    }

    async fn delete_review(&self, id: i64) -> Result<ReviewRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .reviews
            .iter()
            .position(|review| review.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(state.reviews.remove(index))
    }
}

#[async_trait]
impl FaqsRepo for InMemoryRepo {
    async fn list_faqs(&self, include_hidden: bool) -> Result<Vec<FaqRecord>, RepoError> {
        self.record("list_faqs").await;
        let state = self.state.lock().await;
        let mut faqs: Vec<FaqRecord> = state
            .faqs
            .iter()
            .filter(|faq| include_hidden || faq.is_visible)
            .cloned()
            .collect();
        faqs.sort_by_key(|faq| (faq.order, faq.id));
        Ok(faqs)
    }
}

#[async_trait]
impl FaqsWriteRepo for InMemoryRepo {
    async fn create_faq(&self, input: FaqInput) -> Result<FaqRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = state.tick();
        let faq = FaqRecord {
            id,
            question: input.question,
            answer: input.answer,
            order: input.order,
            is_visible: input.is_visible,
            created_at: now,
            updated_at: now,
        };
        state.faqs.push(faq.clone());
        Ok(faq)
    }

    async fn update_faq(&self, id: i64, input: FaqInput) -> Result<FaqRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let faq = state
            .faqs
            .iter_mut()
            .find(|faq| faq.id == id)
            .ok_or(RepoError::NotFound)?;
        faq.question = input.question;
        faq.answer = input.answer;
        faq.order = input.order;
        faq.is_visible = input.is_visible;
        faq.updated_at = now;
        Ok(faq.clone())
    }

    async fn delete_faq(&self, id: i64) -> Result<FaqRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .faqs
            .iter()
            .position(|faq| faq.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(state.faqs.remove(index))
    }
}

#[async_trait]
impl ProjectsRepo for InMemoryRepo {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        order: ProjectOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ProjectRecord>, RepoError> {
        self.record("list_projects").await;
        let state = self.state.lock().await;
        let mut projects: Vec<ProjectRecord> = state
            .projects
            .iter()
            .filter(|project| {
                filter
                    .visible
                    .is_none_or(|visible| project.is_visible == visible)
            })
            .map(|project| state.project(project))
            .collect();
        match order {
            ProjectOrder::Display => projects.sort_by_key(|project| (project.order, project.id)),
            ProjectOrder::Newest => projects.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
            }),
        }
        Ok(truncate(projects, limit))
    }

    async fn count_projects(&self, filter: &ProjectFilter) -> Result<u64, RepoError> {
        self.record("count_projects").await;
        let state = self.state.lock().await;
        Ok(state
            .projects
            .iter()
            .filter(|project| {
                filter
                    .visible
                    .is_none_or(|visible| project.is_visible == visible)
            })
            .count() as u64)
    }

    async fn find_project(&self, id: i64) -> Result<Option<ProjectRecord>, RepoError> {
        self.record("find_project").await;
        let state = self.state.lock().await;
        Ok(state
            .projects
            .iter()
            .find(|project| project.id == id)
            .map(|project| state.project(project)))
    }
}

#[async_trait]
impl ProjectsWriteRepo for InMemoryRepo {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectRecord, RepoError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = state.tick();
        let project = ProjectRecord {
            id,
            title: input.title,
            description: input.description,
            specs: input.specs,
            image_path: None,
            is_featured: input.is_featured,
            order: input.order,
            is_visible: input.is_visible,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: i64,
        input: ProjectInput,
    ) -> Result<ProjectRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let project = state
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or(RepoError::NotFound)?;
        project.title = input.title;
        project.description = input.description;
        project.specs = input.specs;
        project.is_featured = input.is_featured;
        project.order = input.order;
        project.is_visible = input.is_visible;
        project.updated_at = now;
        let project = project.clone();
        Ok(state.project(&project))
    }

    async fn delete_project(&self, id: i64) -> Result<ProjectRecord, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .projects
            .iter()
            .position(|project| project.id == id)
            .ok_or(RepoError::NotFound)?;
        let removed = state.project(&state.projects[index]);
        state.projects.remove(index);
        state.images.retain(|image| image.project_id != id);
        Ok(removed)
    }

    async fn add_project_image(
        &self,
        project_id: i64,
        image_path: &str,
        order: i32,
    ) -> Result<ProjectImageRecord, RepoError> {
        let mut state = self.state.lock().await;
        if !state.projects.iter().any(|project| project.id == project_id) {
            return Err(RepoError::NotFound);
        }
        let id = state.next_id();
        let now = state.tick();
        let image = ProjectImageRecord {
            id,
            project_id,
            image_path: image_path.to_string(),
            order,
            is_main: false,
            created_at: now,
        };
        state.images.push(image.clone());
        Ok(image)
    }

    async fn delete_project_image(
        &self,
        project_id: i64,
        image_id: i64,
    ) -> Result<Option<ProjectImageRecord>, RepoError> {
        let mut state = self.state.lock().await;
        let index = state
            .images
            .iter()
            .position(|image| image.id == image_id && image.project_id == project_id);
        Ok(index.map(|index| state.images.remove(index)))
    }

    async fn set_project_image_order(
        &self,
        project_id: i64,
        image_id: i64,
        order: i32,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        match state
            .images
            .iter_mut()
            .find(|image| image.id == image_id && image.project_id == project_id)
        {
            Some(image) => {
                image.order = order;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_main_image(
        &self,
        project_id: i64,
        main_image_id: Option<i64>,
    ) -> Result<ProjectRecord, RepoError> {
        let mut state = self.state.lock().await;
        let mut main_path = None;
        for image in state
            .images
            .iter_mut()
            .filter(|image| image.project_id == project_id)
        {
            image.is_main = Some(image.id) == main_image_id;
            if image.is_main {
                main_path = Some(image.image_path.clone());
            }
        }
        let now = state.tick();
        let project = state
            .projects
            .iter_mut()
            .find(|project| project.id == project_id)
            .ok_or(RepoError::NotFound)?;
        project.image_path = main_path;
        project.updated_at = now;
        let project = project.clone();
        Ok(state.project(&project))
    }
}

#[async_trait]
impl RevenueRepo for InMemoryRepo {
    async fn list_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenueRecord>, RepoError> {
        self.record("list_revenue").await;
        let state = self.state.lock().await;
        let mut records: Vec<MonthlyRevenueRecord> = state
            .revenue
            .iter()
            .filter(|record| record.year == year)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.month);
        Ok(records)
    }

    async fn sum_revenue(&self, year: i32) -> Result<f64, RepoError> {
        self.record("sum_revenue").await;
        let state = self.state.lock().await;
        Ok(state
            .revenue
            .iter()
            .filter(|record| record.year == year)
            .map(|record| record.amount)
            .sum())
    }

    async fn revenue_years(&self) -> Result<Vec<i32>, RepoError> {
        self.record("revenue_years").await;
        let state = self.state.lock().await;
        let mut years: Vec<i32> = state.revenue.iter().map(|record| record.year).collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

#[async_trait]
impl RevenueWriteRepo for InMemoryRepo {
    async fn upsert_revenue(
        &self,
        input: RevenueInput,
    ) -> Result<MonthlyRevenueRecord, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        if let Some(record) = state
            .revenue
            .iter_mut()
            .find(|record| record.year == input.year && record.month == input.month)
        {
            record.amount = input.amount;
            record.updated_at = now;
            return Ok(record.clone());
        }
        let id = state.next_id();
        let record = MonthlyRevenueRecord {
            id,
            month: input.month,
            year: input.year,
            amount: input.amount,
            created_at: now,
            updated_at: now,
        };
        state.revenue.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl DatabaseProbe for InMemoryRepo {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// A store whose every command fails, as when Redis is down.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn increment(&self, _key: &str) -> Result<i64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}

/// A working store that refuses to delete keys starting with `prefix`.
#[derive(Debug)]
pub struct FailingDeleteStore {
    inner: MemoryStore,
    prefix: String,
}

impl FailingDeleteStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: MemoryStore::new(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl CacheStore for FailingDeleteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.put(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if key.starts_with(&self.prefix) {
            return Err(CacheError::unavailable("delete timed out"));
        }
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        self.inner.increment(key).await
    }
}

/// Read and write services sharing one repository and one store.
pub struct Harness {
    pub repo: Arc<InMemoryRepo>,
    pub store: Arc<dyn CacheStore>,
    pub content: ContentService,
    pub writer: ContentWriter,
}

impl Harness {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, TtlPolicy::default())
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: TtlPolicy) -> Self {
        let repo = InMemoryRepo::new();
        let reads: Arc<dyn ContentRepository> = repo.clone();
        let writes: Arc<dyn ContentWriteRepository> = repo.clone();
        let content = ContentService::new(reads.clone(), store.clone(), ttl);
        let writer = ContentWriter::new(reads, writes, Invalidator::new(store.clone()));
        Self {
            repo,
            store,
            content,
            writer,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

pub fn post_params(title: &str, slug: &str, is_published: bool, tag_ids: Vec<i64>) -> PostParams {
    PostParams {
        title: title.to_string(),
        slug: slug.to_string(),
        excerpt: None,
        content: format!("{title} body"),
        featured_image: None,
        is_published,
        order: 0,
        tag_ids,
    }
}

pub fn review_input(name: &str, rating: i16, is_approved: bool, is_featured: bool) -> ReviewInput {
    ReviewInput {
        name: name.to_string(),
        email: None,
        rating,
        comment: format!("{name} liked the build"),
        is_approved,
        is_featured,
        order: 0,
    }
}

pub fn faq_input(question: &str, order: i32, is_visible: bool) -> FaqInput {
    FaqInput {
        question: question.to_string(),
        answer: "Usually two weeks.".to_string(),
        order,
        is_visible,
    }
}

pub fn project_input(title: &str, order: i32, is_visible: bool) -> ProjectInput {
    ProjectInput {
        title: title.to_string(),
        description: format!("{title} build"),
        specs: None,
        order,
        is_featured: false,
        is_visible,
    }
}

pub fn comment_params(post_id: i64, name: &str, is_approved: bool) -> CommentParams {
    CommentParams {
        post_id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        content: "Great write-up.".to_string(),
        is_approved,
    }
}
