//! Invalidation sets and their best-effort execution.
//!
//! Every committed write is described by a [`Change`]. A change maps to a
//! fixed, over-inclusive list of [`Action`]s: plain keys to delete, scoped keys
//! to delete under the current generation, and namespaces whose generation
//! must be bumped because the affected parameter values cannot be enumerated.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use super::accessor::CacheAside;
use super::keys::{self, Namespace, ScopedKey};
use super::store::CacheStore;

const SOURCE: &str = "nextconfig::cache::invalidation";

pub(crate) const METRIC_INVALIDATION_FAILURE: &str = "nextconfig_cache_invalidation_failure_total";
pub(crate) const METRIC_GENERATION_BUMP: &str = "nextconfig_cache_generation_bump_total";

/// A committed mutation, carrying what its invalidation set depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A post was created, updated or deleted. Holds every slug the post had
    /// before and after the write.
    Post { slugs: Vec<String> },
    /// A comment was created, approved or deleted on the post with this slug.
    Comment { post_slug: String },
    Review,
    Faq,
    Project,
    ProjectImage,
    Tag,
    MonthlyRevenue { year: i32 },
}

impl Change {
    pub fn post<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for slug in slugs {
            let slug = slug.into();
            if !slug.is_empty() && !unique.contains(&slug) {
                unique.push(slug);
            }
        }
        Change::Post { slugs: unique }
    }

    pub fn comment(post_slug: impl Into<String>) -> Self {
        Change::Comment {
            post_slug: post_slug.into(),
        }
    }

    /// Entity label used in logs and metrics.
    pub fn entity(&self) -> &'static str {
        match self {
            Change::Post { .. } => "post",
            Change::Comment { .. } => "comment",
            Change::Review => "review",
            Change::Faq => "faq",
            Change::Project => "project",
            Change::ProjectImage => "project_image",
            Change::Tag => "tag",
            Change::MonthlyRevenue { .. } => "monthly_revenue",
        }
    }

    /// The invalidation set of this change, deletes before bumps.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            Change::Post { slugs } => {
                let mut actions = vec![
                    Action::delete(keys::BLOG_POSTS),
                    Action::delete(keys::POST_COUNT),
                ];
                actions.extend(
                    slugs
                        .iter()
                        .map(|slug| Action::DeleteScoped(ScopedKey::post_detail(slug.clone()))),
                );
                // Deleting a post cascades to its comments.
                actions.extend([
                    Action::delete(keys::PENDING_COMMENTS),
                    Action::delete(keys::PENDING_COMMENT_COUNT),
                    Action::delete(keys::COMMENT_COUNT),
                    Action::Bump(Namespace::Posts),
                    Action::Bump(Namespace::Comments),
                ]);
                actions
            }
            Change::Comment { post_slug } => {
                vec![
                    Action::DeleteScoped(ScopedKey::post_detail(post_slug.clone())),
                    Action::delete(keys::PENDING_COMMENTS),
                    Action::delete(keys::PENDING_COMMENT_COUNT),
                    Action::delete(keys::COMMENT_COUNT),
                    Action::Bump(Namespace::Comments),
                ]
            }
            Change::Review => vec![
                Action::delete(keys::REVIEW_COUNT),
                Action::delete(keys::PENDING_REVIEW_COUNT),
                Action::delete(keys::REVIEW_RATINGS),
                Action::Bump(Namespace::Reviews),
            ],
            Change::Faq => vec![
                Action::delete(keys::VISIBLE_FAQS),
                Action::delete(keys::ALL_FAQS),
            ],
            Change::Project => vec![
                Action::delete(keys::VISIBLE_PROJECTS),
                Action::delete(keys::ALL_PROJECTS),
                Action::delete(keys::PROJECT_COUNT),
            ],
            Change::ProjectImage => vec![
                Action::delete(keys::VISIBLE_PROJECTS),
                Action::delete(keys::ALL_PROJECTS),
            ],
            // Listings and details embed tag names; related posts depend on tag links.
            Change::Tag => vec![
                Action::delete(keys::TAGS),
                Action::delete(keys::BLOG_POSTS),
                Action::Bump(Namespace::Posts),
            ],
            Change::MonthlyRevenue { year } => vec![
                Action::Delete(keys::monthly_revenue(*year)),
                Action::Delete(keys::total_revenue(*year)),
                Action::delete(keys::REVENUE_YEARS),
            ],
        }
    }
}

/// One step of an invalidation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Delete(String),
    DeleteScoped(ScopedKey),
    Bump(Namespace),
}

impl Action {
    fn delete(key: &str) -> Self {
        Action::Delete(key.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of an invalidation run. Failures never undo the write; they are
/// reported so an operator can force a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub attempted: usize,
    pub failures: Vec<InvalidationFailure>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: InvalidationReport) {
        self.attempted += other.attempted;
        self.failures.extend(other.failures);
    }

    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.key.as_str())
            .collect()
    }

    /// Human-readable warnings for API responses.
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|failure| {
                format!(
                    "cache key `{}` could not be invalidated; stale data may be served until it expires or the cache is flushed",
                    failure.key
                )
            })
            .collect()
    }
}

/// Executes invalidation sets against the cache store.
#[derive(Clone)]
pub struct Invalidator {
    cache: CacheAside,
}

impl Invalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            cache: CacheAside::new(store),
        }
    }

    /// Run the invalidation set of `change`. Every action is attempted even
    /// if earlier ones fail.
    pub async fn invalidate(&self, change: &Change) -> InvalidationReport {
        self.execute(change.entity(), &change.actions()).await
    }

    /// Invalidate everything the cache can hold. `revenue_years` lists the
    /// years whose revenue keys may exist.
    pub async fn flush_all(&self, revenue_years: &[i32]) -> InvalidationReport {
        let mut actions: Vec<Action> = keys::PLAIN_TEMPLATES
            .iter()
            .map(|key| Action::delete(key))
            .collect();
        for year in revenue_years {
            actions.push(Action::Delete(keys::monthly_revenue(*year)));
            actions.push(Action::Delete(keys::total_revenue(*year)));
        }
        actions.extend(Namespace::ALL.into_iter().map(Action::Bump));

        self.execute("flush", &actions).await
    }

    async fn execute(&self, entity: &'static str, actions: &[Action]) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        for action in actions {
            report.attempted += 1;
            if let Err(failure) = self.apply(action).await {
                counter!(METRIC_INVALIDATION_FAILURE, "entity" => entity).increment(1);
                warn!(
                    target = SOURCE,
                    entity = entity,
                    key = %failure.key,
                    error = %failure.error,
                    "cache invalidation step failed"
                );
                report.failures.push(failure);
            }
        }

        if report.is_clean() {
            debug!(
                target = SOURCE,
                entity = entity,
                actions = report.attempted,
                "cache invalidated"
            );
        } else {
            warn!(
                target = SOURCE,
                entity = entity,
                actions = report.attempted,
                failed = ?report.failed_keys(),
                "cache invalidation incomplete; flush the cache to recover"
            );
        }

        report
    }

    async fn apply(&self, action: &Action) -> Result<(), InvalidationFailure> {
        let store = self.cache.store();
        match action {
            Action::Delete(key) => store
                .delete(key)
                .await
                .map_err(|err| failure(key.clone(), err)),
            Action::DeleteScoped(scoped) => {
                let generation = self
                    .cache
                    .generation(scoped.namespace())
                    .await
                    .map_err(|err| failure(scoped.label(), err))?;
                let key = scoped.render(generation);
                store.delete(&key).await.map_err(|err| failure(key, err))
            }
            Action::Bump(namespace) => {
                let counter_key = namespace.counter_key();
                store
                    .increment(&counter_key)
                    .await
                    .map(|_| {
                        counter!(METRIC_GENERATION_BUMP, "namespace" => namespace.as_str())
                            .increment(1);
                    })
                    .map_err(|err| failure(counter_key, err))
            }
        }
    }
}

fn failure(key: String, error: impl std::fmt::Display) -> InvalidationFailure {
    InvalidationFailure {
        key,
        error: error.to_string(),
    }
}
