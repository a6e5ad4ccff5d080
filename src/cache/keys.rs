//! Cache key templates.
//!
//! Every cached query shape owns exactly one template. Plain templates render
//! as `{template}`, parameterized ones as `{template}:{param}`, and templates
//! whose parameter space cannot be enumerated at write time embed their
//! namespace generation: `{template}:g{generation}:{param}`.
//!
//! Template names are unique and never contain `:`, integers render through
//! `Display` (base 10, no leading zeros) and slugs are used verbatim, so two
//! distinct queries never share a key.

use std::fmt;

pub const BLOG_POSTS: &str = "blog_posts";
pub const POST_COUNT: &str = "post_count";
pub const TAGS: &str = "tags";
pub const PENDING_COMMENTS: &str = "pending_comments";
pub const PENDING_COMMENT_COUNT: &str = "pending_comment_count";
pub const COMMENT_COUNT: &str = "comment_count";
pub const REVIEW_COUNT: &str = "review_count";
pub const PENDING_REVIEW_COUNT: &str = "pending_review_count";
pub const REVIEW_RATINGS: &str = "review_ratings";
pub const VISIBLE_FAQS: &str = "visible_faqs";
pub const ALL_FAQS: &str = "all_faqs";
pub const VISIBLE_PROJECTS: &str = "visible_projects";
pub const ALL_PROJECTS: &str = "all_projects";
pub const PROJECT_COUNT: &str = "project_count";
pub const REVENUE_YEARS: &str = "revenue_years";

const MONTHLY_REVENUE: &str = "monthly_revenue";
const TOTAL_REVENUE: &str = "total_revenue";
const POST_DETAIL: &str = "blog_post";
const APPROVED_COMMENTS: &str = "approved_comments";
const FEATURED_REVIEWS: &str = "featured_reviews";
const SHOWCASE_REVIEWS: &str = "showcase_reviews";

/// Every unparameterized template, used by the manual flush.
pub const PLAIN_TEMPLATES: &[&str] = &[
    BLOG_POSTS,
    POST_COUNT,
    TAGS,
    PENDING_COMMENTS,
    PENDING_COMMENT_COUNT,
    COMMENT_COUNT,
    REVIEW_COUNT,
    PENDING_REVIEW_COUNT,
    REVIEW_RATINGS,
    VISIBLE_FAQS,
    ALL_FAQS,
    VISIBLE_PROJECTS,
    ALL_PROJECTS,
    PROJECT_COUNT,
    REVENUE_YEARS,
];

pub fn monthly_revenue(year: i32) -> String {
    format!("{MONTHLY_REVENUE}:{year}")
}

pub fn total_revenue(year: i32) -> String {
    format!("{TOTAL_REVENUE}:{year}")
}

/// Groups of keys that are invalidated together by bumping a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Posts,
    Comments,
    Reviews,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Posts, Namespace::Comments, Namespace::Reviews];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Posts => "posts",
            Namespace::Comments => "comments",
            Namespace::Reviews => "reviews",
        }
    }

    /// Key of the generation counter. An absent counter means generation 0.
    pub fn counter_key(self) -> String {
        format!("generation:{}", self.as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key that lives inside a generation [`Namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopedKey {
    /// Published post with tags, approved comments and related posts.
    PostDetail { slug: String },
    /// Latest approved comments across all posts.
    ApprovedComments { limit: u32 },
    /// Approved, featured reviews in display order.
    FeaturedReviews { limit: u32 },
    /// Featured reviews topped up with the latest approved ones.
    ShowcaseReviews { limit: u32 },
}

impl ScopedKey {
    pub fn post_detail(slug: impl Into<String>) -> Self {
        Self::PostDetail { slug: slug.into() }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            ScopedKey::PostDetail { .. } => Namespace::Posts,
            ScopedKey::ApprovedComments { .. } => Namespace::Comments,
            ScopedKey::FeaturedReviews { .. } | ScopedKey::ShowcaseReviews { .. } => {
                Namespace::Reviews
            }
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            ScopedKey::PostDetail { .. } => POST_DETAIL,
            ScopedKey::ApprovedComments { .. } => APPROVED_COMMENTS,
            ScopedKey::FeaturedReviews { .. } => FEATURED_REVIEWS,
            ScopedKey::ShowcaseReviews { .. } => SHOWCASE_REVIEWS,
        }
    }

    /// Render the concrete key for the given namespace generation.
    pub fn render(&self, generation: i64) -> String {
        self.render_with(generation)
    }

    /// Generation-agnostic form of the key, for logs and reports.
    pub fn label(&self) -> String {
        self.render_with('*')
    }

    fn render_with(&self, generation: impl fmt::Display) -> String {
        let template = self.template();
        match self {
            ScopedKey::PostDetail { slug } => format!("{template}:g{generation}:{slug}"),
            ScopedKey::ApprovedComments { limit }
            | ScopedKey::FeaturedReviews { limit }
            | ScopedKey::ShowcaseReviews { limit } => {
                format!("{template}:g{generation}:{limit}")
            }
        }
    }
}

/// Template name of a rendered key, used as a metric label.
pub fn template_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn revenue_keys_are_distinct_per_year() {
        assert_eq!(monthly_revenue(2024), "monthly_revenue:2024");
        assert_ne!(monthly_revenue(2024), monthly_revenue(2025));
        assert_ne!(monthly_revenue(2024), total_revenue(2024));
    }

    #[test]
    fn template_names_are_unique_and_separator_free() {
        let scoped = [
            POST_DETAIL,
            APPROVED_COMMENTS,
            FEATURED_REVIEWS,
            SHOWCASE_REVIEWS,
            MONTHLY_REVENUE,
            TOTAL_REVENUE,
        ];
        let all: Vec<&str> = PLAIN_TEMPLATES.iter().copied().chain(scoped).collect();
        let unique: HashSet<&str> = all.iter().copied().collect();

        assert_eq!(unique.len(), all.len());
        assert!(all.iter().all(|name| !name.contains(':')));
    }

    #[test]
    fn scoped_keys_embed_generation() {
        let key = ScopedKey::post_detail("rtx-4070-guide");
        assert_eq!(key.render(0), "blog_post:g0:rtx-4070-guide");
        assert_eq!(key.render(3), "blog_post:g3:rtx-4070-guide");
        assert_eq!(key.namespace(), Namespace::Posts);
    }

    #[test]
    fn review_listings_do_not_collide() {
        let featured = ScopedKey::FeaturedReviews { limit: 6 }.render(1);
        let showcase = ScopedKey::ShowcaseReviews { limit: 6 }.render(1);
        let other_limit = ScopedKey::FeaturedReviews { limit: 60 }.render(1);

        assert_ne!(featured, showcase);
        assert_ne!(featured, other_limit);
        assert_eq!(featured, "featured_reviews:g1:6");
    }

    #[test]
    fn template_of_strips_parameters() {
        assert_eq!(template_of("blog_post:g2:some-slug"), "blog_post");
        assert_eq!(template_of("blog_posts"), "blog_posts");
        assert_eq!(Namespace::Reviews.counter_key(), "generation:reviews");
    }
}
