//! Domain entities mirrored from persistent storage.
//!
//! Every record is `Serialize + Deserialize` because cached query results are
//! stored as JSON.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub order: i32,
    pub tags: Vec<TagRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    pub fn shares_tag_with(&self, other: &PostRecord) -> bool {
        self.tags
            .iter()
            .any(|tag| other.tags.iter().any(|candidate| candidate.id == tag.id))
    }
}

/// A comment joined with the post it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub blog_post_id: i64,
    pub post_slug: String,
    pub post_title: String,
    pub name: String,
    pub email: String,
    pub content: String,
    pub is_approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Published post page: the post, its approved comments and related posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub related: Vec<PostRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub rating: i16,
    pub comment: String,
    pub is_approved: bool,
    pub is_featured: bool,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub order: i32,
    pub is_visible: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectImageRecord {
    pub id: i64,
    pub project_id: i64,
    pub image_path: String,
    pub order: i32,
    pub is_main: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub specs: Option<String>,
    /// Mirrors the path of the main image, if any.
    pub image_path: Option<String>,
    pub is_featured: bool,
    pub order: i32,
    pub is_visible: bool,
    pub images: Vec<ProjectImageRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProjectRecord {
    /// The image that must be main: lowest `order`, ties broken by id.
    pub fn main_image_candidate(&self) -> Option<&ProjectImageRecord> {
        self.images
            .iter()
            .min_by_key(|image| (image.order, image.id))
    }

    /// Whether the main-image flags and `image_path` agree with the candidate.
    pub fn main_image_in_sync(&self) -> bool {
        let candidate = self.main_image_candidate();
        let flags_match = self
            .images
            .iter()
            .all(|image| image.is_main == candidate.is_some_and(|main| main.id == image.id));
        flags_match && self.image_path.as_deref() == candidate.map(|main| main.image_path.as_str())
    }

    /// Order for a newly appended image.
    pub fn next_image_order(&self) -> i32 {
        self.images
            .iter()
            .map(|image| image.order)
            .max()
            .map_or(0, |order| order.saturating_add(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenueRecord {
    pub id: i64,
    pub month: i16,
    pub year: i32,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Revenue of one year, January first. Months without a record are 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub months: [f64; 12],
}

impl MonthlyRevenue {
    pub fn from_records<'a>(
        year: i32,
        records: impl IntoIterator<Item = &'a MonthlyRevenueRecord>,
    ) -> Self {
        let mut months = [0.0; 12];
        for record in records {
            if record.year != year {
                continue;
            }
            if let Some(slot) = usize::try_from(record.month)
                .ok()
                .and_then(|month| month.checked_sub(1))
                .and_then(|index| months.get_mut(index))
            {
                *slot = record.amount;
            }
        }
        Self { year, months }
    }

    pub fn total(&self) -> f64 {
        self.months.iter().sum()
    }

    /// Amount for `month` (1-based); out-of-range months read as 0.
    pub fn month(&self, month: u8) -> f64 {
        usize::from(month)
            .checked_sub(1)
            .and_then(|index| self.months.get(index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Number of reviews per rating, from 5 stars down to 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub counts: [u64; 5],
}

impl RatingDistribution {
    pub fn from_counts(counts: impl IntoIterator<Item = (i16, u64)>) -> Self {
        let mut distribution = Self::default();
        for (rating, count) in counts {
            if let Some(index) = Self::index(rating) {
                distribution.counts[index] += count;
            }
        }
        distribution
    }

    pub fn count(&self, rating: i16) -> u64 {
        Self::index(rating)
            .map(|index| self.counts[index])
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn index(rating: i16) -> Option<usize> {
        (1..=5)
            .contains(&rating)
            .then(|| usize::try_from(5 - rating).ok())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn revenue(month: i16, year: i32, amount: f64) -> MonthlyRevenueRecord {
        let at = datetime!(2025-01-01 0:00 UTC);
        MonthlyRevenueRecord {
            id: i64::from(month),
            month,
            year,
            amount,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn monthly_revenue_fills_missing_months_with_zero() {
        let records = vec![
            revenue(1, 2025, 1200.0),
            revenue(3, 2025, 800.5),
            revenue(3, 2024, 999.0),
        ];

        let revenue = MonthlyRevenue::from_records(2025, &records);
        assert_eq!(revenue.month(1), 1200.0);
        assert_eq!(revenue.month(2), 0.0);
        assert_eq!(revenue.month(3), 800.5);
        assert_eq!(revenue.month(13), 0.0);
        assert_eq!(revenue.total(), 2000.5);
    }

    fn image(id: i64, order: i32, is_main: bool) -> ProjectImageRecord {
        ProjectImageRecord {
            id,
            project_id: 1,
            image_path: format!("projects/{id}.jpg"),
            order,
            is_main,
            created_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    #[test]
    fn main_image_is_lowest_order() {
        let at = datetime!(2025-01-01 0:00 UTC);
        let mut project = ProjectRecord {
            id: 1,
            title: "Silent workstation".to_string(),
            description: "Quiet build".to_string(),
            specs: None,
            image_path: Some("projects/1.jpg".to_string()),
            is_featured: false,
            order: 0,
            is_visible: true,
            images: vec![image(1, 2, true), image(2, 0, false), image(3, 0, false)],
            created_at: at,
            updated_at: at,
        };

        assert_eq!(project.main_image_candidate().map(|image| image.id), Some(2));
        assert!(!project.main_image_in_sync());

        project.images = vec![image(1, 2, false), image(2, 0, true), image(3, 0, false)];
        project.image_path = Some("projects/2.jpg".to_string());
        assert!(project.main_image_in_sync());

        project.images.clear();
        project.image_path = None;
        assert!(project.main_image_in_sync());
        assert_eq!(project.next_image_order(), 0);
    }

    #[test]
    fn rating_distribution_ignores_out_of_range() {
        let distribution = RatingDistribution::from_counts([(5, 3), (1, 2), (0, 9), (6, 1)]);
        assert_eq!(distribution.counts, [3, 0, 0, 0, 2]);
        assert_eq!(distribution.count(5), 3);
        assert_eq!(distribution.total(), 5);
    }
}
