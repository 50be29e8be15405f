//! Product reviews and reader reactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shoplite_core::{ProductId, Rating, ReviewId, ReviewStatus, UserId};

/// Most image URLs a review may carry.
pub const MAX_REVIEW_IMAGES: usize = 10;

/// A review joined with its product name and author, plus the viewer's reactions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub product_name: String,
    pub user_id: UserId,
    pub username: String,
    pub rating: Rating,
    pub comment: Option<String>,
    pub like_count: i32,
    pub report_count: i32,
    pub helpfulness_score: i32,
    pub verified_purchase: bool,
    pub status: ReviewStatus,
    pub image_urls: Vec<String>,
    pub user_liked: bool,
    pub user_reported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `{rating, comment}` body shared by create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: Rating,
    pub comment: Option<String>,
}

/// Body of the enhanced create endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedReviewRequest {
    pub review_request: ReviewRequest,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// `POST /api/reviews/enhanced/{id}/report` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    pub reason: Option<String>,
}

/// Ordering for filtered review listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSort {
    Helpful,
    Newest,
    Oldest,
    RatingDesc,
    RatingAsc,
}

impl ReviewSort {
    /// Parse the `sortBy` query value. Unknown values sort newest first.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "helpful" => Self::Helpful,
            "oldest" => Self::Oldest,
            "rating_desc" => Self::RatingDesc,
            "rating_asc" => Self::RatingAsc,
            _ => Self::Newest,
        }
    }

    pub(crate) const fn order_by(self) -> &'static str {
        match self {
            Self::Helpful => "r.helpfulness_score DESC, r.created_at DESC",
            Self::Newest => "r.created_at DESC",
            Self::Oldest => "r.created_at ASC",
            Self::RatingDesc => "r.rating DESC, r.created_at DESC",
            Self::RatingAsc => "r.rating ASC, r.created_at DESC",
        }
    }
}

/// Validated filters for `/filtered`.
#[derive(Debug, Clone)]
pub struct ReviewFilter {
    pub rating: Option<Rating>,
    pub verified_only: bool,
    pub with_images: bool,
    pub sort: ReviewSort,
}

/// Raw `/filtered` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilterQuery {
    pub rating: Option<Rating>,
    pub verified_only: Option<bool>,
    pub with_images: Option<bool>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl ReviewFilterQuery {
    #[must_use]
    pub fn filter(&self) -> ReviewFilter {
        ReviewFilter {
            rating: self.rating,
            verified_only: self.verified_only.unwrap_or(false),
            with_images: self.with_images.unwrap_or(false),
            sort: self
                .sort_by
                .as_deref()
                .map_or(ReviewSort::Newest, ReviewSort::parse),
        }
    }

    #[must_use]
    pub const fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            size: self.size,
        }
    }
}

/// `?page=&size=` with defaults 0 and 10.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageQuery {
    const DEFAULT_SIZE: i64 = 10;
    const MAX_SIZE: i64 = 100;

    /// Zero-based page number, never negative.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(0).max(0)
    }

    /// Page size clamped to 1..=100.
    #[must_use]
    pub fn size(&self) -> i64 {
        self.size
            .unwrap_or(Self::DEFAULT_SIZE)
            .clamp(1, Self::MAX_SIZE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.page().saturating_mul(self.size())
    }
}

/// `PUT /api/admin/reviews/{id}/status` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewStatusRequest {
    pub status: ReviewStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamps() {
        let query = PageQuery::default();
        assert_eq!((query.page(), query.size(), query.offset()), (0, 10, 0));

        let query = PageQuery {
            page: Some(-3),
            size: Some(1000),
        };
        assert_eq!((query.page(), query.size()), (0, 100));

        let query = PageQuery {
            page: Some(2),
            size: Some(20),
        };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(ReviewSort::parse("helpful"), ReviewSort::Helpful);
        assert_eq!(ReviewSort::parse("rating_asc"), ReviewSort::RatingAsc);
        assert_eq!(ReviewSort::parse("whatever"), ReviewSort::Newest);
        assert!(ReviewSort::Helpful.order_by().ends_with("created_at DESC"));
    }

    #[test]
    fn test_enhanced_request_shape() {
        let body: EnhancedReviewRequest = serde_json::from_str(
            r#"{"reviewRequest":{"rating":4,"comment":"good"},"imageUrls":["/api/files/a.png"]}"#,
        )
        .unwrap();
        assert_eq!(body.review_request.rating.value(), 4);
        assert_eq!(body.image_urls.len(), 1);

        let out_of_range =
            serde_json::from_str::<ReviewRequest>(r#"{"rating":6,"comment":null}"#);
        assert!(out_of_range.is_err());
    }
}
