//! Review star ratings and their aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// Value outside 1..=5.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Rejected value.
        value: i64,
        /// Lowest accepted value.
        min: i16,
        /// Highest accepted value.
        max: i16,
    },
}

/// A star rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(i16);

impl Rating {
    /// Lowest rating.
    pub const MIN: i16 = 1;
    /// Highest rating.
    pub const MAX: i16 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        i16::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }

    /// The numeric value.
    #[must_use]
    pub const fn value(&self) -> i16 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Aggregate of a product's ratings.
///
/// `rating_counts` always has an entry for every star value, zero when no review
/// carries it. `average_rating` is rounded to one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_counts: BTreeMap<i16, i64>,
}

impl RatingSummary {
    /// Build a summary from `(stars, count)` pairs, e.g. a `GROUP BY rating` result.
    ///
    /// Pairs with an out-of-range star value are ignored.
    #[must_use]
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (i16, i64)>,
    {
        let mut rating_counts: BTreeMap<i16, i64> =
            (Rating::MIN..=Rating::MAX).map(|star| (star, 0)).collect();

        for (star, count) in counts {
            if let Some(slot) = rating_counts.get_mut(&star) {
                *slot += count;
            }
        }

        let total_reviews: i64 = rating_counts.values().sum();
        let weighted: i64 = rating_counts
            .iter()
            .map(|(star, count)| i64::from(*star) * count)
            .sum();

        let average_rating = if total_reviews == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)] // review counts stay far below 2^52
            let raw = weighted as f64 / total_reviews as f64;
            round_one_decimal(raw)
        };

        Self {
            average_rating,
            total_reviews,
            rating_counts,
        }
    }
}

/// Round to one decimal place, half away from zero.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(i64::from(i16::MAX) + 1).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("3").is_ok());
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }

    #[test]
    fn test_summary_empty() {
        let summary = RatingSummary::from_counts(Vec::new());
        assert_eq!(summary.total_reviews, 0);
        assert!((summary.average_rating - 0.0).abs() < f64::EPSILON);
        assert_eq!(summary.rating_counts.len(), 5);
        assert!(summary.rating_counts.values().all(|c| *c == 0));
    }

    #[test]
    fn test_summary_average_rounds_to_one_decimal() {
        // (5 + 4 + 4) / 3 = 4.333...
        let summary = RatingSummary::from_counts([(5, 1), (4, 2)]);
        assert_eq!(summary.total_reviews, 3);
        assert!((summary.average_rating - 4.3).abs() < f64::EPSILON);
        assert_eq!(summary.rating_counts[&4], 2);
        assert_eq!(summary.rating_counts[&1], 0);
    }

    #[test]
    fn test_summary_ignores_invalid_stars() {
        let summary = RatingSummary::from_counts([(3, 2), (9, 4)]);
        assert_eq!(summary.total_reviews, 2);
        assert!((summary.average_rating - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(RatingSummary::from_counts([(2, 1)])).unwrap();
        assert_eq!(json["totalReviews"], 1);
        assert_eq!(json["ratingCounts"]["2"], 1);
    }
}
