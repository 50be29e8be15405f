//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoplite_core::{CategoryId, ProductId};

/// A product joined with its category name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub is_active: bool,
    pub average_rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. On update, `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

/// Column a product search is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    Name,
    Price,
    CreatedAt,
    Id,
}

impl ProductSort {
    /// Parse the `sortBy` query value. Unknown values order by id.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "name" => Self::Name,
            "price" => Self::Price,
            "createdAt" => Self::CreatedAt,
            _ => Self::Id,
        }
    }

    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.price",
            Self::CreatedAt => "p.created_at",
            Self::Id => "p.id",
        }
    }
}

/// Validated product search filters.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub keyword: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    pub ascending: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            category_id: None,
            min_price: None,
            max_price: None,
            sort: ProductSort::CreatedAt,
            ascending: false,
        }
    }
}

/// Raw `/api/products/search` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchQuery {
    pub keyword: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl From<ProductSearchQuery> for ProductFilter {
    fn from(query: ProductSearchQuery) -> Self {
        let keyword = query
            .keyword
            .or(query.name)
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        let ascending = query
            .sort_direction
            .is_some_and(|d| d.eq_ignore_ascii_case("asc"));
        let sort = query
            .sort_by
            .as_deref()
            .map_or(ProductSort::CreatedAt, ProductSort::parse);

        Self {
            keyword,
            category_id: query.category_id,
            min_price: query.min_price,
            max_price: query.max_price,
            sort,
            ascending,
        }
    }
}

/// A product with how many wishlists contain it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularProduct {
    pub product: Product,
    pub wishlist_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_defaults() {
        let filter = ProductFilter::from(ProductSearchQuery::default());
        assert_eq!(filter.sort, ProductSort::CreatedAt);
        assert!(!filter.ascending);
        assert!(filter.keyword.is_none());
    }

    #[test]
    fn test_name_is_keyword_fallback() {
        let filter = ProductFilter::from(ProductSearchQuery {
            name: Some("  phone ".to_owned()),
            sort_by: Some("price".to_owned()),
            sort_direction: Some("ASC".to_owned()),
            ..ProductSearchQuery::default()
        });
        assert_eq!(filter.keyword.as_deref(), Some("phone"));
        assert_eq!(filter.sort, ProductSort::Price);
        assert!(filter.ascending);
    }

    #[test]
    fn test_unknown_sort_orders_by_id() {
        assert_eq!(ProductSort::parse("popularity"), ProductSort::Id);
        assert_eq!(ProductSort::parse("createdAt").column(), "p.created_at");
    }

    #[test]
    fn test_blank_keyword_is_ignored() {
        let filter = ProductFilter::from(ProductSearchQuery {
            keyword: Some("   ".to_owned()),
            sort_direction: Some("sideways".to_owned()),
            ..ProductSearchQuery::default()
        });
        assert!(filter.keyword.is_none());
        assert!(!filter.ascending);
    }
}
