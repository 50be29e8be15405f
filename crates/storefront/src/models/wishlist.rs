//! Saved products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shoplite_core::{ProductId, UserId, WishlistId};

use super::product::Product;

/// A stored wishlist row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistRow {
    pub id: WishlistId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A wishlist entry with the full product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: WishlistId,
    pub user_id: UserId,
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

impl WishlistItem {
    #[must_use]
    pub fn new(row: WishlistRow, product: Product) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product,
            created_at: row.created_at,
        }
    }
}

/// `?userId=&productId=` query shared by add/remove/toggle/check.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistQuery {
    pub user_id: UserId,
    pub product_id: ProductId,
}
