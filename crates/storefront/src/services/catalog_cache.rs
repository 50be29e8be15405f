//! In-memory cache for hot catalog reads.
//!
//! Caches single products and the active-category list using `moka`
//! (5-minute TTL). Writers invalidate what they touch, including order status
//! changes that move stock; category writes drop everything because product
//! DTOs embed the category name.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use shoplite_core::ProductId;

use crate::models::category::Category;
use crate::models::order::Order;
use crate::models::product::Product;

/// Cache key for products and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    ActiveCategories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Categories(Arc<Vec<Category>>),
}

/// Shared catalog cache. Cloning shares the same entries.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        match self.cache.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(product)) => {
                debug!(product_id = %id, "Cache hit for product");
                Some(*product)
            }
            _ => None,
        }
    }

    pub async fn put_product(&self, product: &Product) {
        self.cache
            .insert(
                CacheKey::Product(product.id),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;
    }

    /// Drop a cached product after it changed.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.cache.invalidate(&CacheKey::Product(id)).await;
    }

    /// Drop every cached product an order's stock change touched.
    pub async fn invalidate_order_products(&self, order: &Order) {
        for product_id in order.items.iter().filter_map(|item| item.product_id) {
            self.invalidate_product(product_id).await;
        }
    }

    pub async fn active_categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.cache.get(&CacheKey::ActiveCategories).await {
            Some(CacheValue::Categories(categories)) => {
                debug!("Cache hit for active categories");
                Some(categories)
            }
            _ => None,
        }
    }

    pub async fn put_active_categories(&self, categories: Vec<Category>) -> Arc<Vec<Category>> {
        let categories = Arc::new(categories);
        self.cache
            .insert(
                CacheKey::ActiveCategories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        categories
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use shoplite_core::{CategoryId, OrderId, OrderItemId, OrderStatus, UserId};

    use super::*;
    use crate::models::order::OrderItem;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product {id}"),
            description: None,
            price: Decimal::new(1000, 0),
            image_url: None,
            stock_quantity: 5,
            category_id: Some(CategoryId::new(1)),
            category_name: Some("도서".to_owned()),
            is_active: true,
            average_rating: 0.0,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_product_round_trip_and_invalidate() {
        let cache = CatalogCache::default();
        assert!(cache.product(ProductId::new(1)).await.is_none());

        cache.put_product(&product(1)).await;
        let hit = cache.product(ProductId::new(1)).await;
        assert_eq!(hit.map(|p| p.name), Some("product 1".to_owned()));

        cache.invalidate_product(ProductId::new(1)).await;
        assert!(cache.product(ProductId::new(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_order_stock_change_drops_its_products() {
        let cache = CatalogCache::default();
        for id in 1..=3 {
            cache.put_product(&product(id)).await;
        }

        let line = |id: i32, product_id: Option<ProductId>| OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(7),
            product_id,
            product_name: format!("product {id}"),
            quantity: 1,
            price: Decimal::new(1000, 0),
            total_price: Decimal::new(1000, 0),
        };
        let order = Order {
            id: OrderId::new(7),
            order_number: "ORD-7".to_owned(),
            user_id: UserId::new(1),
            status: OrderStatus::Confirmed,
            total_amount: Decimal::new(2000, 0),
            shipping_name: None,
            shipping_phone: None,
            shipping_address: None,
            notes: None,
            items: vec![
                line(1, Some(ProductId::new(1))),
                line(2, Some(ProductId::new(3))),
                line(3, None),
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        cache.invalidate_order_products(&order).await;
        assert!(cache.product(ProductId::new(1)).await.is_none());
        assert!(cache.product(ProductId::new(2)).await.is_some());
        assert!(cache.product(ProductId::new(3)).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_categories() {
        let cache = CatalogCache::default();
        cache.put_active_categories(Vec::new()).await;
        cache.put_product(&product(2)).await;
        assert!(cache.active_categories().await.is_some());

        cache.invalidate_all().await;
        assert!(cache.active_categories().await.is_none());
        assert!(cache.product(ProductId::new(2)).await.is_none());
    }
}
