//! Catalog queries and product administration.

use sqlx::PgPool;
use tracing::info;

use shoplite_core::{CategoryId, Price, ProductId};

use super::ServiceError;
use super::catalog_cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::categories::CategoryRepository;
use crate::db::products::ProductRepository;
use crate::models::product::{Product, ProductFilter, ProductRequest};

pub struct ProductService<'a> {
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
            cache,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.products.list_active().await?)
    }

    /// Get a product, active or not.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        if let Some(product) = self.cache.product(id).await {
            return Ok(product);
        }
        let product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Product"))?;
        self.cache.put_product(&product).await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the price bounds are inverted.
    pub async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, ServiceError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
            && min > max
        {
            return Err(ServiceError::validation(
                "minPrice must not be greater than maxPrice",
            ));
        }
        Ok(self.products.search(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, ServiceError> {
        Ok(self.products.list_by_category(category_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a missing name, non-positive price,
    /// negative stock, or unknown category.
    pub async fn create(&self, request: &ProductRequest) -> Result<Product, ServiceError> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::validation("Product name is required"))?;
        if request.price.is_none() {
            return Err(ServiceError::validation("Product price is required"));
        }
        self.validate(request).await?;

        let product = self.products.create(name, request).await?;
        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Validation` for invalid fields.
    pub async fn update(
        &self,
        id: ProductId,
        request: &ProductRequest,
    ) -> Result<Product, ServiceError> {
        if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::validation("Product name cannot be blank"));
        }
        self.validate(request).await?;

        let product = self
            .products
            .update(id, request)
            .await
            .map_err(not_found_as_product)?;
        self.cache.invalidate_product(id).await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        self.products.delete(id).await.map_err(not_found_as_product)?;
        self.cache.invalidate_product(id).await;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Recompute a product's rating aggregates after its reviews changed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the update fails.
    pub async fn refresh_rating(&self, id: ProductId) -> Result<(), ServiceError> {
        self.products.refresh_rating(id).await?;
        self.cache.invalidate_product(id).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count(&self) -> Result<i64, ServiceError> {
        Ok(self.products.count().await?)
    }

    async fn validate(&self, request: &ProductRequest) -> Result<(), ServiceError> {
        if let Some(price) = request.price {
            Price::new(price).map_err(|e| ServiceError::validation(e.to_string()))?;
        }
        if request.stock_quantity.is_some_and(|s| s < 0) {
            return Err(ServiceError::validation("stockQuantity cannot be negative"));
        }
        if let Some(category_id) = request.category_id
            && self.categories.get_by_id(category_id).await?.is_none()
        {
            return Err(ServiceError::validation(format!(
                "Category not found: {category_id}"
            )));
        }
        Ok(())
    }
}

fn not_found_as_product(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::NotFound("Product"),
        other => ServiceError::Repository(other),
    }
}
