//! Wishlists.

use sqlx::PgPool;

use shoplite_core::{ProductId, UserId};

use super::ServiceError;
use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::db::wishlist::WishlistRepository;
use crate::models::product::{PopularProduct, Product};
use crate::models::wishlist::WishlistItem;

/// Upper bound for `/popular?limit=`.
const MAX_POPULAR: i64 = 100;

pub struct WishlistService<'a> {
    wishlists: WishlistRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            wishlists: WishlistRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Conflict` if it is already saved.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistItem, ServiceError> {
        let product = self.product(product_id).await?;
        let row = self
            .wishlists
            .add(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ServiceError::conflict("Product is already in the wishlist")
                }
                other => ServiceError::Repository(other),
            })?;
        Ok(WishlistItem::new(row, product))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product was not saved.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), ServiceError> {
        if self.wishlists.remove(user_id, product_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Wishlist item"))
        }
    }

    /// Save the product if absent, remove it if present. Returns whether it is now saved.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn toggle(&self, user_id: UserId, product_id: ProductId) -> Result<bool, ServiceError> {
        if self.wishlists.remove(user_id, product_id).await? {
            return Ok(false);
        }
        match self.add(user_id, product_id).await {
            Ok(_) => Ok(true),
            // A concurrent toggle saved it first; it is saved either way.
            Err(ServiceError::Conflict(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// A user's saved products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistItem>, ServiceError> {
        let rows = self.wishlists.list_by_user(user_id).await?;
        let ids: Vec<ProductId> = rows.iter().map(|r| r.product_id).collect();
        let products = self.products.get_many(&ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let product = products.iter().find(|p| p.id == row.product_id)?.clone();
                Some(WishlistItem::new(row, product))
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn contains(&self, user_id: UserId, product_id: ProductId) -> Result<bool, ServiceError> {
        Ok(self.wishlists.contains(user_id, product_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, ServiceError> {
        Ok(self.wishlists.count_by_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count_for_product(&self, product_id: ProductId) -> Result<i64, ServiceError> {
        Ok(self.wishlists.count_by_product(product_id).await?)
    }

    /// Most saved active products, most saves first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn popular(&self, limit: i64) -> Result<Vec<PopularProduct>, ServiceError> {
        let counts = self.wishlists.most_saved(limit.clamp(1, MAX_POPULAR)).await?;
        let ids: Vec<ProductId> = counts.iter().map(|(id, _)| *id).collect();
        let products = self.products.get_many(&ids).await?;

        Ok(counts
            .into_iter()
            .filter_map(|(id, wishlist_count)| {
                let product = products.iter().find(|p| p.id == id)?.clone();
                Some(PopularProduct {
                    product,
                    wishlist_count,
                })
            })
            .collect())
    }

    async fn product(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.products
            .get_by_id(product_id)
            .await?
            .ok_or(ServiceError::NotFound("Product"))
    }
}
