//! Shopping cart rules.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

use shoplite_core::{CartItemId, ProductId, UserId};

use super::ServiceError;
use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::products::ProductRepository;
use crate::models::cart::CartItem;

pub struct CartService<'a> {
    cart: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cart: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, ServiceError> {
        Ok(self.cart.list_by_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the line does not exist.
    pub async fn get_item(&self, id: CartItemId) -> Result<CartItem, ServiceError> {
        self.cart
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Cart item"))
    }

    /// Add a product, merging with an existing line for the same product.
    ///
    /// The merge and its stock check run as one statement, so concurrent adds
    /// are all counted and never overshoot stock together.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a quantity below 1 or an inactive product.
    /// Returns `ServiceError::InsufficientStock` if the merged quantity exceeds stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, ServiceError> {
        validate_quantity(quantity)?;

        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .ok_or(ServiceError::NotFound("Product"))?;
        if !product.is_active {
            return Err(ServiceError::validation("Product is not available"));
        }

        ensure_stock(product.stock_quantity, quantity)?;

        debug!(%user_id, %product_id, quantity, "Adding to cart");
        self.cart
            .add_quantity(user_id, product_id, quantity)
            .await?
            .ok_or(ServiceError::InsufficientStock {
                available: product.stock_quantity,
            })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the line does not exist.
    /// Returns `ServiceError::InsufficientStock` if the quantity exceeds stock.
    pub async fn update_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, ServiceError> {
        validate_quantity(quantity)?;
        let line = self.get_item(id).await?;
        ensure_stock(line.stock_quantity, quantity)?;

        self.cart
            .set_quantity(id, quantity)
            .await
            .map_err(not_found_as_cart_item)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the line does not exist.
    pub async fn remove(&self, id: CartItemId) -> Result<(), ServiceError> {
        self.cart.delete(id).await.map_err(not_found_as_cart_item)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        self.cart.clear(user_id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product is not in the cart.
    pub async fn remove_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), ServiceError> {
        if self.cart.remove_product(user_id, product_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Cart item"))
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, ServiceError> {
        Ok(self.cart.count(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn total(&self, user_id: UserId) -> Result<Decimal, ServiceError> {
        Ok(self.cart.total(user_id).await?)
    }
}

fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::validation("Quantity must be at least 1"));
    }
    Ok(())
}

fn ensure_stock(available: i32, wanted: i32) -> Result<(), ServiceError> {
    if available < wanted {
        return Err(ServiceError::InsufficientStock { available });
    }
    Ok(())
}

fn not_found_as_cart_item(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::NotFound("Cart item"),
        other => ServiceError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-2).is_err());
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn test_stock_message() {
        let err = ensure_stock(3, 4).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock. Available: 3");
        assert!(ensure_stock(4, 4).is_ok());
    }
}
