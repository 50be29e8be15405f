//! Cart repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use shoplite_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartItem;

/// Columns selected from a `ci` cart row joined with its product `p`.
const CART_ITEM_COLUMNS: &str = r"
    ci.id, ci.user_id, ci.product_id, p.name AS product_name, p.price AS product_price,
    p.image_url AS product_image_url, p.stock_quantity, ci.quantity,
    p.price * ci.quantity AS total_price, ci.created_at, ci.updated_at
";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cart, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            r"
            SELECT {CART_ITEM_COLUMNS}
            FROM shop.cart_items ci JOIN shop.products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            r"
            SELECT {CART_ITEM_COLUMNS}
            FROM shop.cart_items ci JOIN shop.products p ON p.id = ci.product_id
            WHERE ci.id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Add `quantity` to the user's line for a product, creating the line if
    /// needed, as long as the resulting quantity stays within stock.
    ///
    /// The sum is taken in the database so concurrent adds cannot lose an
    /// update or overshoot stock. Returns `None` when stock would be exceeded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            r"
            WITH ci AS (
                INSERT INTO shop.cart_items (user_id, product_id, quantity)
                SELECT $1, p.id, $3
                FROM shop.products p
                WHERE p.id = $2 AND p.stock_quantity >= $3
                ON CONFLICT (user_id, product_id)
                DO UPDATE SET quantity = shop.cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
                WHERE shop.cart_items.quantity <= (
                    SELECT stock_quantity FROM shop.products WHERE id = EXCLUDED.product_id
                ) - EXCLUDED.quantity
                RETURNING *
            )
            SELECT {CART_ITEM_COLUMNS}
            FROM ci JOIN shop.products p ON p.id = ci.product_id
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn set_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(&format!(
            r"
            WITH ci AS (
                UPDATE shop.cart_items SET quantity = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {CART_ITEM_COLUMNS}
            FROM ci JOIN shop.products p ON p.id = ci.product_id
            "
        ))
        .bind(id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn delete(&self, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove every line of a user's cart. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove the user's line for one product. Returns whether a line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of lines in a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Σ price × quantity over a user's cart, at current prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total(&self, user_id: UserId) -> Result<Decimal, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(p.price * ci.quantity), 0)
            FROM shop.cart_items ci JOIN shop.products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}
