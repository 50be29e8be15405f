//! Product repository.
//!
//! Stock changes that belong to an order run on the caller's transaction
//! connection (see [`decrement_stock`] and [`restore_stock`]).

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use shoplite_core::{CategoryId, ProductId};

use super::users::escape_like;
use super::RepositoryError;
use crate::models::product::{Product, ProductFilter, ProductRequest};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.image_url, p.stock_quantity,
           p.category_id, c.name AS category_name, p.is_active, p.average_rating,
           p.review_count, p.created_at, p.updated_at
    FROM shop.products p
    LEFT JOIN shop.categories c ON c.id = p.category_id
";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }

    /// Fetch several products at once. Missing IDs are skipped; order is by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// All active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.is_active ORDER BY p.created_at DESC, p.id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Active products in one category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.is_active AND p.category_id = $1 ORDER BY p.created_at DESC, p.id"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Search active products.
    ///
    /// The keyword matches name or description without regard to case; price
    /// bounds are inclusive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        query.push(" WHERE p.is_active");

        if let Some(keyword) = &filter.keyword {
            let pattern = format!("%{}%", escape_like(keyword));
            query
                .push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR p.description ILIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(min) = filter.min_price {
            query.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND p.price <= ").push_bind(max);
        }

        query
            .push(" ORDER BY ")
            .push(filter.sort.column())
            .push(if filter.ascending { " ASC" } else { " DESC" })
            .push(", p.id");

        let products = query
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Insert a product. `is_active` defaults to true and stock to 0.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        request: &ProductRequest,
    ) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO shop.products (name, description, price, image_url, stock_quantity, category_id, is_active)
            VALUES ($1, $2, $3, $4, COALESCE($5, 0), $6, COALESCE($7, TRUE))
            RETURNING id
            ",
        )
        .bind(name)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(request.stock_quantity)
        .bind(request.category_id)
        .bind(request.is_active)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        request: &ProductRequest,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                image_url = COALESCE($5, image_url),
                stock_quantity = COALESCE($6, stock_quantity),
                category_id = COALESCE($7, category_id),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(request.stock_quantity)
        .bind(request.category_id)
        .bind(request.is_active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Recompute `average_rating` (one decimal) and `review_count` from all reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refresh_rating(&self, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shop.products p
            SET average_rating = COALESCE(
                    (SELECT ROUND(AVG(r.rating)::numeric, 1)::float8 FROM shop.reviews r WHERE r.product_id = p.id),
                    0),
                review_count = (SELECT COUNT(*) FROM shop.reviews r WHERE r.product_id = p.id),
                updated_at = NOW()
            WHERE p.id = $1
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Total number of products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.products")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

/// Take `quantity` units of stock, failing if fewer are left.
///
/// # Errors
///
/// Returns `RepositoryError::InsufficientStock` if the conditional update matched no row.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shop.products
        SET stock_quantity = stock_quantity - $2, updated_at = NOW()
        WHERE id = $1 AND stock_quantity >= $2
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::InsufficientStock { product_id });
    }
    Ok(())
}

/// Put `quantity` units back. A product deleted since the order was placed is skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn restore_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE shop.products SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(())
}
