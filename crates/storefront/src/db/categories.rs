//! Category repository.

use sqlx::PgPool;

use shoplite_core::CategoryId;

use super::users::escape_like;
use super::{RepositoryError, conflict_on_unique};
use crate::models::category::{Category, CategoryRequest};

const CATEGORY_COLUMNS: &str =
    "id, name, description, image_url, display_order, is_active, created_at, updated_at";

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.categories ORDER BY display_order, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Active categories by display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.categories WHERE is_active ORDER BY display_order, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Look up a category by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.categories WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Categories whose name contains `term`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, term: &str) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            r"
            SELECT {CATEGORY_COLUMNS} FROM shop.categories
            WHERE name ILIKE $1 ESCAPE '\'
            ORDER BY display_order, id
            "
        ))
        .bind(format!("%{}%", escape_like(term)))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Insert a category. Missing `display_order`/`is_active` default to 0/true.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(
        &self,
        name: &str,
        request: &CategoryRequest,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO shop.categories (name, description, image_url, display_order, is_active)
            VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, TRUE))
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(name)
        .bind(&request.description)
        .bind(&request.image_url)
        .bind(request.display_order)
        .bind(request.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("category name"))?;

        Ok(category)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        request: &CategoryRequest,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE shop.categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                display_order = COALESCE($5, display_order),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.image_url)
        .bind(request.display_order)
        .bind(request.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("category name"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
