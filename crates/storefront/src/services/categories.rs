//! Category management.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use shoplite_core::CategoryId;

use super::ServiceError;
use super::catalog_cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::categories::CategoryRepository;
use crate::models::category::{Category, CategoryRequest};

pub struct CategoryService<'a> {
    categories: CategoryRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> CategoryService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            categories: CategoryRepository::new(pool),
            cache,
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.categories.list().await?)
    }

    /// Active categories, served from cache when warm.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_active(&self) -> Result<Arc<Vec<Category>>, ServiceError> {
        if let Some(categories) = self.cache.active_categories().await {
            return Ok(categories);
        }
        let categories = self.categories.list_active().await?;
        Ok(self.cache.put_active_categories(categories).await)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn get(&self, id: CategoryId) -> Result<Category, ServiceError> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Category"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn search(&self, name: &str) -> Result<Vec<Category>, ServiceError> {
        Ok(self.categories.search(name.trim()).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Validation` without a name.
    /// Returns `ServiceError::Conflict` if the name is taken.
    pub async fn create(&self, request: &CategoryRequest) -> Result<Category, ServiceError> {
        let name = required_name(request.name.as_deref())?;
        if self.categories.get_by_name(name).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "Category name already exists: {name}"
            )));
        }

        let category = self
            .categories
            .create(name, request)
            .await
            .map_err(conflict_as_duplicate_name)?;
        self.cache.invalidate_all().await;
        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    /// Returns `ServiceError::Conflict` if another category has the new name.
    pub async fn update(
        &self,
        id: CategoryId,
        request: &CategoryRequest,
    ) -> Result<Category, ServiceError> {
        if let Some(name) = request.name.as_deref() {
            let name = required_name(Some(name))?;
            if let Some(existing) = self.categories.get_by_name(name).await?
                && existing.id != id
            {
                return Err(ServiceError::conflict(format!(
                    "Category name already exists: {name}"
                )));
            }
        }

        let mut request = request.clone();
        request.name = request.name.map(|n| n.trim().to_owned());

        let category = self
            .categories
            .update(id, &request)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::NotFound("Category"),
                other => conflict_as_duplicate_name(other),
            })?;
        self.cache.invalidate_all().await;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), ServiceError> {
        self.categories.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("Category"),
            other => ServiceError::Repository(other),
        })?;
        self.cache.invalidate_all().await;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

fn required_name(name: Option<&str>) -> Result<&str, ServiceError> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServiceError::validation("Category name is required"))
}

fn conflict_as_duplicate_name(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::Conflict(_) => ServiceError::conflict("Category name already exists"),
        other => ServiceError::Repository(other),
    }
}
