//! Product routes.
//!
//! Listing and search only ever return active products. Writes require an
//! admin and invalidate the catalog cache through the service.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use shoplite_core::{CategoryId, ProductId};

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::product::{Product, ProductFilter, ProductRequest, ProductSearchQuery};
use crate::services::products::ProductService;
use crate::state::AppState;

fn service(state: &AppState) -> ProductService<'_> {
    ProductService::new(state.pool(), state.catalog())
}

/// GET /api/products
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(service(&state).list_active().await?))
}

/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(service(&state).get(id).await?))
}

/// GET /api/products/search
///
/// # Errors
///
/// Returns 400 if `minPrice` is greater than `maxPrice`.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter::from(query);
    Ok(Json(service(&state).search(&filter).await?))
}

/// GET /api/products/category/{categoryId}
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn by_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(service(&state).list_by_category(category_id).await?))
}

/// POST /api/products
///
/// # Errors
///
/// Returns 400 for a missing name or price, a non-positive price, negative
/// stock, or an unknown category.
#[instrument(skip(state, _admin))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = service(&state).create(&request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product does not exist, 400 for invalid fields.
#[instrument(skip(state, _admin))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(service(&state).update(id, &request).await?))
}

/// DELETE /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
