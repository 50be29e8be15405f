//! Category routes.
//!
//! Reads are public; writes require an admin.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use shoplite_core::CategoryId;

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::category::{Category, CategoryRequest};
use crate::services::categories::CategoryService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategorySearch {
    #[serde(default)]
    pub name: String,
}

fn service(state: &AppState) -> CategoryService<'_> {
    CategoryService::new(state.pool(), state.catalog())
}

/// GET /api/categories
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(service(&state).list().await?))
}

/// GET /api/categories/active
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn list_active(State(state): State<AppState>) -> Result<Json<Arc<Vec<Category>>>> {
    Ok(Json(service(&state).list_active().await?))
}

/// GET /api/categories/{id}
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    Ok(Json(service(&state).get(id).await?))
}

/// GET /api/categories/search?name=
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<CategorySearch>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(service(&state).search(&query.name).await?))
}

/// POST /api/categories
///
/// # Errors
///
/// Returns 400 without a name and 409 for a duplicate name.
#[instrument(skip(state, _admin))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = service(&state).create(&request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id}
///
/// # Errors
///
/// Returns 404 if missing and 409 if the new name belongs to another category.
#[instrument(skip(state, _admin))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    Ok(Json(service(&state).update(id, &request).await?))
}

/// DELETE /api/categories/{id}
///
/// # Errors
///
/// Returns 404 if the category does not exist.
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
