//! Wishlist routes.
//!
//! Per-user routes require the owner or an admin; the product counters and
//! the popular list are public.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use shoplite_core::{ProductId, UserId};

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAuth;
use crate::models::product::PopularProduct;
use crate::models::wishlist::{WishlistItem, WishlistQuery};
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

const DEFAULT_POPULAR_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
}

/// POST /api/wishlist/add?userId&productId
///
/// # Errors
///
/// Returns 404 for an unknown product and 409 if it is already saved.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(query): Query<WishlistQuery>,
) -> Result<Json<Value>> {
    caller.ensure_can_access(query.user_id)?;
    let item = WishlistService::new(state.pool())
        .add(query.user_id, query.product_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Added to wishlist",
        "wishlist": item,
    })))
}

/// DELETE /api/wishlist/remove?userId&productId
///
/// # Errors
///
/// Returns 404 if the product was not saved.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(query): Query<WishlistQuery>,
) -> Result<Json<Value>> {
    caller.ensure_can_access(query.user_id)?;
    WishlistService::new(state.pool())
        .remove(query.user_id, query.product_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Removed from wishlist",
    })))
}

/// POST /api/wishlist/toggle?userId&productId
///
/// # Errors
///
/// Returns 404 for an unknown product.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(query): Query<WishlistQuery>,
) -> Result<Json<Value>> {
    caller.ensure_can_access(query.user_id)?;
    let added = WishlistService::new(state.pool())
        .toggle(query.user_id, query.product_id)
        .await?;
    let message = if added {
        "Added to wishlist"
    } else {
        "Removed from wishlist"
    };
    Ok(Json(json!({
        "success": true,
        "added": added,
        "message": message,
    })))
}

/// GET /api/wishlist/user/{userId}
///
/// # Errors
///
/// Returns 403 for another user's wishlist.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<WishlistItem>>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(WishlistService::new(state.pool()).list(user_id).await?))
}

/// GET /api/wishlist/check?userId&productId
///
/// # Errors
///
/// Returns 403 for another user's wishlist.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn check(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(query): Query<WishlistQuery>,
) -> Result<Json<Value>> {
    caller.ensure_can_access(query.user_id)?;
    let saved = WishlistService::new(state.pool())
        .contains(query.user_id, query.product_id)
        .await?;
    Ok(Json(json!({ "isInWishlist": saved })))
}

/// GET /api/wishlist/count/{userId}
///
/// # Errors
///
/// Returns 403 for another user's wishlist.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn count_for_user(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Value>> {
    caller.ensure_can_access(user_id)?;
    let count = WishlistService::new(state.pool())
        .count_for_user(user_id)
        .await?;
    Ok(Json(json!({ "count": count })))
}

/// GET /api/wishlist/product/{productId}/count
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn count_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let count = WishlistService::new(state.pool())
        .count_for_product(product_id)
        .await?;
    Ok(Json(json!({ "count": count })))
}

/// GET /api/wishlist/popular?limit=10
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<PopularProduct>>> {
    let limit = query.limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
    Ok(Json(WishlistService::new(state.pool()).popular(limit).await?))
}
