//! Cart routes.
//!
//! Every route requires authentication; a cart can only be read or changed
//! by its owner or an admin.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use tracing::instrument;

use shoplite_core::{CartItemId, ProductId, UserId};

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCartRequest, CartItem, UpdateQuantityRequest};
use crate::services::cart::CartService;
use crate::state::AppState;

/// GET /api/cart/user/{userId}
///
/// # Errors
///
/// Returns 403 for another user's cart.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn items(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<CartItem>>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(CartService::new(state.pool()).items(user_id).await?))
}

/// POST /api/cart
///
/// # Errors
///
/// Returns 400 for a quantity below 1, 404 for an unknown product, and 409
/// when stock cannot cover the merged quantity.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    caller.ensure_can_access(request.user_id)?;
    let item = CartService::new(state.pool())
        .add(request.user_id, request.product_id, request.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/cart/{id}
///
/// # Errors
///
/// Returns 404 for an unknown line and 409 when stock is short.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<CartItemId>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartItem>> {
    let cart = CartService::new(state.pool());
    caller.ensure_can_access(cart.get_item(id).await?.user_id)?;
    Ok(Json(cart.update_quantity(id, request.quantity).await?))
}

/// DELETE /api/cart/{id}
///
/// # Errors
///
/// Returns 404 for an unknown line.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    let cart = CartService::new(state.pool());
    caller.ensure_can_access(cart.get_item(id).await?.user_id)?;
    cart.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/cart/user/{userId}
///
/// # Errors
///
/// Returns 403 for another user's cart.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode> {
    caller.ensure_can_access(user_id)?;
    CartService::new(state.pool()).clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/cart/user/{userId}/product/{productId}
///
/// # Errors
///
/// Returns 404 if the product is not in the cart.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn remove_product(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path((user_id, product_id)): Path<(UserId, ProductId)>,
) -> Result<StatusCode> {
    caller.ensure_can_access(user_id)?;
    CartService::new(state.pool())
        .remove_product(user_id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/cart/user/{userId}/count
///
/// # Errors
///
/// Returns 403 for another user's cart.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<i64>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(CartService::new(state.pool()).count(user_id).await?))
}

/// GET /api/cart/user/{userId}/total
///
/// # Errors
///
/// Returns 403 for another user's cart.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn total(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Decimal>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(CartService::new(state.pool()).total(user_id).await?))
}
