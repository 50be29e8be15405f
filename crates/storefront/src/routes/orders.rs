//! Order routes.
//!
//! All routes require authentication. Customers see and change only their
//! own orders; listing everything and arbitrary status changes are admin-only.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use shoplite_core::{OrderId, OrderStatus, UserId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::order::{CreateOrderRequest, Order, UpdateOrderStatusRequest};
use crate::services::orders::OrderService;
use crate::state::AppState;

fn parse_status(value: &str) -> Result<OrderStatus> {
    value
        .parse()
        .map_err(|e: shoplite_core::ParseStatusError| AppError::BadRequest(e.to_string()))
}

/// Place a confirmed order, taking stock immediately.
///
/// POST /api/orders
///
/// # Errors
///
/// Returns 400 for empty or invalid lines and 409 when stock is short.
#[instrument(skip(state, caller, request), fields(caller = %caller.id, user_id = %request.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    caller.ensure_can_access(request.user_id)?;
    let order = OrderService::new(state.pool(), state.catalog()).place(&request).await?;
    add_breadcrumb("order", "Order placed", Some(&[("order_number", order.order_number.as_str())]));
    Ok((StatusCode::CREATED, Json(order)))
}

/// Place an order that waits for payment.
///
/// POST /api/orders/payment
///
/// # Errors
///
/// Returns 400 for empty or invalid lines and 409 when stock is short.
#[instrument(skip(state, caller, request), fields(caller = %caller.id, user_id = %request.user_id))]
pub async fn create_for_payment(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    caller.ensure_can_access(request.user_id)?;
    let order = OrderService::new(state.pool(), state.catalog())
        .place_for_payment(&request)
        .await?;
    add_breadcrumb(
        "order",
        "Order awaiting payment",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 if missing and 403 for another user's order.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.catalog()).get(id).await?;
    caller.ensure_can_access(order.user_id)?;
    Ok(Json(order))
}

/// GET /api/orders/number/{orderNumber}
///
/// # Errors
///
/// Returns 404 if missing and 403 for another user's order.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn show_by_number(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.catalog())
        .get_by_number(&order_number)
        .await?;
    caller.ensure_can_access(order.user_id)?;
    Ok(Json(order))
}

/// GET /api/orders/user/{userId}
///
/// # Errors
///
/// Returns 403 for another user's orders.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn list_by_user(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Order>>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(OrderService::new(state.pool(), state.catalog()).list_by_user(user_id).await?))
}

/// GET /api/orders/me
///
/// # Errors
///
/// Returns 401 if not authenticated.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderService::new(state.pool(), state.catalog()).list_by_user(caller.id).await?))
}

/// Confirm a pending order.
///
/// POST /api/orders/{id}/confirm
///
/// # Errors
///
/// Returns 409 unless the order is pending or when stock is short.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let orders = OrderService::new(state.pool(), state.catalog());
    caller.ensure_can_access(orders.get(id).await?.user_id)?;
    Ok(Json(orders.confirm(id).await?))
}

/// Cancel an order.
///
/// DELETE /api/orders/{id}
///
/// # Errors
///
/// Returns 409 for delivered or already cancelled orders.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let orders = OrderService::new(state.pool(), state.catalog());
    caller.ensure_can_access(orders.get(id).await?.user_id)?;
    Ok(Json(orders.cancel(id).await?))
}

/// GET /api/orders
///
/// # Errors
///
/// Returns 403 for non-admins.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderService::new(state.pool(), state.catalog()).list(None).await?))
}

/// GET /api/orders/status/{status}
///
/// # Errors
///
/// Returns 400 for an unknown status.
#[instrument(skip(state, _admin))]
pub async fn list_by_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(status): Path<String>,
) -> Result<Json<Vec<Order>>> {
    let status = parse_status(&status)?;
    Ok(Json(OrderService::new(state.pool(), state.catalog()).list(Some(status)).await?))
}

/// PUT /api/orders/{id}/status
///
/// # Errors
///
/// Returns 400 for an unknown status and 409 for a transition that is not allowed.
#[instrument(skip(state, _admin))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    let status = parse_status(&request.status)?;
    Ok(Json(
        OrderService::new(state.pool(), state.catalog())
            .update_status(id, status)
            .await?,
    ))
}
