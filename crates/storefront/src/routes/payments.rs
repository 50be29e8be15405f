//! Payment routes (Toss Payments).
//!
//! Flow: the client places a `PENDING` order, opens the Toss widget with the
//! order number as `orderId`, then calls `/confirm` with what Toss redirected
//! back with. Confirmation re-checks the amount against the stored order.

use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, instrument};

use shoplite_core::{PaymentId, UserId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path, Query};
use crate::middleware::{AuthUser, RequireAuth};
use crate::models::payment::{
    CancelPaymentQuery, ConfirmPaymentQuery, CreatePaymentRequest, Payment, PaymentFailure,
};
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use crate::state::AppState;

const DEFAULT_CANCEL_REASON: &str = "Customer requested cancellation";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientKey {
    pub client_key: String,
}

fn service(state: &AppState) -> PaymentService<'_> {
    PaymentService::new(state.pool(), state.toss(), state.catalog())
}

/// Payments without an order belong to nobody, so only admins may see them.
async fn ensure_payment_access(
    payments: &PaymentService<'_>,
    caller: &AuthUser,
    payment: &Payment,
) -> Result<()> {
    match payments.owner(payment).await? {
        Some(owner) => caller.ensure_can_access(owner),
        None if caller.is_admin() => Ok(()),
        None => Err(AppError::Forbidden("Access denied".to_owned())),
    }
}

/// Confirm a payment the widget authorized.
///
/// POST /api/payments/confirm?paymentKey&orderId&amount
///
/// # Errors
///
/// Returns 404 for an unknown order, 409 unless it is pending, 400 when the
/// amount differs or Toss rejects the payment, and 502 when Toss is unreachable.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Query(query): Query<ConfirmPaymentQuery>,
) -> Result<Json<Payment>> {
    let order = OrderService::new(state.pool(), state.catalog())
        .get_by_number(&query.order_id)
        .await?;
    caller.ensure_can_access(order.user_id)?;

    let payment = service(&state)
        .confirm(&order, &query.payment_key, query.amount)
        .await?;
    add_breadcrumb(
        "payment",
        "Payment confirmed",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    Ok(Json(payment))
}

/// Record a pending payment for an order.
///
/// POST /api/payments
///
/// # Errors
///
/// Returns 404 for an unknown order and 409 if a payment already exists for it.
#[instrument(skip(state, caller, request), fields(caller = %caller.id, order_id = %request.order_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>)> {
    let order = OrderService::new(state.pool(), state.catalog())
        .get(request.order_id)
        .await?;
    caller.ensure_can_access(order.user_id)?;

    let payment = service(&state).create(&order, &request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Cancel an approved payment and its order.
///
/// POST /api/payments/{paymentKey}/cancel?cancelReason
///
/// # Errors
///
/// Returns 404 for an unknown key, 409 unless the payment is approved.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(payment_key): Path<String>,
    Query(query): Query<CancelPaymentQuery>,
) -> Result<Json<Payment>> {
    let payments = service(&state);
    let payment = payments.get_by_key(&payment_key).await?;
    ensure_payment_access(&payments, &caller, &payment).await?;

    let reason = query
        .cancel_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCEL_REASON);
    Ok(Json(payments.cancel(&payment, reason).await?))
}

/// GET /api/payments/{id}
///
/// # Errors
///
/// Returns 404 if missing and 403 for another user's payment.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>> {
    let payments = service(&state);
    let payment = payments.get(id).await?;
    ensure_payment_access(&payments, &caller, &payment).await?;
    Ok(Json(payment))
}

/// GET /api/payments/key/{paymentKey}
///
/// # Errors
///
/// Returns 404 if missing and 403 for another user's payment.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn show_by_key(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(payment_key): Path<String>,
) -> Result<Json<Payment>> {
    let payments = service(&state);
    let payment = payments.get_by_key(&payment_key).await?;
    ensure_payment_access(&payments, &caller, &payment).await?;
    Ok(Json(payment))
}

/// GET /api/payments/user/{userId}
///
/// # Errors
///
/// Returns 403 for another user's payments.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn list_by_user(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Payment>>> {
    caller.ensure_can_access(user_id)?;
    Ok(Json(service(&state).list_by_user(user_id).await?))
}

/// Public key for the payment widget.
///
/// GET /api/payments/client-key
pub async fn client_key(State(state): State<AppState>) -> Json<ClientKey> {
    Json(ClientKey {
        client_key: state.toss().client_key().to_owned(),
    })
}

/// Failure notice from the payment widget.
///
/// POST /api/payments/webhook/fail
///
/// Always acknowledged; processing errors are only logged.
#[instrument(skip(state))]
pub async fn webhook_fail(
    State(state): State<AppState>,
    Json(failure): Json<PaymentFailure>,
) -> Json<Value> {
    if let Err(e) = service(&state).record_failure(&failure).await {
        error!(error = %e, "Failed to record payment failure");
    }
    Json(json!({ "status": "received" }))
}
