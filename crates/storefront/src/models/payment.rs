//! Payment attempts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoplite_core::{OrderId, PaymentId, PaymentMethod, PaymentStatus};

/// Name stored in `payment_provider` for every Toss payment.
pub const TOSS_PROVIDER: &str = "TOSS_PAYMENTS";

/// A payment as stored and as returned by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: Option<OrderId>,
    pub payment_key: String,
    pub order_id_string: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub payment_provider: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payment row to insert, or to write over an existing row with the same key.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub order_id: Option<OrderId>,
    pub payment_key: String,
    pub order_id_string: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub approved_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// `POST /api/payments/confirm` query string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentQuery {
    pub payment_key: String,
    /// The order number handed to the payment widget.
    pub order_id: String,
    pub amount: Decimal,
}

/// `POST /api/payments` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    pub payment_key: String,
    pub order_id_string: String,
    pub amount: Decimal,
    pub method: Option<PaymentMethod>,
}

/// `POST /api/payments/{paymentKey}/cancel` query string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentQuery {
    pub cancel_reason: Option<String>,
}

/// `POST /api/payments/webhook/fail` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailure {
    pub payment_key: Option<String>,
    pub order_id: Option<String>,
    pub message: Option<String>,
}
