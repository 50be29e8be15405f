//! Payment confirmation and cancellation against Toss Payments.
//!
//! Callers resolve and authorize the order first; this service enforces the
//! payment rules and keeps the local payment row in step with the provider.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{error, info, warn};

use shoplite_core::{OrderStatus, PaymentId, PaymentMethod, PaymentStatus, UserId};

use super::ServiceError;
use super::catalog_cache::CatalogCache;
use super::toss::TossClient;
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::payments::PaymentRepository;
use crate::models::order::Order;
use crate::models::payment::{CreatePaymentRequest, Payment, PaymentFailure, PaymentRecord};

const STOCK_CANCEL_REASON: &str = "Insufficient stock after payment approval";

pub struct PaymentService<'a> {
    orders: OrderRepository<'a>,
    payments: PaymentRepository<'a>,
    toss: &'a TossClient,
    cache: &'a CatalogCache,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, toss: &'a TossClient, cache: &'a CatalogCache) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            payments: PaymentRepository::new(pool),
            toss,
            cache,
        }
    }

    /// Confirm an authorized payment for `order` and take its stock.
    ///
    /// Replaying a confirmation for an already approved payment key of the same
    /// order returns the stored payment unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the key was recorded for another
    /// order, unless the order is `PENDING`, or when stock ran out after
    /// approval (the provider payment is then cancelled).
    /// Returns `ServiceError::Validation` if `amount` differs from the order total.
    /// Returns `ServiceError::Payment` if Toss rejects or fails the call.
    pub async fn confirm(
        &self,
        order: &Order,
        payment_key: &str,
        amount: Decimal,
    ) -> Result<Payment, ServiceError> {
        if let Some(existing) = self.payments.get_by_key(payment_key).await? {
            ensure_same_order(&existing, order)?;
            if existing.status == PaymentStatus::Approved {
                info!(payment_key, "Payment already approved");
                return Ok(existing);
            }
        }

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "Order {} is {} and cannot be paid",
                order.order_number, order.status
            )));
        }
        if amount != order.total_amount {
            return Err(ServiceError::validation(format!(
                "Payment amount {amount} does not match order total {}",
                order.total_amount
            )));
        }

        let mut record = PaymentRecord {
            order_id: Some(order.id),
            payment_key: payment_key.to_owned(),
            order_id_string: order.order_number.clone(),
            amount,
            status: PaymentStatus::Pending,
            method: PaymentMethod::Card,
            approved_at: None,
            failure_reason: None,
        };

        let approved = match self.toss.confirm(payment_key, &order.order_number, amount).await {
            Ok(approved) => approved,
            Err(e) => {
                warn!(payment_key, error = %e, "Toss rejected payment confirmation");
                record.status = PaymentStatus::Failed;
                record.failure_reason = Some(e.to_string());
                self.payments.save(&record).await?;
                return Err(ServiceError::Payment(e));
            }
        };

        record.status = PaymentStatus::Approved;
        record.method = PaymentMethod::from_provider(
            approved.method.as_deref(),
            approved.easy_pay.as_ref().and_then(|e| e.provider.as_deref()),
        );
        record.approved_at = Some(approved.approved_at_utc().unwrap_or_else(Utc::now));

        match self.orders.confirm(order.id, Some(&record)).await {
            Ok(confirmed) => self.cache.invalidate_order_products(&confirmed).await,
            Err(e) => return Err(self.roll_back_approval(record, e).await),
        }

        info!(
            payment_key,
            order_number = %order.order_number,
            method = %record.method,
            "Payment approved"
        );
        self.payments
            .get_by_key(payment_key)
            .await?
            .ok_or(ServiceError::NotFound("Payment"))
    }

    /// The provider approved but the order could not be confirmed: cancel at the
    /// provider and record the payment as cancelled.
    async fn roll_back_approval(&self, mut record: PaymentRecord, cause: RepositoryError) -> ServiceError {
        let reason = match &cause {
            RepositoryError::InsufficientStock { .. } => STOCK_CANCEL_REASON.to_owned(),
            other => format!("Order confirmation failed: {other}"),
        };
        error!(payment_key = %record.payment_key, %reason, "Cancelling approved payment");

        if let Err(e) = self.toss.cancel(&record.payment_key, &reason).await {
            error!(payment_key = %record.payment_key, error = %e, "Failed to cancel payment at Toss");
        }

        record.status = PaymentStatus::Canceled;
        record.failure_reason = Some(reason.clone());
        match self.payments.save(&record).await {
            Ok(_) => {
                if let Err(e) = self.payments.mark_canceled(&record.payment_key, &reason).await {
                    error!(error = %e, "Failed to stamp payment cancellation");
                }
            }
            Err(e) => error!(error = %e, "Failed to record cancelled payment"),
        }

        match cause {
            RepositoryError::InsufficientStock { .. } => {
                ServiceError::conflict(format!("{STOCK_CANCEL_REASON}; the payment was cancelled"))
            }
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            RepositoryError::NotFound => ServiceError::NotFound("Order"),
            other => ServiceError::Repository(other),
        }
    }

    /// Record a `PENDING` payment before the customer is sent to the widget.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if a payment already exists for the order number.
    pub async fn create(
        &self,
        order: &Order,
        request: &CreatePaymentRequest,
    ) -> Result<Payment, ServiceError> {
        if request.payment_key.trim().is_empty() {
            return Err(ServiceError::validation("paymentKey is required"));
        }
        if self
            .payments
            .latest_for_order_number(&request.order_id_string)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(
                "Payment already in progress for this order",
            ));
        }

        let record = PaymentRecord {
            order_id: Some(order.id),
            payment_key: request.payment_key.clone(),
            order_id_string: request.order_id_string.clone(),
            amount: request.amount,
            status: PaymentStatus::Pending,
            method: request.method.unwrap_or(PaymentMethod::Card),
            approved_at: None,
            failure_reason: None,
        };
        self.payments.insert(&record).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                ServiceError::conflict("Payment already in progress for this order")
            }
            other => ServiceError::Repository(other),
        })
    }

    /// Cancel an approved payment and the order it paid for.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` unless the payment is `APPROVED`.
    /// Returns `ServiceError::Payment` if Toss refuses the cancellation.
    pub async fn cancel(&self, payment: &Payment, reason: &str) -> Result<Payment, ServiceError> {
        if payment.status != PaymentStatus::Approved {
            return Err(ServiceError::conflict(format!(
                "Only approved payments can be cancelled (status: {})",
                payment.status
            )));
        }

        self.toss.cancel(&payment.payment_key, reason).await?;
        let cancelled = self
            .payments
            .mark_canceled(&payment.payment_key, reason)
            .await?;

        if let Some(order_id) = payment.order_id {
            match self.orders.cancel(order_id).await {
                Ok(order) => {
                    self.cache.invalidate_order_products(&order).await;
                    info!(order_id = %order_id, "Order cancelled with its payment");
                }
                Err(e) => warn!(order_id = %order_id, error = %e, "Order not cancelled with payment"),
            }
        }

        info!(payment_key = %payment.payment_key, "Payment cancelled");
        Ok(cancelled)
    }

    /// Apply a provider failure notice.
    ///
    /// Unknown orders are ignored, and so are keys that belong to another
    /// order or are past `PENDING`. Otherwise the payment is recorded `FAILED`
    /// and a pending order is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a write fails.
    pub async fn record_failure(&self, failure: &PaymentFailure) -> Result<(), ServiceError> {
        let Some(order_number) = failure.order_id.as_deref() else {
            warn!("Payment failure notice without orderId");
            return Ok(());
        };
        let Some(order) = self.orders.get_by_number(order_number).await? else {
            warn!(order_number, "Payment failure notice for unknown order");
            return Ok(());
        };

        let message = failure
            .message
            .clone()
            .unwrap_or_else(|| "Payment failed".to_owned());

        if let Some(payment_key) = failure.payment_key.as_deref() {
            let existing = self.payments.get_by_key(payment_key).await?;
            if let Err(reason) = failure_applies(existing.as_ref(), &order) {
                warn!(payment_key, order_number, reason, "Ignoring payment failure notice");
                return Ok(());
            }
            let record = PaymentRecord {
                order_id: Some(order.id),
                payment_key: payment_key.to_owned(),
                order_id_string: order.order_number.clone(),
                amount: existing.as_ref().map_or(order.total_amount, |p| p.amount),
                status: PaymentStatus::Failed,
                method: existing.as_ref().map_or(PaymentMethod::Card, |p| p.method),
                approved_at: None,
                failure_reason: Some(message.clone()),
            };
            if self.payments.mark_failed(&record).await?.is_none() {
                warn!(payment_key, order_number, "Payment changed before failure notice was applied");
                return Ok(());
            }
        }

        if order.status == OrderStatus::Pending {
            self.orders.cancel(order.id).await?;
        }

        warn!(order_number, %message, "Payment failed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the payment does not exist.
    pub async fn get(&self, id: PaymentId) -> Result<Payment, ServiceError> {
        self.payments
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Payment"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no payment has this key.
    pub async fn get_by_key(&self, payment_key: &str) -> Result<Payment, ServiceError> {
        self.payments
            .get_by_key(payment_key)
            .await?
            .ok_or(ServiceError::NotFound("Payment"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.payments.list_by_user(user_id).await?)
    }

    /// The user who owns the order a payment belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn owner(&self, payment: &Payment) -> Result<Option<UserId>, ServiceError> {
        let Some(order_id) = payment.order_id else {
            return Ok(None);
        };
        Ok(self.orders.get_by_id(order_id).await?.map(|o| o.user_id))
    }
}

/// A stored payment key may only be confirmed again for the order it was recorded for.
fn ensure_same_order(existing: &Payment, order: &Order) -> Result<(), ServiceError> {
    if existing.order_id == Some(order.id) {
        Ok(())
    } else {
        Err(ServiceError::conflict("Payment key belongs to another order"))
    }
}

/// Whether a failure notice for `order` may overwrite the stored payment.
fn failure_applies(existing: Option<&Payment>, order: &Order) -> Result<(), &'static str> {
    match existing {
        None => Ok(()),
        Some(payment) if payment.order_id != Some(order.id) => {
            Err("payment key belongs to another order")
        }
        Some(payment) if payment.status != PaymentStatus::Pending => {
            Err("payment is no longer pending")
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use shoplite_core::{OrderId, UserId};

    use super::*;
    use crate::models::payment::TOSS_PROVIDER;

    fn order(id: i32) -> Order {
        Order {
            id: OrderId::new(id),
            order_number: format!("ORD-{id}"),
            user_id: UserId::new(1),
            status: OrderStatus::Pending,
            total_amount: Decimal::new(15_000, 0),
            shipping_name: None,
            shipping_phone: None,
            shipping_address: None,
            notes: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment(order_id: i32, status: PaymentStatus) -> Payment {
        Payment {
            id: PaymentId::new(1),
            order_id: Some(OrderId::new(order_id)),
            payment_key: "tgen_key".to_owned(),
            order_id_string: format!("ORD-{order_id}"),
            amount: Decimal::new(15_000, 0),
            status,
            method: PaymentMethod::Card,
            payment_provider: TOSS_PROVIDER.to_owned(),
            approved_at: None,
            canceled_at: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_replayed_key_must_match_order() {
        let approved = payment(1, PaymentStatus::Approved);
        assert!(ensure_same_order(&approved, &order(1)).is_ok());
        assert!(matches!(
            ensure_same_order(&approved, &order(2)),
            Err(ServiceError::Conflict(_))
        ));

        let orphaned = Payment {
            order_id: None,
            ..payment(1, PaymentStatus::Pending)
        };
        assert!(ensure_same_order(&orphaned, &order(1)).is_err());
    }

    #[test]
    fn test_failure_only_applies_to_pending_payments_of_the_order() {
        assert!(failure_applies(None, &order(1)).is_ok());
        assert!(failure_applies(Some(&payment(1, PaymentStatus::Pending)), &order(1)).is_ok());

        for status in [
            PaymentStatus::Approved,
            PaymentStatus::Canceled,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(
                failure_applies(Some(&payment(1, status)), &order(1)),
                Err("payment is no longer pending")
            );
        }

        assert_eq!(
            failure_applies(Some(&payment(2, PaymentStatus::Pending)), &order(1)),
            Err("payment key belongs to another order")
        );
    }
}
