//! Payment repository.

use sqlx::{PgConnection, PgPool};

use shoplite_core::{PaymentId, PaymentStatus, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::payment::{Payment, PaymentRecord, TOSS_PROVIDER};

const PAYMENT_COLUMNS: &str = "id, order_id, payment_key, order_id_string, amount, status, method, \
     payment_provider, approved_at, canceled_at, failure_reason, created_at";

/// Repository for payment database operations.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM shop.payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_key(&self, payment_key: &str) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM shop.payments WHERE payment_key = $1"
        ))
        .bind(payment_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Most recent payment recorded against an order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r"
            SELECT {PAYMENT_COLUMNS} FROM shop.payments
            WHERE order_id_string = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Payments for a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(
            r"
            SELECT p.id, p.order_id, p.payment_key, p.order_id_string, p.amount, p.status, p.method,
                   p.payment_provider, p.approved_at, p.canceled_at, p.failure_reason, p.created_at
            FROM shop.payments p
            JOIN shop.orders o ON o.id = p.order_id
            WHERE o.user_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(payments)
    }

    /// Insert a new payment row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the payment key is already recorded.
    pub async fn insert(&self, record: &PaymentRecord) -> Result<Payment, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r"
            INSERT INTO shop.payments
                (order_id, payment_key, order_id_string, amount, status, method, payment_provider, approved_at, failure_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(record.order_id)
        .bind(&record.payment_key)
        .bind(&record.order_id_string)
        .bind(record.amount)
        .bind(record.status)
        .bind(record.method)
        .bind(TOSS_PROVIDER)
        .bind(record.approved_at)
        .bind(&record.failure_reason)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("payment key"))?;

        Ok(payment)
    }

    /// Insert or overwrite the payment with the record's key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, record: &PaymentRecord) -> Result<Payment, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, record).await
    }

    /// Record a provider failure for the record's key.
    ///
    /// Only a missing row or a `PENDING` row of the same order is written;
    /// anything else is left alone and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(
        &self,
        record: &PaymentRecord,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r"
            INSERT INTO shop.payments
                (order_id, payment_key, order_id_string, amount, status, method, payment_provider, failure_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payment_key) DO UPDATE
            SET status = EXCLUDED.status,
                failure_reason = EXCLUDED.failure_reason,
                updated_at = NOW()
            WHERE shop.payments.status = $9
              AND shop.payments.order_id IS NOT DISTINCT FROM EXCLUDED.order_id
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(record.order_id)
        .bind(&record.payment_key)
        .bind(&record.order_id_string)
        .bind(record.amount)
        .bind(PaymentStatus::Failed)
        .bind(record.method)
        .bind(TOSS_PROVIDER)
        .bind(&record.failure_reason)
        .bind(PaymentStatus::Pending)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Mark an approved payment cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no payment has this key.
    pub async fn mark_canceled(
        &self,
        payment_key: &str,
        reason: &str,
    ) -> Result<Payment, RepositoryError> {
        sqlx::query_as::<_, Payment>(&format!(
            r"
            UPDATE shop.payments
            SET status = $2, canceled_at = NOW(), failure_reason = $3, updated_at = NOW()
            WHERE payment_key = $1
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(payment_key)
        .bind(PaymentStatus::Canceled)
        .bind(reason)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Insert or overwrite a payment by key on the given connection.
///
/// A key stays bound to the order it was first recorded for.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the key belongs to another order.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert(
    conn: &mut PgConnection,
    record: &PaymentRecord,
) -> Result<Payment, RepositoryError> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        r"
        INSERT INTO shop.payments
            (order_id, payment_key, order_id_string, amount, status, method, payment_provider, approved_at, failure_reason)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (payment_key) DO UPDATE
        SET order_id = EXCLUDED.order_id,
            order_id_string = EXCLUDED.order_id_string,
            amount = EXCLUDED.amount,
            status = EXCLUDED.status,
            method = EXCLUDED.method,
            approved_at = EXCLUDED.approved_at,
            failure_reason = EXCLUDED.failure_reason,
            updated_at = NOW()
        WHERE shop.payments.order_id IS NOT DISTINCT FROM EXCLUDED.order_id
        RETURNING {PAYMENT_COLUMNS}
        "
    ))
    .bind(record.order_id)
    .bind(&record.payment_key)
    .bind(&record.order_id_string)
    .bind(record.amount)
    .bind(record.status)
    .bind(record.method)
    .bind(TOSS_PROVIDER)
    .bind(record.approved_at)
    .bind(&record.failure_reason)
    .fetch_optional(conn)
    .await?;

    payment.ok_or_else(|| RepositoryError::Conflict("Payment key belongs to another order".to_owned()))
}
