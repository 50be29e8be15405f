//! Order repository.
//!
//! Every status change that moves stock runs in one transaction with the
//! order row locked (`SELECT ... FOR UPDATE`), so stock and status never disagree.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shoplite_core::{OrderId, OrderStatus, ProductId, StatusChange, UserId};

use super::products::{decrement_stock, restore_stock};
use super::{RepositoryError, payments};
use crate::models::order::{NewOrder, Order, OrderItem, OrderStats};
use crate::models::payment::PaymentRecord;

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, total_amount, shipping_name, \
     shipping_phone, shipping_address, notes, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price, total_price";

/// SQL list of the statuses that prove a purchase, e.g. `'CONFIRMED', 'SHIPPED'`.
fn purchase_statuses_sql() -> String {
    OrderStatus::ALL
        .iter()
        .filter(|s| s.counts_as_purchase())
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order with its items.
    ///
    /// When the order's status holds stock, each line's stock is taken in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InsufficientStock` if any line cannot be covered.
    /// Returns `RepositoryError::Conflict` if the order number collides.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if order.status.holds_stock() {
            for item in &order.items {
                decrement_stock(&mut tx, item.product_id, item.quantity).await?;
            }
        }

        let mut created = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO shop.orders
                (order_number, user_id, status, total_amount, shipping_name, shipping_phone, shipping_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(&order.shipping.name)
        .bind(&order.shipping.phone)
        .bind(&order.shipping.address)
        .bind(&order.shipping.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::conflict_on_unique("order number"))?;

        for item in &order.items {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                r"
                INSERT INTO shop.order_items (order_id, product_id, product_name, quantity, price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {ORDER_ITEM_COLUMNS}
                "
            ))
            .bind(created.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.total_price)
            .fetch_one(&mut *tx)
            .await?;
            created.items.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items_opt(order).await
    }

    /// Look up an order by its external order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        self.with_items_opt(order).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// All orders, optionally narrowed to one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE ($1::shop.order_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        self.with_items(orders).await
    }

    /// Move a `PENDING` order to `CONFIRMED`, taking stock for every line.
    ///
    /// With `payment`, the payment row is written in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the order is not pending.
    /// Returns `RepositoryError::InsufficientStock` if any line cannot be covered.
    pub async fn confirm(
        &self,
        id: OrderId,
        payment: Option<&PaymentRecord>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status = lock_status(&mut tx, id).await?;
        if status != OrderStatus::Pending {
            return Err(RepositoryError::Conflict(format!(
                "order is {status}, only PENDING orders can be confirmed"
            )));
        }
        apply(&mut tx, id, status, StatusChange::Confirm, OrderStatus::Confirmed).await?;

        if let Some(record) = payment {
            payments::upsert(&mut tx, record).await?;
        }

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Cancel an order, returning stock if the order held any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the order is delivered or already cancelled.
    pub async fn cancel(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status = lock_status(&mut tx, id).await?;
        if !status.is_cancellable() {
            return Err(RepositoryError::Conflict(format!(
                "order is {status} and cannot be cancelled"
            )));
        }
        apply(&mut tx, id, status, StatusChange::Cancel, OrderStatus::Cancelled).await?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Move an order to `next`, checking the transition against the locked
    /// current status and moving stock when the change requires it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    /// Returns `RepositoryError::InsufficientStock` if confirming cannot be covered.
    pub async fn change_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = lock_status(&mut tx, id).await?;
        let change = current
            .change_to(next)
            .map_err(|message| RepositoryError::Conflict(message.to_owned()))?;
        apply(&mut tx, id, current, change, next).await?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Whether the user has a stock-holding order that contains the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_purchased(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let purchased: bool = sqlx::query_scalar(&format!(
            r"
            SELECT EXISTS(
                SELECT 1 FROM shop.orders o
                JOIN shop.order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND oi.product_id = $2
                  AND o.status IN ({})
            )
            ",
            purchase_statuses_sql()
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(purchased)
    }

    /// Revenue from delivered orders plus order counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, since: DateTime<Utc>) -> Result<OrderStats, RepositoryError> {
        let (total_revenue, order_count, orders_since): (Decimal, i64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_amount) FILTER (WHERE status = 'DELIVERED'), 0),
                   COUNT(*),
                   COUNT(*) FILTER (WHERE created_at > $1)
            FROM shop.orders
            ",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(OrderStats {
            total_revenue,
            order_count,
            orders_since,
        })
    }

    async fn with_items_opt(&self, order: Option<Order>) -> Result<Option<Order>, RepositoryError> {
        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn with_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, RepositoryError> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

async fn lock_status(conn: &mut PgConnection, id: OrderId) -> Result<OrderStatus, RepositoryError> {
    sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

async fn apply(
    conn: &mut PgConnection,
    id: OrderId,
    current: OrderStatus,
    change: StatusChange,
    next: OrderStatus,
) -> Result<(), RepositoryError> {
    match change {
        StatusChange::Confirm => {
            for (product_id, quantity) in line_quantities(conn, id).await? {
                decrement_stock(conn, product_id, quantity).await?;
            }
        }
        StatusChange::Cancel if current.holds_stock() => {
            for (product_id, quantity) in line_quantities(conn, id).await? {
                restore_stock(conn, product_id, quantity).await?;
            }
        }
        StatusChange::Cancel | StatusChange::Set => {}
    }
    set_status(conn, id, next).await
}

async fn line_quantities(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Vec<(ProductId, i32)>, RepositoryError> {
    let lines: Vec<(ProductId, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM shop.order_items WHERE order_id = $1 AND product_id IS NOT NULL ORDER BY product_id",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE shop.orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_statuses() {
        assert_eq!(
            purchase_statuses_sql(),
            "'CONFIRMED', 'SHIPPED', 'DELIVERED'"
        );
    }
}
