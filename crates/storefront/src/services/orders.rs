//! Order placement and lifecycle.
//!
//! Two ways to place an order:
//! - direct: priced, stock taken, and `CONFIRMED` in one transaction
//! - for payment: priced and `PENDING`; stock is only checked until the
//!   payment is confirmed

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use shoplite_core::{OrderId, OrderNumber, OrderStatus, Price, ProductId, UserId};

use super::ServiceError;
use super::catalog_cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::models::order::{
    CreateOrderRequest, NewOrder, NewOrderItem, Order, OrderItemRequest, OrderStats,
};
use crate::models::product::Product;

pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// Place a `CONFIRMED` order, taking stock immediately.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for empty or invalid lines.
    /// Returns `ServiceError::InsufficientStock` / `RepositoryError::InsufficientStock`
    /// if stock cannot cover a line.
    pub async fn place(&self, request: &CreateOrderRequest) -> Result<Order, ServiceError> {
        self.create(request, OrderStatus::Confirmed).await
    }

    /// Place a `PENDING` order that waits for payment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::place`].
    pub async fn place_for_payment(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Order, ServiceError> {
        self.create(request, OrderStatus::Pending).await
    }

    async fn create(
        &self,
        request: &CreateOrderRequest,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let lines = merge_lines(&request.order_items)?;
        let ids: Vec<ProductId> = lines.iter().map(|(id, _)| *id).collect();
        let products = self.products.get_many(&ids).await?;
        let (items, total_amount) = price_lines(&lines, &products)?;

        let order = NewOrder {
            order_number: OrderNumber::generate().into_inner(),
            user_id: request.user_id,
            status,
            total_amount,
            shipping: request.shipping_info.clone(),
            items,
        };

        let order = self.orders.create(&order).await?;
        if order.status.holds_stock() {
            self.cache.invalidate_order_products(&order).await;
        }
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            total = %order.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Order"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no order has this number.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order, ServiceError> {
        self.orders
            .get_by_number(order_number)
            .await?
            .ok_or(ServiceError::NotFound("Order"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.list_by_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.list(status).await?)
    }

    /// Confirm a pending order, taking stock.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` unless the order is `PENDING`.
    pub async fn confirm(&self, id: OrderId) -> Result<Order, ServiceError> {
        let order = self.orders.confirm(id, None).await.map_err(not_found_as_order)?;
        self.cache.invalidate_order_products(&order).await;
        info!(order_id = %id, "Order confirmed");
        Ok(order)
    }

    /// Cancel an order, restoring stock it held.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` for delivered or already cancelled orders.
    pub async fn cancel(&self, id: OrderId) -> Result<Order, ServiceError> {
        let order = self.orders.cancel(id).await.map_err(not_found_as_order)?;
        self.cache.invalidate_order_products(&order).await;
        info!(order_id = %id, "Order cancelled");
        Ok(order)
    }

    /// Administrative status change.
    ///
    /// The transition is checked against the current status under the order's
    /// row lock, and stock follows the status (`PENDING` → `CONFIRMED` takes
    /// it, cancelling returns it).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` for transitions that would leave stock inconsistent.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let order = self
            .orders
            .change_status(id, status)
            .await
            .map_err(not_found_as_order)?;
        self.cache.invalidate_order_products(&order).await;
        info!(order_id = %id, to = %status, "Order status changed");
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn stats(&self, since: DateTime<Utc>) -> Result<OrderStats, ServiceError> {
        Ok(self.orders.stats(since).await?)
    }
}

/// Combine repeated products into one line each, keeping first-seen order.
fn merge_lines(requested: &[OrderItemRequest]) -> Result<Vec<(ProductId, i32)>, ServiceError> {
    if requested.is_empty() {
        return Err(ServiceError::validation("Order must contain at least one item"));
    }

    let mut lines: Vec<(ProductId, i32)> = Vec::with_capacity(requested.len());
    for item in requested {
        if item.quantity < 1 {
            return Err(ServiceError::validation("Quantity must be at least 1"));
        }
        match lines.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| ServiceError::validation("Quantity is too large"))?;
            }
            None => lines.push((item.product_id, item.quantity)),
        }
    }
    Ok(lines)
}

/// Price each line at the product's current price and check stock.
fn price_lines(
    lines: &[(ProductId, i32)],
    products: &[Product],
) -> Result<(Vec<NewOrderItem>, Decimal), ServiceError> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut items = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for &(product_id, quantity) in lines {
        let product = by_id
            .get(&product_id)
            .ok_or_else(|| ServiceError::validation(format!("Product not found: {product_id}")))?;
        if !product.is_active {
            return Err(ServiceError::validation(format!(
                "Product is not available: {}",
                product.name
            )));
        }
        if product.stock_quantity < quantity {
            return Err(ServiceError::InsufficientStock {
                available: product.stock_quantity,
            });
        }

        let price = Price::new(product.price)
            .map_err(|e| ServiceError::Repository(RepositoryError::DataCorruption(e.to_string())))?;
        let line_total = price.line_total(quantity);
        total += line_total;
        items.push(NewOrderItem {
            product_id,
            product_name: product.name.clone(),
            quantity,
            price: price.amount(),
            total_price: line_total,
        });
    }
    Ok((items, total))
}

fn not_found_as_order(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::NotFound("Order"),
        RepositoryError::Conflict(message) => ServiceError::Conflict(message),
        other => ServiceError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("product {id}"),
            description: None,
            price: Decimal::new(price, 0),
            image_url: None,
            stock_quantity: stock,
            category_id: None,
            category_name: None,
            is_active: true,
            average_rating: 0.0,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let lines = merge_lines(&[line(1, 2), line(2, 1)]).unwrap();
        let (items, total) =
            price_lines(&lines, &[product(1, 150_000, 10), product(2, 80_000, 10)]).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(
            items.first().map(|i| i.total_price),
            Some(Decimal::new(300_000, 0))
        );
        assert_eq!(total, Decimal::new(380_000, 0));
        assert_eq!(
            total,
            items.iter().map(|i| i.total_price).sum::<Decimal>()
        );
    }

    #[test]
    fn test_duplicate_products_are_merged() {
        let lines = merge_lines(&[line(1, 2), line(2, 1), line(1, 3)]).unwrap();
        assert_eq!(lines, vec![(ProductId::new(1), 5), (ProductId::new(2), 1)]);
    }

    #[test]
    fn test_rejects_empty_and_zero_quantity() {
        assert!(matches!(merge_lines(&[]), Err(ServiceError::Validation(_))));
        assert!(matches!(
            merge_lines(&[line(1, 0)]),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_missing_inactive_and_short_stock() {
        let lines = merge_lines(&[line(9, 1)]).unwrap();
        assert!(matches!(
            price_lines(&lines, &[product(1, 1000, 5)]),
            Err(ServiceError::Validation(_))
        ));

        let mut inactive = product(1, 1000, 5);
        inactive.is_active = false;
        let lines = merge_lines(&[line(1, 1)]).unwrap();
        assert!(price_lines(&lines, &[inactive]).is_err());

        let lines = merge_lines(&[line(1, 6)]).unwrap();
        assert!(matches!(
            price_lines(&lines, &[product(1, 1000, 5)]),
            Err(ServiceError::InsufficientStock { available: 5 })
        ));
    }
}
