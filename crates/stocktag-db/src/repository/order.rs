//! # Order Repository
//!
//! Database operations for customer orders.
//!
//! Order status transitions happen in service transactions (reservation
//! creates, scan auto-confirms, approval confirms or cancels); this
//! repository covers reads plus the progress counts the validator and
//! hosts poll.

use sqlx::SqlitePool;

use crate::error::DbResult;
use stocktag_core::{Order, OrderStatus};

const ORDER_COLUMNS: &str = "id, customer_id, product_id, quantity, status, created_at, updated_at";

/// Validation progress of one order's reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderProgress {
    /// Units reserved or sold under the order.
    pub total: i64,
    /// Of those, how many are validated.
    pub validated: i64,
}

impl OrderProgress {
    /// Whether every reserved unit has been validated.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.validated == self.total
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists orders in a given status, oldest first (approval queue order).
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Returns reserved-vs-validated counts for an order.
    ///
    /// Hosts poll this to show scan progress; the auto-confirm decision
    /// itself uses the same counts inside the scan transaction.
    pub async fn progress(&self, order_id: &str) -> DbResult<OrderProgress> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN validated = 1 THEN 1 ELSE 0 END), 0)
            FROM units
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderProgress {
            total: row.0,
            validated: row.1,
        })
    }

    /// Counts total orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
