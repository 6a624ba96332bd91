//! # Reservation Coordinator
//!
//! Atomic multi-unit reservation: a customer asks for N units of a product
//! and either gets exactly N specific units bound to a fresh pending order,
//! or gets nothing.
//!
//! ## Reservation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  reserve(customer_id, product_id, quantity)                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    select eligible unit ids                                         │
//! │      (status=available AND validated, oldest first, LIMIT qty)      │
//! │       │                                                             │
//! │       ├── fewer than qty → InsufficientStock, ROLLBACK              │
//! │       ▼                                                             │
//! │    INSERT order (pending)                                           │
//! │    for each selected unit:                                          │
//! │        status=reserved, order_id=order, validated=0                 │
//! │    recompute product stock                                          │
//! │  COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `validated` flag is cleared on reservation so each order requires a
//! fresh physical scan of its units before it can auto-confirm. SQLite's
//! single-writer transactions serialize concurrent reservations, so two
//! customers can never claim overlapping unit sets.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::product;
use stocktag_core::{validation, CoreError, CoreResult, Order, OrderStatus, Unit, ValidationError};

/// A completed reservation: the pending order plus the exact units bound
/// to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub order: Order,
    pub units: Vec<Unit>,
}

/// Service coordinating atomic unit reservations.
#[derive(Debug, Clone)]
pub struct ReservationService {
    pool: SqlitePool,
}

impl ReservationService {
    /// Creates a new ReservationService.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationService { pool }
    }

    /// Reserves `quantity` units of a product for a customer.
    ///
    /// Selects the oldest eligible units first (creation time, then id as
    /// tie-break). On success every selected unit is reserved under a new
    /// pending order and its `validated` flag is cleared. If fewer than
    /// `quantity` units are eligible the whole operation fails with
    /// [`CoreError::InsufficientStock`] and no order is created.
    pub async fn reserve(
        &self,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> CoreResult<Reservation> {
        if customer_id.trim().is_empty() {
            return Err(CoreError::Validation(ValidationError::Required {
                field: "customer_id".to_string(),
            }));
        }
        validation::validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }

        let unit_ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM units
            WHERE product_id = ?1 AND status = 'available' AND validated = 1
            ORDER BY created_at ASC, id ASC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if (unit_ids.len() as i64) < quantity {
            return Err(CoreError::InsufficientStock {
                available: unit_ids.len() as i64,
                requested: quantity,
            });
        }

        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, product_id, quantity, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)
            "#,
        )
        .bind(&order_id)
        .bind(customer_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        for unit_id in &unit_ids {
            let result = sqlx::query(
                r#"
                UPDATE units SET
                    status = 'reserved',
                    order_id = ?1,
                    validated = 0,
                    validated_at = NULL,
                    validated_by = NULL
                WHERE id = ?2 AND status = 'available'
                "#,
            )
            .bind(&order_id)
            .bind(unit_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if result.rows_affected() != 1 {
                return Err(CoreError::Storage(format!(
                    "unit {} no longer available",
                    unit_id
                )));
            }
        }

        product::recompute_stock(&mut tx, product_id).await?;

        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT id, product_id, code, status, validated, validated_at, validated_by,
                   order_id, created_at
            FROM units
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(&order_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            customer_id = %customer_id,
            product_id = %product_id,
            quantity,
            "Reservation created"
        );

        Ok(Reservation {
            order: Order {
                id: order_id,
                customer_id: customer_id.to_string(),
                product_id: product_id.to_string(),
                quantity,
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            units,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
