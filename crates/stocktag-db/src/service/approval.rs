//! # Approval Workflow
//!
//! Manual order confirmation and cancellation, plus the duplicate-code
//! check that guards the manual path, and bulk validation for stock taken
//! in under the requires-scan policy.
//!
//! ## Approval Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  approve(order_id, actor)                                           │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    order must exist and be pending                                  │
//! │    for each reserved unit:                                          │
//! │        does its code appear on ANY other unit or product?           │
//! │       │                                                             │
//! │       ├── duplicate found                                           │
//! │       │     cancel order, release units back to stock               │
//! │       │     COMMIT, then surface DuplicateCodeDetected              │
//! │       │     (the cancellation is real even though approve fails)    │
//! │       ▼                                                             │
//! │    units → sold + validated, order → confirmed                      │
//! │    recompute product stock                                          │
//! │  COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Released units return with `validated = 1`: they were eligible before
//! the reservation claimed them, and cancellation restores that
//! eligibility so they immediately count as stock again.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::DbError;
use crate::repository::product;
use stocktag_core::{CoreError, CoreResult, Order, OrderStatus, Unit};

/// Service for manual order approval, cancellation and bulk validation.
#[derive(Debug, Clone)]
pub struct ApprovalService {
    pool: SqlitePool,
}

impl ApprovalService {
    /// Creates a new ApprovalService.
    pub fn new(pool: SqlitePool) -> Self {
        ApprovalService { pool }
    }

    /// Manually confirms a pending order without scans.
    ///
    /// Every reserved unit is first checked for code duplication against
    /// all other units and all products. A duplicate is an integrity
    /// breach: the order is cancelled, its units released, that outcome
    /// committed, and [`CoreError::DuplicateCodeDetected`] returned. On the
    /// clean path the units become sold and validated and the order
    /// confirms.
    pub async fn approve(&self, order_id: &str, actor: Option<&str>) -> CoreResult<Order> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = self.load_pending(&mut tx, order_id).await?;

        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT id, product_id, code, status, validated, validated_at, validated_by,
                   order_id, created_at
            FROM units
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::from)?;

        for unit in &units {
            let clashes: i64 = sqlx::query_scalar(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM units WHERE code = ?1 AND id <> ?2)
                  + (SELECT COUNT(*) FROM products WHERE code = ?1)
                "#,
            )
            .bind(&unit.code)
            .bind(&unit.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if clashes > 0 {
                warn!(
                    order_id = %order_id,
                    unit_id = %unit.id,
                    code = %unit.code,
                    "Duplicate code found during approval, cancelling order"
                );

                self.cancel_in_tx(&mut tx, &order.id, &order.product_id)
                    .await?;
                tx.commit().await.map_err(DbError::from)?;

                return Err(CoreError::DuplicateCodeDetected {
                    code: unit.code.clone(),
                });
            }
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE units SET
                status = 'sold',
                validated = 1,
                validated_at = ?1,
                validated_by = ?2
            WHERE order_id = ?3 AND status = 'reserved'
            "#,
        )
        .bind(now)
        .bind(actor)
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query("UPDATE orders SET status = 'confirmed', updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        product::recompute_stock(&mut tx, &order.product_id).await?;

        let confirmed = self.load_order(&mut tx, order_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, "Order approved");
        Ok(confirmed)
    }

    /// Cancels a pending order, releasing its units back into stock.
    ///
    /// Released units become available again with no order binding and
    /// regain their pre-reservation validated eligibility. Returns the
    /// number of units released.
    pub async fn cancel(&self, order_id: &str) -> CoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = self.load_pending(&mut tx, order_id).await?;
        let released = self
            .cancel_in_tx(&mut tx, &order.id, &order.product_id)
            .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, released, "Order cancelled");
        Ok(released)
    }

    /// Validates every unvalidated available unit of a product in one pass.
    ///
    /// The bulk counterpart of scanning each unit individually, for stock
    /// taken in under the requires-scan policy. Reserved units are left
    /// alone (their order still needs real scans). Returns how many units
    /// were newly validated.
    pub async fn bulk_validate(&self, product_id: &str, actor: Option<&str>) -> CoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE units SET
                validated = 1,
                validated_at = ?1,
                validated_by = ?2
            WHERE product_id = ?3 AND status = 'available' AND validated = 0
            "#,
        )
        .bind(Utc::now())
        .bind(actor)
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        product::recompute_stock(&mut tx, product_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        let validated = result.rows_affected();
        info!(product_id = %product_id, validated, "Bulk validation complete");
        Ok(validated)
    }

    /// Loads an order, requiring it to exist and be pending.
    async fn load_pending(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, product_id, quantity, status, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

        let order = match order {
            Some(order) => order,
            None => return Err(CoreError::OrderNotFound(order_id.to_string())),
        };

        if order.status != OrderStatus::Pending {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                current_status: order.status.to_string(),
            });
        }

        Ok(order)
    }

    async fn load_order(&self, conn: &mut SqliteConnection, order_id: &str) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, product_id, quantity, status, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::from)?;

        Ok(order)
    }

    /// Cancels an order and releases its units on the caller's transaction.
    async fn cancel_in_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
        product_id: &str,
    ) -> CoreResult<u64> {
        let released = sqlx::query(
            r#"
            UPDATE units SET
                status = 'available',
                order_id = NULL,
                validated = 1,
                validated_at = NULL,
                validated_by = NULL
            WHERE order_id = ?1 AND status = 'reserved'
            "#,
        )
        .bind(order_id)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?
        .rows_affected();

        sqlx::query("UPDATE orders SET status = 'cancelled', updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(order_id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        product::recompute_stock(&mut *conn, product_id).await?;
        Ok(released)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::service::testutil;
    use stocktag_core::{CoreError, CreationPolicy, OrderStatus, UnitStatus};

    #[tokio::test]
    async fn test_approve_confirms_order_and_sells_units() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 3).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 2)
            .await
            .unwrap();

        let order = db
            .approvals()
            .approve(&reservation.order.id, Some("manager"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);

        for unit in db.units().list_for_order(&order.id).await.unwrap() {
            assert_eq!(unit.status, UnitStatus::Sold);
            assert!(unit.validated);
            assert_eq!(unit.validated_by.as_deref(), Some("manager"));
        }

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 1);
    }

    #[tokio::test]
    async fn test_approve_requires_pending_order() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 1).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 1)
            .await
            .unwrap();
        db.approvals()
            .approve(&reservation.order.id, None)
            .await
            .unwrap();

        let err = db
            .approvals()
            .approve(&reservation.order.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrderStatus { .. }));

        let err = db.approvals().approve("no-such-order", None).await.unwrap_err();
        assert!(matches!(err, CoreError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_approve_duplicate_code_cancels_and_releases() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 2).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 2)
            .await
            .unwrap();
        let tainted_code = reservation.units[0].code.clone();

        // Corrupt the ledger behind the registry's back: a second product
        // now carries a reserved unit's code.
        let other = db
            .stock_in()
            .create_product("hoodie", "L", "red")
            .await
            .unwrap();
        sqlx::query("UPDATE products SET code = ?1 WHERE id = ?2")
            .bind(&tainted_code)
            .bind(&other.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db
            .approvals()
            .approve(&reservation.order.id, None)
            .await
            .unwrap_err();
        match err {
            CoreError::DuplicateCodeDetected { code } => assert_eq!(code, tainted_code),
            other => panic!("expected DuplicateCodeDetected, got {other:?}"),
        }

        // The order was cancelled and both units returned to stock.
        let order = db
            .orders()
            .get_by_id(&reservation.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 2);

        for unit in db.units().list_for_product(&product.id).await.unwrap() {
            assert_eq!(unit.status, UnitStatus::Available);
            assert!(unit.order_id.is_none());
            assert!(unit.validated);
        }
    }

    #[tokio::test]
    async fn test_cancel_releases_units_into_stock() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 3).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 2)
            .await
            .unwrap();
        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 1);

        let released = db.approvals().cancel(&reservation.order.id).await.unwrap();
        assert_eq!(released, 2);

        // Stock grows back by exactly the released quantity.
        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 3);

        let order = db
            .orders()
            .get_by_id(&reservation.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        // Released units are immediately reservable again.
        db.reservations()
            .reserve("cust-2", &product.id, 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_requires_pending_order() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 1).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 1)
            .await
            .unwrap();
        db.approvals().cancel(&reservation.order.id).await.unwrap();

        let err = db
            .approvals()
            .cancel(&reservation.order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrderStatus { .. }));
    }

    #[tokio::test]
    async fn test_bulk_validate_makes_units_eligible() {
        let db = testutil::test_db().await;
        let product = db
            .stock_in()
            .create_product("tshirt", "M", "black")
            .await
            .unwrap();
        db.stock_in()
            .stock_in(&product.id, 4, CreationPolicy::RequiresScan, None)
            .await
            .unwrap();

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 0);

        let validated = db
            .approvals()
            .bulk_validate(&product.id, Some("admin"))
            .await
            .unwrap();
        assert_eq!(validated, 4);

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 4);

        // A second run finds nothing left to validate.
        let validated = db
            .approvals()
            .bulk_validate(&product.id, Some("admin"))
            .await
            .unwrap();
        assert_eq!(validated, 0);
    }

    #[tokio::test]
    async fn test_bulk_validate_skips_reserved_units() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 2).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 1)
            .await
            .unwrap();

        // Only available units are touched; the reserved unit still needs
        // a real scan and its order stays pending.
        let validated = db
            .approvals()
            .bulk_validate(&product.id, Some("admin"))
            .await
            .unwrap();
        assert_eq!(validated, 0);

        let reserved = db
            .units()
            .list_for_order(&reservation.order.id)
            .await
            .unwrap();
        assert!(!reserved[0].validated);

        let order = db
            .orders()
            .get_by_id(&reservation.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_bulk_validate_unknown_product() {
        let db = testutil::test_db().await;

        let err = db
            .approvals()
            .bulk_validate("no-such-id", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(_)));
    }
}
