//! # Scan Validator
//!
//! Turns raw scanner input into a validated unit, and confirms orders the
//! moment their last reserved unit is scanned.
//!
//! ## Scan Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  scan(raw, actor)                                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  expand raw into decode variants (trim, percent-decode, strip)      │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    look up each variant until one matches a unit                    │
//! │       ├── no match → outcome "not found" (pure read, no writes)     │
//! │       ▼                                                             │
//! │    mark unit validated (refresh timestamp + actor on rescans)       │
//! │    if unit has an order:                                            │
//! │        count validated vs total units under the order               │
//! │        all validated AND order still pending?                       │
//! │            → confirm order, reserved units become sold              │
//! │    recompute product stock                                          │
//! │  COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rescanning a validated unit is idempotent: the audit metadata refreshes
//! but no state transition repeats. The confirm step is a guarded UPDATE
//! (`WHERE status = 'pending'`), so an order transitions to confirmed
//! exactly once even if completion is observed twice.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbError;
use crate::repository::product;
use stocktag_core::{
    code, validation, CoreError, CoreResult, Order, OrderStatus, ScanOutcome, Unit,
};

/// Service validating scanned codes against the unit ledger.
#[derive(Debug, Clone)]
pub struct ScanService {
    pool: SqlitePool,
}

/// What one validation transaction did, before outcome shaping.
struct ScanReport {
    unit: Unit,
    order_status: Option<OrderStatus>,
    progress: Option<(i64, i64)>,
    confirmed_now: bool,
}

impl ScanService {
    /// Creates a new ScanService.
    pub fn new(pool: SqlitePool) -> Self {
        ScanService { pool }
    }

    /// Validates the unit matching `raw` and returns its refreshed state.
    ///
    /// Fails with [`CoreError::UnitNotFound`] when no decode variant
    /// matches a stored code. Side effects are the same as [`scan`](Self::scan).
    pub async fn validate(&self, raw: &str, actor: Option<&str>) -> CoreResult<Unit> {
        let report = self.validate_inner(raw, actor).await?;
        Ok(report.unit)
    }

    /// Scan entry point for capture hosts.
    ///
    /// A code that matches no unit is a normal outcome here, not an error;
    /// the capture app keeps scanning. Every other failure propagates.
    pub async fn scan(&self, raw: &str, actor: Option<&str>) -> CoreResult<ScanOutcome> {
        let report = match self.validate_inner(raw, actor).await {
            Ok(report) => report,
            Err(CoreError::UnitNotFound(code)) => return Ok(ScanOutcome::not_found(&code)),
            Err(e) => return Err(e),
        };

        let message = match (report.confirmed_now, report.order_status, report.progress) {
            (true, _, _) => "All units scanned. Order confirmed.".to_string(),
            (false, Some(OrderStatus::Pending), Some((validated, total))) => {
                format!("Unit validated. {} of {} units scanned.", validated, total)
            }
            (false, Some(status), _) => format!("Unit validated. Order already {}.", status),
            (false, None, _) => "Unit validated.".to_string(),
        };

        Ok(ScanOutcome {
            found: true,
            unit_status: Some(report.unit.status),
            order_status: report.order_status,
            message,
        })
    }

    /// One scan-validation transaction.
    async fn validate_inner(&self, raw: &str, actor: Option<&str>) -> CoreResult<ScanReport> {
        validation::validate_scan_input(raw)?;
        let candidates = code::scan_candidates(raw);

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut matched: Option<Unit> = None;
        for candidate in &candidates {
            let unit = sqlx::query_as::<_, Unit>(
                r#"
                SELECT id, product_id, code, status, validated, validated_at, validated_by,
                       order_id, created_at
                FROM units
                WHERE code = ?1
                "#,
            )
            .bind(candidate)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if let Some(unit) = unit {
                debug!(code = %candidate, unit_id = %unit.id, "Scan matched a unit");
                matched = Some(unit);
                break;
            }
        }

        let unit = match matched {
            Some(unit) => unit,
            None => return Err(CoreError::UnitNotFound(raw.trim().to_string())),
        };

        let now = Utc::now();
        sqlx::query(
            "UPDATE units SET validated = 1, validated_at = ?1, validated_by = ?2 WHERE id = ?3",
        )
        .bind(now)
        .bind(actor)
        .bind(&unit.id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let mut order_status = None;
        let mut progress = None;
        let mut confirmed_now = false;

        if let Some(order_id) = &unit.order_id {
            let order = sqlx::query_as::<_, Order>(
                r#"
                SELECT id, customer_id, product_id, quantity, status, created_at, updated_at
                FROM orders
                WHERE id = ?1
                "#,
            )
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::from)?;

            let (total, validated): (i64, i64) = sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN validated = 1 THEN 1 ELSE 0 END), 0)
                FROM units
                WHERE order_id = ?1
                "#,
            )
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::from)?;

            progress = Some((validated, total));
            order_status = Some(order.status);

            if total > 0 && validated == total && order.status == OrderStatus::Pending {
                // Guarded transition: confirms at most once.
                let result = sqlx::query(
                    "UPDATE orders SET status = 'confirmed', updated_at = ?1 \
                     WHERE id = ?2 AND status = 'pending'",
                )
                .bind(now)
                .bind(order_id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?;

                if result.rows_affected() == 1 {
                    sqlx::query(
                        "UPDATE units SET status = 'sold' \
                         WHERE order_id = ?1 AND status = 'reserved'",
                    )
                    .bind(order_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::from)?;

                    confirmed_now = true;
                    order_status = Some(OrderStatus::Confirmed);
                    info!(order_id = %order_id, "Order auto-confirmed by final scan");
                }
            }
        }

        product::recompute_stock(&mut tx, &unit.product_id).await?;

        let refreshed = sqlx::query_as::<_, Unit>(
            r#"
            SELECT id, product_id, code, status, validated, validated_at, validated_by,
                   order_id, created_at
            FROM units
            WHERE id = ?1
            "#,
        )
        .bind(&unit.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            unit_id = %refreshed.id,
            status = %refreshed.status,
            confirmed_now,
            "Scan validation committed"
        );

        Ok(ScanReport {
            unit: refreshed,
            order_status,
            progress,
            confirmed_now,
        })
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
    async fn test_scan_unknown_code_is_not_an_error() {
        let db = testutil::test_db().await;

        let outcome = db.scanner().scan("deadbeef", Some("gate-1")).await.unwrap();

        assert!(!outcome.found);
        assert!(outcome.unit_status.is_none());

        // The strict variant does error.
        let err = db
            .scanner()
            .validate("deadbeef", Some("gate-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UnitNotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_matches_decode_variants() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 1).await;
        let unit = &testutil::units_oldest_first(&db, &product.id).await[0];

        // Whitespace plus trailing query junk, as capture apps deliver it.
        let raw = format!("  {}?source=cam#frag \n", unit.code);
        let outcome = db.scanner().scan(&raw, None).await.unwrap();
        assert!(outcome.found);

        // Percent-encoded first character.
        let encoded = format!("%{:02x}{}", unit.code.as_bytes()[0], &unit.code[1..]);
        let outcome = db.scanner().scan(&encoded, None).await.unwrap();
        assert!(outcome.found);
    }

    #[tokio::test]
    async fn test_scan_validates_unreserved_unit_into_stock() {
        let db = testutil::test_db().await;
        let product = db
            .stock_in()
            .create_product("tshirt", "M", "black")
            .await
            .unwrap();
        let units = db
            .stock_in()
            .stock_in(&product.id, 1, CreationPolicy::RequiresScan, None)
            .await
            .unwrap();

        let unit = db
            .scanner()
            .validate(&units[0].code, Some("gate-1"))
            .await
            .unwrap();

        assert!(unit.validated);
        assert_eq!(unit.validated_by.as_deref(), Some("gate-1"));
        assert_eq!(unit.status, UnitStatus::Available);

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 1);
    }

    #[tokio::test]
    async fn test_scans_auto_confirm_order() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 3).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 3)
            .await
            .unwrap();
        let order_id = reservation.order.id.clone();

        // First two scans leave the order pending.
        for unit in &reservation.units[..2] {
            let outcome = db.scanner().scan(&unit.code, Some("gate-1")).await.unwrap();
            assert_eq!(outcome.order_status, Some(OrderStatus::Pending));
        }
        let progress = db.orders().progress(&order_id).await.unwrap();
        assert_eq!(progress.validated, 2);
        assert!(!progress.is_complete());

        // The final scan confirms.
        let outcome = db
            .scanner()
            .scan(&reservation.units[2].code, Some("gate-1"))
            .await
            .unwrap();
        assert_eq!(outcome.order_status, Some(OrderStatus::Confirmed));
        assert_eq!(outcome.unit_status, Some(UnitStatus::Sold));

        let order = db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);

        for unit in db.units().list_for_order(&order_id).await.unwrap() {
            assert_eq!(unit.status, UnitStatus::Sold);
        }

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 0);
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 2).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 2)
            .await
            .unwrap();

        let first = db
            .scanner()
            .validate(&reservation.units[0].code, Some("gate-1"))
            .await
            .unwrap();
        let second = db
            .scanner()
            .validate(&reservation.units[0].code, Some("gate-2"))
            .await
            .unwrap();

        // Audit metadata refreshes, state does not advance.
        assert_eq!(second.status, UnitStatus::Reserved);
        assert_eq!(second.validated_by.as_deref(), Some("gate-2"));
        assert!(second.validated_at >= first.validated_at);

        let progress = db
            .orders()
            .progress(&reservation.order.id)
            .await
            .unwrap();
        assert_eq!(progress.validated, 1);

        let order = db
            .orders()
            .get_by_id(&reservation.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_rescan_after_confirm_keeps_terminal_state() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 1).await;

        let reservation = db
            .reservations()
            .reserve("cust-1", &product.id, 1)
            .await
            .unwrap();
        let code = reservation.units[0].code.clone();

        let outcome = db.scanner().scan(&code, None).await.unwrap();
        assert_eq!(outcome.order_status, Some(OrderStatus::Confirmed));

        // A later rescan must not disturb the terminal state.
        let outcome = db.scanner().scan(&code, None).await.unwrap();
        assert!(outcome.found);
        assert_eq!(outcome.unit_status, Some(UnitStatus::Sold));
        assert_eq!(outcome.order_status, Some(OrderStatus::Confirmed));
        assert!(outcome.message.contains("already confirmed"));
    }

    #[tokio::test]
    async fn test_scan_rejects_oversized_input() {
        let db = testutil::test_db().await;

        let err = db.scanner().scan(&"x".repeat(300), None).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
