//! # Unit Repository
//!
//! Database operations for the inventory ledger: the authoritative record
//! of every unit's identity, product association, and lifecycle state.
//!
//! ## Ledger Rules
//! - Units are inserted by stock-in only
//! - Units are never deleted, only re-flagged
//! - Status/validated mutations happen in service transactions; this
//!   repository covers reads and single-row writes

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stocktag_core::{StatusCounts, Unit};

const UNIT_COLUMNS: &str =
    "id, product_id, code, status, validated, validated_at, validated_by, order_id, created_at";

/// Repository for unit database operations.
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    /// Creates a new UnitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    /// Gets a unit by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Unit>> {
        let unit = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    /// Gets a unit by its exact code.
    ///
    /// The scan validator tries each decode variant through this lookup.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Unit>> {
        let unit = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    /// Lists all units of a product, grouped by status, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE product_id = ?1 ORDER BY status, created_at, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    /// Lists the units reserved or sold under an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    /// Counts a product's units per lifecycle state.
    ///
    /// Conservation invariant: the counts sum to the total number of units
    /// ever created for the product.
    pub async fn status_counts(&self, product_id: &str) -> DbResult<StatusCounts> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'available' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'reserved'  THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'sold'      THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'damaged'   THEN 1 ELSE 0 END), 0)
            FROM units
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(product_id = %product_id, "Computed unit status counts");

        Ok(StatusCounts {
            available: row.0,
            reserved: row.1,
            sold: row.2,
            damaged: row.3,
        })
    }

    /// Counts units currently eligible for reservation.
    pub async fn count_eligible(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM units
            WHERE product_id = ?1 AND status = 'available' AND validated = 1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Counts total units (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM units")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
