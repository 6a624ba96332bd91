//! # Service Module
//!
//! The transactional engine of Stocktag. Each service owns the multi-step
//! read-then-write sequences the repositories deliberately do not cover.
//!
//! ## Transaction Boundaries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │               One Operation = One Transaction                       │
//! │                                                                     │
//! │  StockInService::stock_in      ┐                                    │
//! │  ReservationService::reserve   │  Each runs as a single sqlx        │
//! │  ScanService::scan             ├─ transaction: partial writes are   │
//! │  ApprovalService::approve      │  never visible, errors roll back   │
//! │  ApprovalService::cancel       │  entirely.                         │
//! │  ApprovalService::bulk_validate┘                                    │
//! │                                                                     │
//! │  SQLite's single-writer model serializes these transactions, so     │
//! │  concurrent reservations cannot select overlapping unit sets and    │
//! │  two near-simultaneous scans cannot both observe "not yet           │
//! │  complete" and double-confirm an order.                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Services
//!
//! - [`stock_in::StockInService`] - Product creation and unit stock-in
//! - [`reservation::ReservationService`] - Atomic multi-unit reservation
//! - [`scan::ScanService`] - Scan validation with auto-confirm
//! - [`approval::ApprovalService`] - Manual confirm/cancel, duplicate
//!   detection, bulk validation

pub mod approval;
pub mod reservation;
pub mod scan;
pub mod stock_in;

// =============================================================================
// Test Scaffolding
// =============================================================================

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Duration, Utc};

    use crate::pool::{Database, DbConfig};
    use stocktag_core::{CreationPolicy, Product, Unit};

    /// Fresh in-memory database with migrations applied.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Creates a product with `count` validated units whose creation
    /// timestamps strictly increase in insertion order, so "oldest first"
    /// selection is deterministic in tests.
    pub async fn seeded_product(db: &Database, count: i64) -> Product {
        let product = db
            .stock_in()
            .create_product("tshirt", "M", "black")
            .await
            .unwrap();

        db.stock_in()
            .stock_in(
                &product.id,
                count,
                CreationPolicy::ValidatedAtCreation,
                Some("admin"),
            )
            .await
            .unwrap();

        spread_created_at(db, &product.id).await;

        db.products().get_by_id(&product.id).await.unwrap().unwrap()
    }

    /// Rewrites unit creation timestamps to `base + n seconds` in insertion
    /// order (rowid order), making age-based selection deterministic.
    pub async fn spread_created_at(db: &Database, product_id: &str) {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM units WHERE product_id = ?1 ORDER BY rowid")
                .bind(product_id)
                .fetch_all(db.pool())
                .await
                .unwrap();

        let base = Utc::now() - Duration::seconds(ids.len() as i64);
        for (i, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE units SET created_at = ?1 WHERE id = ?2")
                .bind(base + Duration::seconds(i as i64))
                .bind(id)
                .execute(db.pool())
                .await
                .unwrap();
        }
    }

    /// The product's units, oldest first.
    pub async fn units_oldest_first(db: &Database, product_id: &str) -> Vec<Unit> {
        let mut units = db.units().list_for_product(product_id).await.unwrap();
        units.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        units
    }
}
