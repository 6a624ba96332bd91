//! # Stock-In Service
//!
//! Product creation and unit stock-in. Every entity created here gets its
//! code from the registry inside the same transaction, so an aborted
//! stock-in leaves no orphan codes behind.
//!
//! ## Stock-In Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  stock_in(product_id, count, policy, actor)                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    verify product exists                                            │
//! │    repeat count times:                                              │
//! │        code = registry.allocate(tx, Unit)                           │
//! │        INSERT unit (validated per policy)                           │
//! │    recompute product stock                                          │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Any failure rolls back every unit and every allocated code.        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::registry::{CodeOwner, CodeRegistry};
use crate::repository::product;
use stocktag_core::{
    validation, CoreError, CoreResult, CreationPolicy, Product, Unit, UnitStatus,
};

/// Service for product creation and unit stock-in.
#[derive(Debug, Clone)]
pub struct StockInService {
    pool: SqlitePool,
}

impl StockInService {
    /// Creates a new StockInService.
    pub fn new(pool: SqlitePool) -> Self {
        StockInService { pool }
    }

    /// Creates a product variant with a registry-allocated code.
    ///
    /// The natural key `(category, size, color)` must be unique; a clash
    /// surfaces as [`ValidationError::Duplicate`].
    ///
    /// [`ValidationError::Duplicate`]: stocktag_core::ValidationError::Duplicate
    pub async fn create_product(
        &self,
        category: &str,
        size: &str,
        color: &str,
    ) -> CoreResult<Product> {
        validation::validate_product_field("category", category)?;
        validation::validate_product_field("size", size)?;
        validation::validate_product_field("color", color)?;

        let registry = CodeRegistry::new(self.pool.clone());
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let code = registry.allocate(&mut tx, CodeOwner::Product).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let insert = sqlx::query(
            r#"
            INSERT INTO products (id, category, size, color, code, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(category)
        .bind(size)
        .bind(color)
        .bind(&code)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            let db_err = DbError::from(e);
            if db_err.is_unique_violation() {
                return Err(CoreError::Validation(
                    stocktag_core::ValidationError::Duplicate {
                        field: "product".to_string(),
                        value: format!("{}/{}/{}", category, size, color),
                    },
                ));
            }
            return Err(db_err.into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %id, category, size, color, "Product created");

        Ok(Product {
            id,
            category: category.to_string(),
            size: size.to_string(),
            color: color.to_string(),
            code,
            stock: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates `count` units for a product in one transaction.
    ///
    /// Each unit receives a fresh registry code. The `validated` flag is
    /// set per `policy`; with [`CreationPolicy::ValidatedAtCreation`] the
    /// units count as stock immediately, with [`CreationPolicy::RequiresScan`]
    /// they become eligible only after an initial scan or bulk validation.
    pub async fn stock_in(
        &self,
        product_id: &str,
        count: i64,
        policy: CreationPolicy,
        actor: Option<&str>,
    ) -> CoreResult<Vec<Unit>> {
        validation::validate_quantity(count)?;

        let registry = CodeRegistry::new(self.pool.clone());
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }

        let validated = policy == CreationPolicy::ValidatedAtCreation;
        let mut units = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let code = registry.allocate(&mut tx, CodeOwner::Unit).await?;
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let validated_at = validated.then_some(now);
            let validated_by = if validated { actor } else { None };

            sqlx::query(
                r#"
                INSERT INTO units
                    (id, product_id, code, status, validated, validated_at, validated_by,
                     order_id, created_at)
                VALUES (?1, ?2, ?3, 'available', ?4, ?5, ?6, NULL, ?7)
                "#,
            )
            .bind(&id)
            .bind(product_id)
            .bind(&code)
            .bind(validated)
            .bind(validated_at)
            .bind(validated_by)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            units.push(Unit {
                id,
                product_id: product_id.to_string(),
                code,
                status: UnitStatus::Available,
                validated,
                validated_at,
                validated_by: validated_by.map(str::to_string),
                order_id: None,
                created_at: now,
            });
        }

        let stock = product::recompute_stock(&mut tx, product_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product_id,
            count,
            stock,
            policy = ?policy,
            "Stocked in units"
        );

        Ok(units)
    }

    /// Flags an available unit as damaged, removing it from stock.
    ///
    /// Units are never deleted; damaged is a terminal re-flag. Reserved and
    /// sold units cannot be flagged (release or complete the order first).
    pub async fn mark_damaged(&self, unit_id: &str) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row: Option<(String, UnitStatus)> =
            sqlx::query_as("SELECT product_id, status FROM units WHERE id = ?1")
                .bind(unit_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let (product_id, status) = match row {
            Some(r) => r,
            None => return Err(CoreError::UnitNotFound(unit_id.to_string())),
        };

        if status != UnitStatus::Available {
            return Err(CoreError::InvalidUnitStatus {
                unit_id: unit_id.to_string(),
                current_status: status.to_string(),
            });
        }

        sqlx::query("UPDATE units SET status = 'damaged' WHERE id = ?1")
            .bind(unit_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        product::recompute_stock(&mut tx, &product_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        debug!(unit_id = %unit_id, "Unit flagged damaged");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::service::testutil;
    use stocktag_core::{CoreError, CreationPolicy, UnitStatus, ValidationError};

    #[tokio::test]
    async fn test_create_product_allocates_code() {
        let db = testutil::test_db().await;

        let product = db
            .stock_in()
            .create_product("tshirt", "M", "black")
            .await
            .unwrap();

        assert_eq!(product.code.len(), 32);
        assert_eq!(product.stock, 0);

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.code, product.code);
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_key() {
        let db = testutil::test_db().await;
        let svc = db.stock_in();

        svc.create_product("tshirt", "M", "black").await.unwrap();
        let err = svc.create_product("tshirt", "M", "black").await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_product_rejects_empty_field() {
        let db = testutil::test_db().await;

        let err = db
            .stock_in()
            .create_product("tshirt", "", "black")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stock_in_validated_at_creation() {
        let db = testutil::test_db().await;
        let product = db
            .stock_in()
            .create_product("tshirt", "M", "black")
            .await
            .unwrap();

        let units = db
            .stock_in()
            .stock_in(
                &product.id,
                5,
                CreationPolicy::ValidatedAtCreation,
                Some("admin"),
            )
            .await
            .unwrap();

        assert_eq!(units.len(), 5);
        for unit in &units {
            assert_eq!(unit.status, UnitStatus::Available);
            assert!(unit.validated);
            assert_eq!(unit.validated_by.as_deref(), Some("admin"));
        }

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 5);
    }

    #[tokio::test]
    async fn test_stock_in_requires_scan_policy() {
        let db = testutil::test_db().await;
        let product = db
            .stock_in()
            .create_product("tshirt", "L", "white")
            .await
            .unwrap();

        let units = db
            .stock_in()
            .stock_in(&product.id, 3, CreationPolicy::RequiresScan, Some("admin"))
            .await
            .unwrap();

        for unit in &units {
            assert!(!unit.validated);
            assert!(unit.validated_at.is_none());
        }

        // Unvalidated units don't count as stock.
        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 0);
        assert_eq!(db.units().count_eligible(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stock_in_unknown_product() {
        let db = testutil::test_db().await;

        let err = db
            .stock_in()
            .stock_in("no-such-id", 1, CreationPolicy::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_stock_in_codes_distinct_from_product_code() {
        let db = testutil::test_db().await;
        let product = db
            .stock_in()
            .create_product("hoodie", "S", "gray")
            .await
            .unwrap();

        let units = db
            .stock_in()
            .stock_in(&product.id, 10, CreationPolicy::default(), None)
            .await
            .unwrap();

        let mut codes: Vec<&str> = units.iter().map(|u| u.code.as_str()).collect();
        codes.push(&product.code);
        let before = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), before);
    }

    #[tokio::test]
    async fn test_mark_damaged_removes_from_stock() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 3).await;
        let units = testutil::units_oldest_first(&db, &product.id).await;

        db.stock_in().mark_damaged(&units[0].id).await.unwrap();

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 2);

        let counts = db.units().status_counts(&product.id).await.unwrap();
        assert_eq!(counts.damaged, 1);
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn test_mark_damaged_rejects_reserved_unit() {
        let db = testutil::test_db().await;
        let product = testutil::seeded_product(&db, 2).await;

        db.reservations()
            .reserve("cust-1", &product.id, 1)
            .await
            .unwrap();

        let units = testutil::units_oldest_first(&db, &product.id).await;
        let reserved = units
            .iter()
            .find(|u| u.status == UnitStatus::Reserved)
            .unwrap();

        let err = db.stock_in().mark_damaged(&reserved.id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidUnitStatus { .. }));
    }
}
