//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Derived Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Stock Is Never Counted By Hand                 │
//! │                                                                     │
//! │  products.stock is a cache of:                                      │
//! │                                                                     │
//! │    SELECT COUNT(*) FROM units                                       │
//! │    WHERE product_id = ? AND status = 'available' AND validated = 1  │
//! │                                                                     │
//! │  Every transaction that changes a unit's status or validated flag   │
//! │  calls recompute_stock() before committing, so the cached value     │
//! │  can never drift from the ledger.                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stocktag_core::Product;

/// Recomputes the derived stock for one product on the caller's connection.
///
/// Runs inside service transactions so the stock update commits or rolls
/// back with the unit mutations that invalidated it. Returns the new value.
pub async fn recompute_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock = (
                SELECT COUNT(*) FROM units
                WHERE product_id = ?1 AND status = 'available' AND validated = 1
            ),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

    debug!(product_id = %product_id, stock, "Recomputed product stock");
    Ok(stock)
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category, size, color, code, stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its natural key.
    pub async fn get_by_key(
        &self,
        category: &str,
        size: &str,
        color: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category, size, color, code, stock, created_at, updated_at
            FROM products
            WHERE category = ?1 AND size = ?2 AND color = ?3
            "#,
        )
        .bind(category)
        .bind(size)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets the id of the product carrying `code`, if any.
    ///
    /// Used by the approval workflow's duplicate check.
    pub async fn find_id_by_code(&self, code: &str) -> DbResult<Option<String>> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    /// Lists all products, ordered by natural key.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category, size, color, code, stock, created_at, updated_at
            FROM products
            ORDER BY category, color, size
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Recomputes the derived stock for a product.
    ///
    /// Standalone variant for callers outside a service transaction.
    pub async fn recompute_stock(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        recompute_stock(&mut conn, product_id).await
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
