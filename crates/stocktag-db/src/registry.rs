//! # Code Registry
//!
//! Allocation of collision-free codes shared across the product and unit
//! namespaces. This module is the sole source of the uniqueness guarantee.
//!
//! ## Allocation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Insert-Then-Retry, Never Check-Then-Insert          │
//! │                                                                     │
//! │  loop (at most 50 attempts):                                        │
//! │      candidate = random 32-hex code                                 │
//! │      INSERT INTO codes (code, owner_kind) VALUES (?, ?)             │
//! │         │                                                           │
//! │         ├── OK               → return candidate                     │
//! │         ├── UNIQUE violation → collision, draw again                │
//! │         └── other error      → storage failure, abort               │
//! │                                                                     │
//! │  budget exhausted → GenerationExhausted (caller must abort)         │
//! │                                                                     │
//! │  A separate check-then-return sequence would be racy under          │
//! │  concurrent allocators; the PRIMARY KEY on codes.code makes the     │
//! │  insert itself the uniqueness check.                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Allocation runs on the caller's transaction, so the code row commits or
//! rolls back together with the product/unit row that owns it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbError;
use stocktag_core::{code, CoreError, CoreResult, MAX_CODE_ATTEMPTS};

/// Which namespace a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOwner {
    Product,
    Unit,
}

impl CodeOwner {
    /// Stable string form, matching the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeOwner::Product => "product",
            CodeOwner::Unit => "unit",
        }
    }
}

/// Allocator for globally unique codes.
#[derive(Debug, Clone)]
pub struct CodeRegistry {
    pool: SqlitePool,
}

impl CodeRegistry {
    /// Creates a new CodeRegistry.
    pub fn new(pool: SqlitePool) -> Self {
        CodeRegistry { pool }
    }

    /// Allocates a fresh unique code on the caller's connection.
    ///
    /// Intended to run inside the transaction that creates the owning row:
    /// pass `&mut *tx`. Draws random candidates and attempts the insert;
    /// a UNIQUE violation means collision and triggers a redraw. After
    /// [`MAX_CODE_ATTEMPTS`] failures the operation fails with
    /// [`CoreError::GenerationExhausted`] - fatal to the caller, which
    /// must roll back rather than proceed with a non-unique code.
    pub async fn allocate(
        &self,
        conn: &mut SqliteConnection,
        owner: CodeOwner,
    ) -> CoreResult<String> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = code::candidate();

            let result =
                sqlx::query("INSERT INTO codes (code, owner_kind, created_at) VALUES (?1, ?2, ?3)")
                    .bind(&candidate)
                    .bind(owner.as_str())
                    .bind(Utc::now())
                    .execute(&mut *conn)
                    .await;

            match result {
                Ok(_) => {
                    if attempt > 1 {
                        debug!(attempt, "code allocated after collisions");
                    }
                    return Ok(candidate);
                }
                Err(e) => {
                    let db_err = DbError::from(e);
                    if db_err.is_unique_violation() {
                        debug!(attempt, "code collision, drawing a new candidate");
                        continue;
                    }
                    return Err(db_err.into());
                }
            }
        }

        Err(CoreError::GenerationExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Returns the number of codes ever allocated (for diagnostics).
    pub async fn count(&self) -> CoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM codes")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_allocated_codes_unique_across_namespaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let registry = db.registry();

        let mut conn = db.pool().acquire().await.unwrap();
        let mut seen = HashSet::new();

        for i in 0..200 {
            let owner = if i % 2 == 0 {
                CodeOwner::Product
            } else {
                CodeOwner::Unit
            };
            let code = registry.allocate(&mut conn, owner).await.unwrap();
            assert!(seen.insert(code), "registry produced a duplicate code");
        }

        // Release the single in-memory pool connection so count() can acquire.
        drop(conn);

        assert_eq!(registry.count().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_store_enforces_uniqueness() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let registry = db.registry();

        let mut conn = db.pool().acquire().await.unwrap();
        let code = registry.allocate(&mut conn, CodeOwner::Unit).await.unwrap();

        // Bypassing the registry and re-inserting the same code must fail
        // at the store, not at an application-level pre-check.
        let err = sqlx::query("INSERT INTO codes (code, owner_kind, created_at) VALUES (?1, 'product', ?2)")
            .bind(&code)
            .bind(chrono::Utc::now())
            .execute(&mut *conn)
            .await
            .unwrap_err();

        assert!(DbError::from(err).is_unique_violation());
    }

    #[tokio::test]
    async fn test_allocation_commits_with_caller_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let registry = db.registry();

        let mut tx = db.pool().begin().await.unwrap();
        registry.allocate(&mut tx, CodeOwner::Unit).await.unwrap();
        // Dropping without commit rolls the code reservation back.
        drop(tx);

        assert_eq!(registry.count().await.unwrap(), 0);
    }
}
