//! # stocktag-db: Storage Layer for Stocktag
//!
//! This crate provides database access for the Stocktag reservation and
//! validation engine. It uses SQLite for local storage with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Stocktag Data Flow                            │
//! │                                                                     │
//! │  Host (capture app, HTTP handler, CLI)                              │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                   stocktag-db (THIS CRATE)                    │ │
//! │  │                                                               │ │
//! │  │  ┌────────────┐  ┌──────────────┐  ┌───────────────────────┐ │ │
//! │  │  │  Database  │  │ Repositories │  │       Services        │ │ │
//! │  │  │ (pool.rs)  │  │ product/unit │  │ stock_in reservation  │ │ │
//! │  │  │            │  │    /order    │  │ scan     approval     │ │ │
//! │  │  │ SqlitePool │◄─┤ single-row   │◄─┤ one transaction per   │ │ │
//! │  │  │ migrations │  │ reads/writes │  │ multi-step operation  │ │ │
//! │  │  └────────────┘  └──────────────┘  └───────────────────────┘ │ │
//! │  │        ▲                                                      │ │
//! │  │        │         ┌──────────────┐                             │ │
//! │  │        └─────────┤ CodeRegistry │ unique codes, one namespace │ │
//! │  │                  └──────────────┘                             │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 ▼                                   │
//! │                         SQLite Database                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`registry`] - Allocation of globally unique codes
//! - [`repository`] - Repository implementations (product, unit, order)
//! - [`service`] - Transactional engines (stock-in, reservation, scan,
//!   approval)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stocktag_db::{Database, DbConfig};
//! use stocktag_core::CreationPolicy;
//!
//! let db = Database::new(DbConfig::new("path/to/stocktag.db")).await?;
//!
//! let product = db.stock_in().create_product("tshirt", "M", "black").await?;
//! db.stock_in()
//!     .stock_in(&product.id, 10, CreationPolicy::default(), Some("admin"))
//!     .await?;
//!
//! let reservation = db.reservations().reserve("cust-1", &product.id, 2).await?;
//! for unit in &reservation.units {
//!     db.scanner().scan(&unit.code, Some("gate-1")).await?;
//! }
//! // Order is now confirmed; units are sold.
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod registry;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use registry::{CodeOwner, CodeRegistry};

// Repository re-exports for convenience
pub use repository::order::{OrderProgress, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::unit::UnitRepository;

// Service re-exports for convenience
pub use service::approval::ApprovalService;
pub use service::reservation::{Reservation, ReservationService};
pub use service::scan::ScanService;
pub use service::stock_in::StockInService;
