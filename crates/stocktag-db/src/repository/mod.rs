//! # Repository Module
//!
//! Database repository implementations for Stocktag.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Repository Pattern                              │
//! │                                                                     │
//! │  Host / Service                                                     │
//! │       │                                                             │
//! │       │  db.units().get_by_code("3f2a...")                          │
//! │       ▼                                                             │
//! │  UnitRepository                                                     │
//! │  ├── get_by_code(&self, code)                                       │
//! │  ├── list_for_order(&self, order_id)                                │
//! │  └── status_counts(&self, product_id)                               │
//! │       │                                                             │
//! │       │  SQL Query                                                  │
//! │       ▼                                                             │
//! │  SQLite Database                                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories cover single-entity reads and writes. The multi-step
//! read-then-write sequences (reservation, scan auto-confirm, approval)
//! live in [`crate::service`], where each owns exactly one transaction.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and derived stock
//! - [`unit::UnitRepository`] - The inventory ledger
//! - [`order::OrderRepository`] - Order records and progress counts

pub mod order;
pub mod product;
pub mod unit;
