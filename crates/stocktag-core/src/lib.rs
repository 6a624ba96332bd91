//! # stocktag-core: Pure Business Logic for Stocktag
//!
//! Stocktag tracks physically distinct inventory units, each carrying a
//! globally unique scannable code. This crate is the **heart** of the
//! system: every lifecycle rule lives here as pure code with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Stocktag Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │          Host (HTTP handlers, desktop shell, CLI)             │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │             ★ stocktag-core (THIS CRATE) ★                    │ │
//! │  │                                                               │ │
//! │  │  ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌────────────┐  │ │
//! │  │  │  types   │  │   code   │  │ validation │  │   error    │  │ │
//! │  │  │ Product  │  │ candidate│  │   rules    │  │  taxonomy  │  │ │
//! │  │  │ Unit     │  │ scan     │  │   checks   │  │  messages  │  │ │
//! │  │  │ Order    │  │ variants │  │            │  │            │  │ │
//! │  │  └──────────┘  └──────────┘  └────────────┘  └────────────┘  │ │
//! │  │                                                               │ │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │                 stocktag-db (Storage Layer)                   │ │
//! │  │       SQLite queries, migrations, transactional services      │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Unit, Order, statuses, outcomes)
//! - [`code`] - Code candidate generation and scan input normalization
//! - [`error`] - Domain error types and user-facing messages
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic logic, no hidden state
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Explicit Errors**: all errors are typed, never strings or panics
//! 4. **Unit-level truth**: aggregate stock is always derived, never stored
//!    as the source of truth

// =============================================================================
// Module Declarations
// =============================================================================

pub mod code;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Retry budget for code allocation.
///
/// A fresh random candidate is drawn for every attempt; exhausting the
/// budget means the registry is either astronomically unlucky or broken,
/// and the calling operation must abort rather than proceed with a
/// non-unique code.
pub const MAX_CODE_ATTEMPTS: u32 = 50;

/// Length of an allocated code (uuid v4, simple format: 32 hex chars).
pub const CODE_LENGTH: usize = 32;

/// Maximum quantity a single reservation may request.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_RESERVATION_QUANTITY: i64 = 999;
