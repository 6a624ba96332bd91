//! # Domain Types
//!
//! Core domain types used throughout Stocktag.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐        │
//! │  │   Product     │    │     Unit      │    │    Order      │        │
//! │  │ ───────────── │    │ ───────────── │    │ ───────────── │        │
//! │  │ id (UUID)     │ 1:N│ id (UUID)     │ N:1│ id (UUID)     │        │
//! │  │ category/size │◄───│ code (unique) │───►│ customer_id   │        │
//! │  │   /color key  │    │ status        │    │ quantity      │        │
//! │  │ code (unique) │    │ validated     │    │ status        │        │
//! │  │ stock (derived)    │ order_id?     │    │               │        │
//! │  └───────────────┘    └───────────────┘    └───────────────┘        │
//! │                                                                     │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐        │
//! │  │  UnitStatus   │    │  OrderStatus  │    │  ScanOutcome  │        │
//! │  │ ───────────── │    │ ───────────── │    │ ───────────── │        │
//! │  │ Available     │    │ Pending       │    │ found         │        │
//! │  │ Reserved      │    │ Confirmed ■   │    │ unit_status   │        │
//! │  │ Sold          │    │ Cancelled ■   │    │ order_status  │        │
//! │  │ Damaged       │    │  (■ terminal) │    │ message       │        │
//! │  └───────────────┘    └───────────────┘    └───────────────┘        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: the registry code for units/products, the natural
//!   `(category, size, color)` key for products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Unit Status
// =============================================================================

/// Lifecycle state of a physical inventory unit.
///
/// ## Lifecycle
/// ```text
/// created ──► Available ──► Reserved ──► Sold
///                 │  ▲          │
///                 │  └──────────┘  (order cancelled: released)
///                 ▼
///              Damaged  (explicit admin re-flag; units are never deleted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// In stock, free to be reserved (once validated).
    Available,
    /// Bound to a pending order.
    Reserved,
    /// Order completed; the unit has left inventory.
    Sold,
    /// Flagged unusable by an admin; excluded from stock.
    Damaged,
}

impl UnitStatus {
    /// Stable string form, matching the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Reserved => "reserved",
            UnitStatus::Sold => "sold",
            UnitStatus::Damaged => "damaged",
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Available
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Status of a customer order.
///
/// `Confirmed` and `Cancelled` are terminal: no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created with a full reservation, awaiting validation or approval.
    Pending,
    /// All reserved units validated, or manual approval passed.
    Confirmed,
    /// Manually cancelled, or approval found a duplicate code.
    Cancelled,
}

impl OrderStatus {
    /// Stable string form, matching the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the order can still change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product variant, identified naturally by `(category, size, color)`.
///
/// `stock` is always derived from the unit ledger:
/// `count(units where status=available AND validated)`. It is recomputed
/// inside every transaction that changes a unit's status or validated flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product category (e.g. "tshirt").
    pub category: String,

    /// Size variant (e.g. "M").
    pub size: String,

    /// Color variant (e.g. "black").
    pub color: String,

    /// Registry-allocated code; unique across products AND units.
    pub code: String,

    /// Derived count of available, validated units.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The natural key of this product.
    pub fn key(&self) -> ProductKey {
        ProductKey {
            category: self.category.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// Natural key for a product: `(category, size, color)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub category: String,
    pub size: String,
    pub color: String,
}

impl std::fmt::Display for ProductKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.size, self.color)
    }
}

// =============================================================================
// Unit
// =============================================================================

/// One physical, individually trackable inventory item.
///
/// Units are created only by stock-in and are never deleted, only
/// re-flagged. The `validated` flag records that the unit was physically
/// scanned (or manually approved); it is reset at reservation time so each
/// order requires a fresh scan of its units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Unit {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning product.
    pub product_id: String,

    /// Registry-allocated code; unique across units AND products.
    pub code: String,

    /// Lifecycle state.
    pub status: UnitStatus,

    /// Whether this unit has been validated under its current context.
    pub validated: bool,

    /// When the unit was last validated.
    pub validated_at: Option<DateTime<Utc>>,

    /// Actor (admin / scanner identity) that validated the unit.
    pub validated_by: Option<String>,

    /// Order this unit is reserved or sold under, if any.
    pub order_id: Option<String>,

    /// When the unit was created (reservation selects oldest first).
    pub created_at: DateTime<Utc>,
}

impl Unit {
    /// Whether this unit can be selected by a reservation.
    pub fn is_eligible_for_reservation(&self) -> bool {
        self.status == UnitStatus::Available && self.validated
    }

    /// Whether this unit counts toward the product's derived stock.
    pub fn counts_toward_stock(&self) -> bool {
        self.is_eligible_for_reservation()
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order for a quantity of one product.
///
/// A pending order always holds exactly `quantity` reserved units; the
/// reservation either completes fully or the order is not created at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer that placed the order.
    pub customer_id: String,

    /// Product being ordered.
    pub product_id: String,

    /// Requested quantity.
    pub quantity: i64,

    /// Order status.
    pub status: OrderStatus,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Creation Policy
// =============================================================================

/// Policy for the `validated` flag of freshly created units.
///
/// Source systems disagree on whether a new unit is immediately eligible
/// for reservation or must be scanned once first. Both paths are supported;
/// [`CreationPolicy::ValidatedAtCreation`] is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationPolicy {
    /// Units are validated at stock-in and immediately count as stock.
    ValidatedAtCreation,
    /// Units require an initial scan (or bulk validation) before they
    /// become eligible for reservation.
    RequiresScan,
}

impl Default for CreationPolicy {
    fn default() -> Self {
        CreationPolicy::ValidatedAtCreation
    }
}

// =============================================================================
// Scan Outcome
// =============================================================================

/// Structured outcome of the scan entry point.
///
/// This is the boundary contract delivered to the external capture
/// mechanism: a not-found scan is a normal outcome here, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Whether the code matched a unit (after decode variants).
    pub found: bool,
    /// Status of the matched unit, if any.
    pub unit_status: Option<UnitStatus>,
    /// Status of the unit's order, if it has one.
    pub order_status: Option<OrderStatus>,
    /// Short human-readable outcome string.
    pub message: String,
}

impl ScanOutcome {
    /// Outcome for a code that matched no unit. Pure read, no side effects.
    pub fn not_found(code: &str) -> Self {
        ScanOutcome {
            found: false,
            unit_status: None,
            order_status: None,
            message: format!("No unit found for code {}", code),
        }
    }
}

// =============================================================================
// Unit Status Counts
// =============================================================================

/// Per-status unit counts for one product.
///
/// Conservation invariant: the four counts always sum to the total number
/// of units ever created for the product (units are never deleted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub available: i64,
    pub reserved: i64,
    pub sold: i64,
    pub damaged: i64,
}

impl StatusCounts {
    /// Total units ever created for the product.
    pub fn total(&self) -> i64 {
        self.available + self.reserved + self.sold + self.damaged
    }
}

// =============================================================================
// Rendering Collaborator
// =============================================================================

/// Boundary contract for rendering a code as a scannable symbol.
///
/// The engine calls this to obtain image bytes for a code; it never decodes
/// or interprets the result. Implementations live outside this workspace.
pub trait SymbolRenderer {
    /// Renders `code` as image bytes (e.g. a QR symbol).
    fn render_symbol(&self, code: &str) -> Vec<u8>;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit(status: UnitStatus, validated: bool) -> Unit {
        Unit {
            id: "u1".to_string(),
            product_id: "p1".to_string(),
            code: "c1".to_string(),
            status,
            validated,
            validated_at: None,
            validated_by: None,
            order_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reservation_eligibility() {
        assert!(unit(UnitStatus::Available, true).is_eligible_for_reservation());
        assert!(!unit(UnitStatus::Available, false).is_eligible_for_reservation());
        assert!(!unit(UnitStatus::Reserved, true).is_eligible_for_reservation());
        assert!(!unit(UnitStatus::Sold, true).is_eligible_for_reservation());
        assert!(!unit(UnitStatus::Damaged, true).is_eligible_for_reservation());
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_counts_total() {
        let counts = StatusCounts {
            available: 3,
            reserved: 2,
            sold: 4,
            damaged: 1,
        };
        assert_eq!(counts.total(), 10);
    }

    #[test]
    fn test_symbol_renderer_is_object_safe() {
        struct FixedRenderer;
        impl SymbolRenderer for FixedRenderer {
            fn render_symbol(&self, code: &str) -> Vec<u8> {
                code.as_bytes().to_vec()
            }
        }

        let renderer: Box<dyn SymbolRenderer> = Box::new(FixedRenderer);
        assert_eq!(renderer.render_symbol("ab"), b"ab".to_vec());
    }

    #[test]
    fn test_scan_outcome_not_found() {
        let outcome = ScanOutcome::not_found("abc");
        assert!(!outcome.found);
        assert!(outcome.unit_status.is_none());
        assert!(outcome.message.contains("abc"));
    }
}
