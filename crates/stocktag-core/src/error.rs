//! # Error Types
//!
//! Domain-specific error types for stocktag-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                │
//! │                                                                     │
//! │  stocktag-core errors (this file)                                   │
//! │  ├── CoreError        - Domain failures (stock, codes, lifecycle)   │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  stocktag-db errors (separate crate)                                │
//! │  └── DbError          - Storage failures, folded into               │
//! │                         CoreError::Storage at the service boundary  │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError ← DbError                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (codes, counts, ids)
//! 3. Errors are enum variants, never String
//! 4. Each user-visible failure maps to a short flash message via
//!    [`CoreError::user_message`]

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent rule violations in the reservation-and-validation
/// engine. Multi-step operations surface exactly one of these; partial
/// failure states are never reported.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Code allocation burned through its entire retry budget.
    ///
    /// Fatal to the calling create/reserve operation: the caller must
    /// abort and retry later, never proceed with a non-unique code.
    #[error("failed to allocate a unique code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// Fewer eligible units exist than the reservation requested.
    ///
    /// ## When This Occurs
    /// - Requested quantity exceeds available, validated units
    /// - A concurrent reservation claimed the units first
    ///
    /// No partial reservation is left behind.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// Approval found the same code value on another live unit or product.
    ///
    /// The order has already been cancelled (and its units released) as a
    /// side effect by the time this error surfaces.
    #[error("duplicate code detected: {code}")]
    DuplicateCodeDetected { code: String },

    /// No unit carries the scanned code (after trying all decode variants).
    #[error("unit not found for code: {0}")]
    UnitNotFound(String),

    /// Referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Approving or cancelling an already confirmed/cancelled order
    ///
    /// Confirmed and cancelled are terminal: no further transitions.
    #[error("order {order_id} is {current_status}, cannot perform operation")]
    InvalidOrderStatus {
        order_id: String,
        current_status: String,
    },

    /// Unit is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Flagging a reserved, sold, or already-damaged unit as damaged
    #[error("unit {unit_id} is {current_status}, cannot perform operation")]
    InvalidUnitStatus {
        unit_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Underlying store failure. The in-flight operation has rolled back
    /// entirely; surfaced as a generic failure to the caller.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CoreError {
    /// Short human-readable outcome string for the presentation layer.
    ///
    /// The core produces these; an external notification/flash collaborator
    /// displays them. No partial-success messaging exists: an operation
    /// either fully succeeds or is reported failed with state unchanged.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::GenerationExhausted { .. } => {
                "Could not allocate a unique code. Please try again later.".to_string()
            }
            CoreError::InsufficientStock {
                available,
                requested,
            } => format!(
                "Insufficient stock. Available: {}, Requested: {}",
                available, requested
            ),
            CoreError::DuplicateCodeDetected { .. } => {
                "Duplicate code detected. Please contact the support team.".to_string()
            }
            CoreError::UnitNotFound(_) => "Scanned code does not match any unit.".to_string(),
            CoreError::OrderNotFound(_) => "Order not found.".to_string(),
            CoreError::ProductNotFound(_) => "Product not found.".to_string(),
            CoreError::InvalidOrderStatus { current_status, .. } => {
                format!("Order is already {}.", current_status)
            }
            CoreError::InvalidUnitStatus { current_status, .. } => {
                format!("Unit is {}.", current_status)
            }
            CoreError::Validation(err) => err.to_string(),
            CoreError::Storage(_) => "Operation failed. Please try again.".to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. duplicate product natural key).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock: available 3, requested 5"
        );
    }

    #[test]
    fn test_user_messages() {
        let err = CoreError::InsufficientStock {
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.user_message(),
            "Insufficient stock. Available: 3, Requested: 5"
        );

        let err = CoreError::DuplicateCodeDetected {
            code: "abc123".to_string(),
        };
        assert!(err.user_message().contains("support team"));

        let err = CoreError::Storage("disk full".to_string());
        // Storage details never leak to the user-visible string.
        assert!(!err.user_message().contains("disk full"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "category".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
