//! # Validation Module
//!
//! Input validation for Stocktag.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Host (capture UI, HTTP handlers)                          │
//! │  └── Basic format checks, immediate user feedback                   │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business rule validation                    │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / CHECK constraints                                   │
//! │  ├── UNIQUE constraints (codes, natural keys)                       │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Multiple layers catch different errors.                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_RESERVATION_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates one component of a product's natural key (category, size,
/// color).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
pub fn validate_product_field(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    Ok(())
}

/// Validates raw scan input before lookup.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 256 characters (capture apps sometimes deliver whole
///   URLs; anything longer is garbage, not a damaged code)
pub fn validate_scan_input(raw: &str) -> ValidationResult<()> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if raw.len() > 256 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 256,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a reservation or stock-in quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_RESERVATION_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_RESERVATION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_RESERVATION_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID format (36 characters with hyphens)
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_field() {
        assert!(validate_product_field("category", "tshirt").is_ok());
        assert!(validate_product_field("size", "M").is_ok());

        assert!(validate_product_field("category", "").is_err());
        assert!(validate_product_field("category", "   ").is_err());
        assert!(validate_product_field("color", &"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_scan_input() {
        assert!(validate_scan_input("abc123").is_ok());
        assert!(validate_scan_input("  abc123  ").is_ok());

        assert!(validate_scan_input("").is_err());
        assert!(validate_scan_input("   ").is_err());
        assert!(validate_scan_input(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
