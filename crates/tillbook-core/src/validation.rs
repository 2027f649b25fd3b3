//! # Validation Module
//!
//! Input validation for Tillbook requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (out of scope)                                     │
//! │  └── Request shape, deserialization                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry (Rust)                                          │
//! │  └── THIS MODULE: field rules (scale, sign, blank names)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Business rules (pricing, payment policy, ledger)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK constraints (exactly one customer)                          │
//! │  ├── UNIQUE constraints (invoice_number)                               │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::validation::{validate_money, validate_quantity};
//! use tillbook_core::{Money, Quantity, Unit};
//!
//! validate_money("discount", Money::from_minor(250)).unwrap();
//! validate_quantity(Quantity::from_int(5), Unit::Bag).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::types::Unit;
use crate::{MAX_LINE_ITEMS, MONEY_SCALE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_REASON_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, client or walk-in customer).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a free-text reason (returns, stock corrections).
///
/// ## Example
/// ```rust
/// use tillbook_core::validation::validate_reason;
///
/// assert!(validate_reason("monthly stock count").is_ok());
/// assert!(validate_reason("   ").is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Decimal Validators
// =============================================================================

/// Validates a money input: non-negative, at most two decimal places.
///
/// ## Example
/// ```rust
/// use tillbook_core::validation::validate_money;
/// use tillbook_core::Money;
///
/// assert!(validate_money("amount_paid", "70.00".parse().unwrap()).is_ok());
/// assert!(validate_money("amount_paid", "70.001".parse().unwrap()).is_err());
/// assert!(validate_money("amount_paid", Money::from_minor(-1)).is_err());
/// ```
pub fn validate_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if !amount.fits_money_scale() {
        return Err(ValidationError::TooManyDecimals {
            field: field.to_string(),
            max_places: MONEY_SCALE,
        });
    }

    Ok(())
}

/// Validates a money input that must be strictly positive.
pub fn validate_positive_money(field: &str, amount: Money) -> ValidationResult<()> {
    validate_money(field, amount)?;
    if amount.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a line quantity against the product's unit.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Piece-like units: whole numbers only
/// - Measured units: at most three decimal places
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Line: 2.5 × Cement (bag)                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2.5, bag) ← THIS FUNCTION                           │
/// │       │                                                                 │
/// │       ├── qty <= 0?         → MustBePositive                           │
/// │       ├── bag and fraction? → NonIntegerQuantity                       │
/// │       ├── kg and 4 places?  → TooManyDecimals                          │
/// │       └── OK → price the line                                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(quantity: Quantity, unit: Unit) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if unit.is_piece_like() {
        if !quantity.is_whole() {
            return Err(ValidationError::NonIntegerQuantity {
                field: "quantity".to_string(),
                unit,
            });
        }
    } else if quantity.significant_places() > unit.max_quantity_places() {
        return Err(ValidationError::TooManyDecimals {
            field: "quantity".to_string(),
            max_places: unit.max_quantity_places(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a transaction.
///
/// ## Rules
/// - At least one line
/// - At most MAX_LINE_ITEMS (100)
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Portland Cement").is_ok());
        assert!(matches!(
            validate_name("walk_in.name", "  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_piece_like_quantities_must_be_whole() {
        assert!(validate_quantity(qty("3"), Unit::Bag).is_ok());
        assert!(validate_quantity(qty("3.000"), Unit::Carton).is_ok());
        assert!(matches!(
            validate_quantity(qty("2.5"), Unit::Bag),
            Err(ValidationError::NonIntegerQuantity { .. })
        ));
    }

    #[test]
    fn test_measured_quantities_allow_three_places() {
        assert!(validate_quantity(qty("2.5"), Unit::Kg).is_ok());
        assert!(validate_quantity(qty("0.125"), Unit::Litre).is_ok());
        assert!(matches!(
            validate_quantity(qty("0.1255"), Unit::Litre),
            Err(ValidationError::TooManyDecimals { max_places: 3, .. })
        ));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(validate_quantity(Quantity::ZERO, Unit::Kg).is_err());
        assert!(validate_quantity(qty("-1"), Unit::Piece).is_err());
    }

    #[test]
    fn test_validate_money() {
        assert!(validate_money("discount", Money::ZERO).is_ok());
        assert!(validate_money("discount", "12.5".parse().unwrap()).is_ok());
        assert!(matches!(
            validate_money("discount", "0.005".parse().unwrap()),
            Err(ValidationError::TooManyDecimals { max_places: 2, .. })
        ));
        assert!(matches!(
            validate_money("discount", Money::from_minor(-100)),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            validate_positive_money("payment", Money::ZERO),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(100).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(101).is_err());
    }
}
