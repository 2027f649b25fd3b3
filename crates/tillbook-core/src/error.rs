//! # Error Types
//!
//! Domain-specific error types for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tillbook-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, CommitConflict               │
//! │                                                                         │
//! │  tillbook-engine errors                                                │
//! │  └── EngineError      - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every rejection carries the computed figures (required payment,
//!    available stock, ...) so the caller can correct without a second call
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::money::{Money, Quantity};
use crate::types::{TransactionType, Unit};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while pricing, settling or ledgering a sale.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Neither or both of `client_id` / `walk_in` were supplied, or the
    /// referenced client cannot take part in a sale.
    #[error("Invalid customer reference: {reason}")]
    InvalidCustomerReference { reason: String },

    /// The client exists but is suspended.
    #[error("Client {client_id} is suspended")]
    SuspendedClient { client_id: String },

    /// Requested unit differs from the product's declared unit.
    #[error("Unit mismatch for {product_name}: product is sold by {expected}, requested {requested}")]
    UnitMismatch {
        product_id: String,
        product_name: String,
        expected: Unit,
        requested: Unit,
    },

    /// Not enough stock to cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Line: 5 × Cement 50kg
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Cement 50kg", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Caller shows: "Only 3 Cement 50kg in stock"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: Quantity,
        requested: Quantity,
    },

    /// A discount that is negative or larger than the amount it applies to.
    #[error("Invalid discount on {context}: discount {discount} against amount {amount}")]
    InvalidDiscount {
        context: String,
        amount: Money,
        discount: Money,
    },

    /// Exact-settlement policy violated.
    #[error("Payment mismatch: exactly {required} is required, received {paid}")]
    PaymentMismatch { required: Money, paid: Money },

    /// More was paid than the policy allows.
    #[error("Overpayment: at most {allowed} may be paid, received {paid}")]
    Overpayment { allowed: Money, paid: Money },

    /// Unparseable or unrepresentable decimal input.
    #[error("Invalid decimal '{input}': {reason}")]
    InvalidDecimal { input: String, reason: String },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation does not accept this transaction type.
    #[error("{operation} does not accept {transaction_type} transactions")]
    InvalidTransactionType {
        transaction_type: TransactionType,
        operation: String,
    },

    /// Transaction is not in a state that allows the requested operation.
    #[error("Transaction {transaction_id} is {current_status}, cannot {operation}")]
    InvalidTransactionStatus {
        transaction_id: String,
        current_status: String,
        operation: String,
    },

    /// A return that does not match its reference transaction.
    #[error("Invalid return: {reason}")]
    InvalidReturn { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidCustomerReference error.
    pub fn invalid_customer(reason: impl Into<String>) -> Self {
        CoreError::InvalidCustomerReference {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Too many decimal places for the field.
    #[error("{field} allows at most {max_places} decimal places")]
    TooManyDecimals { field: String, max_places: u32 },

    /// Fractional quantity for a unit that is counted in whole pieces.
    #[error("{field} must be a whole number for unit {unit}")]
    NonIntegerQuantity { field: String, unit: Unit },

    /// Invalid format (e.g., a malformed invoice prefix).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_insufficient_stock_message_carries_figures() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Cement 50kg".to_string(),
            available: Quantity::from_int(3),
            requested: Quantity::from_int(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Cement 50kg: available 3, requested 5"
        );
    }

    #[test]
    fn test_payment_mismatch_message() {
        let err = CoreError::PaymentMismatch {
            required: Money::from_minor(7000),
            paid: Money::from_minor(6900),
        };
        assert_eq!(
            err.to_string(),
            "Payment mismatch: exactly 70.00 is required, received 69.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::NonIntegerQuantity {
            field: "quantity".to_string(),
            unit: Unit::Bag,
        };
        assert_eq!(err.to_string(), "quantity must be a whole number for unit bag");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
