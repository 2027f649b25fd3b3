//! # Engine Error Types
//!
//! What callers of the sales and reconciliation engines see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tillbook                               │
//! │                                                                         │
//! │  price_line / check_payment ─── CoreError ──────────────┐              │
//! │                                                          │              │
//! │  store write refused ─── DbError::Domain(CoreError) ────┤ unwrapped    │
//! │                                                          ▼              │
//! │  SQLite busy / unique / decode ─── DbError ───────► EngineError         │
//! │                                                          │              │
//! │  tillbook.toml / TILLBOOK_* ─── ConfigError ────────────┘              │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                  { "code": "PAYMENT_MISMATCH",          │
//! │                                    "message": "Payment mismatch: ..." } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A business rule broken at write time (stock re-checked inside the unit)
//! reaches the caller as the same `Core` variant a pre-check would raise.

use serde::Serialize;
use thiserror::Error;
use tillbook_core::{CoreError, ValidationError};
use tillbook_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// The config file could not be written.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Business Rules
    // =========================================================================
    /// A pricing, payment, ledger or stock rule rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Storage
    // =========================================================================
    /// Storage failure, including `CommitConflict`.
    #[error(transparent)]
    Db(DbError),

    // =========================================================================
    // Configuration
    // =========================================================================
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => EngineError::Core(core),
            other => EngineError::Db(other),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Machine-readable error codes.
///
/// ## Usage by callers
/// ```typescript
/// switch (e.code) {
///   case 'PAYMENT_MISMATCH':   showRequired(e.message); break;
///   case 'INSUFFICIENT_STOCK': refreshShelf(); break;
///   case 'COMMIT_CONFLICT':    retry(); break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InvalidCustomerReference,
    SuspendedClient,
    UnitMismatch,
    InsufficientStock,
    InvalidDiscount,
    PaymentMismatch,
    Overpayment,
    InvalidDecimal,
    InvalidTransactionType,
    InvalidTransactionStatus,
    InvalidReturn,
    Duplicate,
    CommitConflict,
    DatabaseError,
    ConfigError,
    Internal,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidCustomerReference => "INVALID_CUSTOMER_REFERENCE",
            ErrorCode::SuspendedClient => "SUSPENDED_CLIENT",
            ErrorCode::UnitMismatch => "UNIT_MISMATCH",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::InvalidDiscount => "INVALID_DISCOUNT",
            ErrorCode::PaymentMismatch => "PAYMENT_MISMATCH",
            ErrorCode::Overpayment => "OVERPAYMENT",
            ErrorCode::InvalidDecimal => "INVALID_DECIMAL",
            ErrorCode::InvalidTransactionType => "INVALID_TRANSACTION_TYPE",
            ErrorCode::InvalidTransactionStatus => "INVALID_TRANSACTION_STATUS",
            ErrorCode::InvalidReturn => "INVALID_RETURN",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::CommitConflict => "COMMIT_CONFLICT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error body: `{ "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    /// Stable code for programmatic handling.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::InvalidCustomerReference { .. } => ErrorCode::InvalidCustomerReference,
                CoreError::SuspendedClient { .. } => ErrorCode::SuspendedClient,
                CoreError::UnitMismatch { .. } => ErrorCode::UnitMismatch,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::InvalidDiscount { .. } => ErrorCode::InvalidDiscount,
                CoreError::PaymentMismatch { .. } => ErrorCode::PaymentMismatch,
                CoreError::Overpayment { .. } => ErrorCode::Overpayment,
                CoreError::InvalidDecimal { .. } => ErrorCode::InvalidDecimal,
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::InvalidTransactionType { .. } => ErrorCode::InvalidTransactionType,
                CoreError::InvalidTransactionStatus { .. } => ErrorCode::InvalidTransactionStatus,
                CoreError::InvalidReturn { .. } => ErrorCode::InvalidReturn,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            EngineError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } => ErrorCode::Duplicate,
                DbError::ForeignKeyViolation { .. } => ErrorCode::ValidationError,
                DbError::CommitConflict(_) => ErrorCode::CommitConflict,
                DbError::Domain(_) | DbError::Internal(_) => ErrorCode::Internal,
                DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::PoolExhausted
                | DbError::CorruptValue { .. } => ErrorCode::DatabaseError,
            },
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// True when nothing was written because another writer got there
    /// first; the caller may resubmit.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Db(DbError::CommitConflict(_)) | EngineError::Db(DbError::PoolExhausted)
        )
    }

    /// Code and message for a response body. Storage faults are logged
    /// here and reported with a generic message.
    pub fn to_body(&self) -> ErrorBody {
        let code = self.code();
        let message = match self {
            EngineError::Db(
                err @ (DbError::QueryFailed(_) | DbError::Internal(_) | DbError::CorruptValue { .. }),
            ) => {
                tracing::error!(error = %err, "Database operation failed");
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::{Money, Quantity};

    #[test]
    fn test_domain_db_error_surfaces_as_core() {
        let db_err = DbError::Domain(CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Cement 50kg".to_string(),
            available: Quantity::from_int(1),
            requested: Quantity::from_int(2),
        });
        let err = EngineError::from(db_err);
        assert!(matches!(err, EngineError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let err = EngineError::from(CoreError::PaymentMismatch {
            required: Money::from_major(70),
            paid: Money::from_major(120),
        });
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(body["code"], "PAYMENT_MISMATCH");
        assert_eq!(
            body["message"],
            "Payment mismatch: exactly 70.00 is required, received 120.00"
        );
        assert_eq!(ErrorCode::CommitConflict.to_string(), "COMMIT_CONFLICT");
    }

    #[test]
    fn test_conflicts_are_retryable() {
        assert!(EngineError::from(DbError::conflict("busy")).is_retryable());
        assert!(!EngineError::from(CoreError::not_found("Product", "p-1")).is_retryable());
        assert!(!EngineError::from(ConfigError::Invalid("x".into())).is_retryable());
    }

    #[test]
    fn test_query_failures_are_masked() {
        let err = EngineError::from(DbError::QueryFailed("no such column: stok".into()));
        let body = err.to_body();
        assert_eq!(body.code, ErrorCode::DatabaseError);
        assert_eq!(body.message, "Database operation failed");
    }
}
