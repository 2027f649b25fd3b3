//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Store rule (CoreError)               │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← categorized: unique, busy, domain, ...        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Unit of work rolls back, error returned unchanged                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (tillbook-engine) ← code() for callers                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tillbook_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate invoice number
    /// - Duplicate SKU within a branch
    /// - Two ledger entries with the same sequence for one client
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Another unit of work holds the write lock, or a row moved under an
    /// optimistic version check. Nothing was written; the caller may retry.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after the busy timeout
    /// - WAL snapshot went stale before the first write
    /// - `UPDATE ... WHERE version = ?` matched no row
    #[error("Commit conflict: {0}")]
    CommitConflict(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored value could not be decoded (bad decimal text, unknown enum).
    #[error("Corrupt value in {column}: {reason}")]
    CorruptValue { column: String, reason: String },

    /// A store refused a write that would break a domain invariant
    /// (stock below zero, negative ledger amount).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a CommitConflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::CommitConflict(message.into())
    }

    /// True for errors that mean "someone else was writing".
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::CommitConflict(_))
    }
}

// SQLite primary/extended result codes that signal lock contention.
// 5 = BUSY, 6 = LOCKED, 261 = BUSY_RECOVERY, 517 = BUSY_SNAPSHOT, 262 = LOCKED_SHAREDCACHE
const CONFLICT_CODES: &[&str] = &["5", "6", "261", "262", "517"];

fn is_lock_message(msg: &str) -> bool {
    msg.contains("database is locked") || msg.contains("database table is locked")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → unique / foreign key / busy-locked / query
/// sqlx::Error::ColumnDecode   → DbError::CorruptValue
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_lock_message(msg)
                    || code
                        .as_deref()
                        .map(|c| CONFLICT_CODES.contains(&c))
                        .unwrap_or(false)
                {
                    DbError::CommitConflict(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::CorruptValue {
                column: index,
                reason: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON encoding failed: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::Quantity;

    #[test]
    fn test_lock_messages_are_conflicts() {
        assert!(is_lock_message("database is locked"));
        assert!(is_lock_message("database table is locked: products"));
        assert!(!is_lock_message("no such table: products"));
    }

    #[test]
    fn test_domain_error_is_transparent() {
        let err: DbError = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Rope".to_string(),
            available: Quantity::from_int(1),
            requested: Quantity::from_int(2),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rope: available 1, requested 2"
        );
        assert!(!err.is_conflict());
        assert!(DbError::conflict("busy").is_conflict());
    }
}
