//! # tillbook-db: Database Layer for Tillbook
//!
//! This crate provides database access for the Tillbook engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Data Flow                               │
//! │                                                                         │
//! │  SalesEngine::create_transaction                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  UnitOfWork   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductStore  │    │              │  │   │
//! │  │   │ SqlitePool    │───►│ ClientStore   │    │ 001_init.sql │  │   │
//! │  │   │ execute()     │    │ Transaction-  │    │              │  │   │
//! │  │   │ inspect()     │    │   Store       │    │              │  │   │
//! │  │   │               │    │ InvoiceStore  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration, unit entry points
//! - [`unit_of_work`] - One SQLite transaction across stores
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Pool-level repositories and unit-scoped stores
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tillbook.db")).await?;
//!
//! // Plain reads
//! let product = db.products().get_by_id("uuid").await?;
//!
//! // Atomic writes
//! db.execute(|uow| Box::pin(async move {
//!     let now = uow.now();
//!     uow.products().decrement_stock("uuid", qty, now).await
//! }))
//! .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::{UnitFuture, UnitOfWork};

// Repository re-exports for convenience
pub use repository::audit::{AuditRecord, AuditRepository};
pub use repository::client::{ClientRepository, ClientStore, NewLedgerEntry};
pub use repository::invoice::InvoiceStore;
pub use repository::outbox::{EventOutboxRepository, OutboxEntry};
pub use repository::product::{ProductRepository, ProductStore};
pub use repository::transaction::{SoldTotals, TransactionRepository, TransactionStore};
