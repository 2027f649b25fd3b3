//! # tillbook-core: Pure Business Logic for Tillbook
//!
//! This crate is the **heart** of Tillbook. It contains the sales, ledger and
//! reconciliation rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Callers (HTTP layer, admin tools, tests)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tillbook-engine                              │   │
//! │  │    SalesEngine, ReconciliationEngine, event/audit sinks         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tillbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │  ledger   │  │   │
//! │  │   │  Product  │  │   Money   │  │  lines    │  │  balance  │  │   │
//! │  │   │Transaction│  │ Quantity  │  │  payment  │  │  rules    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tillbook-db (Database Layer)                   │   │
//! │  │          SQLite, unit of work, repositories, counters           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Client, Transaction, ...)
//! - [`money`] - `Money` and `Quantity` over exact decimals
//! - [`pricing`] - Line pricing, totals, payment policy
//! - [`ledger`] - Client balance rules per transaction type
//! - [`invoice`] - Invoice number format
//! - [`reconciliation`] - Expected-stock math and report types
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::pricing::{check_payment, Payer};
//! use tillbook_core::{Money, TransactionType};
//!
//! // Client holds 50 credit, buys for 120: only the remaining 70 is accepted
//! let payer = Payer::Registered { balance: Money::from_major(50) };
//! let total = Money::from_major(120);
//! assert!(check_payment(payer, TransactionType::Purchase, total, Money::from_major(70)).is_ok());
//! assert!(check_payment(payer, TransactionType::Purchase, total, total).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod reconciliation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tillbook_core::Money` instead of
// `use tillbook_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimal places carried by every stored money figure.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places allowed on quantities of measured units (kg, litre, ...).
pub const MAX_QUANTITY_SCALE: u32 = 3;

/// Maximum lines allowed on a single transaction.
pub const MAX_LINE_ITEMS: usize = 100;

/// Invoice prefix used when configuration does not set one.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
