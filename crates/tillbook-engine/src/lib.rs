//! # tillbook-engine: Sales & Reconciliation for Tillbook
//!
//! Orchestrates the rules in `tillbook-core` over the units of work in
//! `tillbook-db`. Nothing here writes SQL.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller (HTTP layer, admin tool, test)                                  │
//! │       │  CreateTransactionInput + Actor                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                tillbook-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   SalesEngine ──────────┐        ReconciliationEngine           │   │
//! │  │                         │          snapshot / compare /         │   │
//! │  │                         │          auto_correct                 │   │
//! │  │                         ▼                                       │   │
//! │  │            Database::execute / inspect (one unit)               │   │
//! │  │                         │ COMMIT                                │   │
//! │  │                         ▼                                       │   │
//! │  │            Sinks::publish (audit + domain event)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sales`] - Sales, returns, deposits, payment top-ups
//! - [`reconciliation`] - Stock reconciliation and correction
//! - [`sinks`] - Post-commit event and audit sinks
//! - [`config`] - `tillbook.toml` plus `TILLBOOK_*` overrides
//! - [`error`] - Engine errors and stable error codes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_engine::{EngineConfig, SalesEngine};
//!
//! let config = EngineConfig::load_or_default(None);
//! tillbook_engine::init_tracing(&config.logging.filter);
//!
//! let db = tillbook_db::Database::new(config.to_db_config()).await?;
//! let sales = SalesEngine::from_config(db, &config);
//! let receipt = sales.create_transaction(input, &actor).await?;
//! ```

pub mod config;
pub mod error;
pub mod reconciliation;
pub mod sales;
pub mod sinks;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, EngineResult, ErrorBody, ErrorCode};
pub use reconciliation::ReconciliationEngine;
pub use sales::SalesEngine;
pub use sinks::{AuditEntry, AuditSink, DomainEvent, EventSink, Sinks};

use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. A second call leaves the
/// first subscriber in place and logs the refusal at debug level.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
