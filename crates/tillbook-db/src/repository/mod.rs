//! # Repository Module
//!
//! Database repository implementations for Tillbook.
//!
//! ## Repositories and Stores
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into The Same Tables                        │
//! │                                                                         │
//! │  db.products()  → ProductRepository { pool }                           │
//! │  ├── get_by_id / list_for_branch / insert                              │
//! │  └── takes any pooled connection; reads see committed state            │
//! │                                                                         │
//! │  uow.products() → ProductStore<'c> { &mut SqliteConnection }           │
//! │  ├── decrement_stock / increment_stock / correct_stock                 │
//! │  └── borrows the unit's connection; part of its commit or rollback     │
//! │                                                                         │
//! │  Pool-level repositories delegate reads to the store on a pooled       │
//! │  connection, so each query is written once.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product`] - Catalog reads and the stock ledger
//! - [`client`] - Clients and their append-only ledger
//! - [`transaction`] - Transactions, item snapshots, sold/returned totals
//! - [`invoice`] - Per-period invoice counter
//! - [`outbox`] - Post-commit event queue
//! - [`audit`] - Audit log

pub mod audit;
pub mod client;
pub mod invoice;
pub mod outbox;
pub mod product;
pub mod transaction;
