//! # Unit of Work
//!
//! One SQLite transaction spanning every store a business operation touches.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::execute(|uow| Box::pin(async move { ... }))                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  UPDATE write_intent SET claimed_at = ?   ← takes the write lock first  │
//! │       │                                   (busy → CommitConflict)       │
//! │       ▼                                                                 │
//! │  closure runs: uow.products() / uow.clients() / uow.transactions()      │
//! │       │        uow.invoices()  (all on one connection)                  │
//! │       │                                                                 │
//! │       ├── Ok(value) → COMMIT → Ok(value)                                │
//! │       └── Err(e)    → ROLLBACK → Err(e) unchanged                       │
//! │                                                                         │
//! │  Dropping the future mid-way drops the transaction → ROLLBACK           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Claiming the write lock before the first read means every read inside
//! the unit sees the latest committed state and no other writer can commit
//! between that read and this unit's writes.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::client::ClientStore;
use crate::repository::invoice::InvoiceStore;
use crate::repository::product::ProductStore;
use crate::repository::transaction::TransactionStore;

/// The future a unit-of-work closure returns.
///
/// The closure must capture only owned data: the future is tied to the
/// lifetime of the `&mut UnitOfWork` borrow and nothing else.
pub type UnitFuture<'u, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'u>>;

/// Whether a unit will write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitMode {
    /// Claims the writer slot, commits on success.
    Write,
    /// No claim, always rolled back.
    ReadOnly,
}

/// Handle passed to unit-of-work closures.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    id: Uuid,
    started_at: DateTime<Utc>,
    mode: UnitMode,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("mode", &self.mode)
            .finish()
    }
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool, mode: UnitMode) -> DbResult<Self> {
        let mut tx = pool.begin().await?;
        let started_at = Utc::now();
        let id = Uuid::new_v4();

        if mode == UnitMode::Write {
            sqlx::query("UPDATE write_intent SET claimed_at = ?1 WHERE id = 1")
                .bind(started_at)
                .execute(&mut *tx)
                .await?;
        }

        debug!(unit = %id, ?mode, "Unit of work started");
        Ok(UnitOfWork {
            tx,
            id,
            started_at,
            mode,
        })
    }

    pub(crate) async fn commit(self) -> DbResult<()> {
        let id = self.id;
        self.tx.commit().await?;
        debug!(unit = %id, "Unit of work committed");
        Ok(())
    }

    pub(crate) async fn rollback(self) {
        let id = self.id;
        if let Err(e) = self.tx.rollback().await {
            warn!(unit = %id, error = %e, "Rollback failed; connection will discard the transaction");
        } else {
            debug!(unit = %id, "Unit of work rolled back");
        }
    }

    /// Unit id, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// One timestamp for every row the unit writes.
    pub fn now(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Raw access to the unit's connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Stock ledger operations inside this unit.
    pub fn products(&mut self) -> ProductStore<'_> {
        ProductStore::new(&mut *self.tx)
    }

    /// Client and ledger operations inside this unit.
    pub fn clients(&mut self) -> ClientStore<'_> {
        ClientStore::new(&mut *self.tx)
    }

    /// Transaction record operations inside this unit.
    pub fn transactions(&mut self) -> TransactionStore<'_> {
        TransactionStore::new(&mut *self.tx)
    }

    /// Invoice counter inside this unit.
    pub fn invoices(&mut self) -> InvoiceStore<'_> {
        InvoiceStore::new(&mut *self.tx)
    }
}

/// Runs `f` inside a unit and commits or rolls back on its result.
pub(crate) async fn run<T, E, F>(pool: &SqlitePool, mode: UnitMode, f: F) -> Result<T, E>
where
    F: for<'u> FnOnce(&'u mut UnitOfWork) -> UnitFuture<'u, T, E>,
    E: From<DbError>,
{
    let mut unit = UnitOfWork::begin(pool, mode).await.map_err(E::from)?;

    let result = f(&mut unit).await;

    match (result, mode) {
        (Ok(value), UnitMode::Write) => {
            unit.commit().await.map_err(E::from)?;
            Ok(value)
        }
        (Ok(value), UnitMode::ReadOnly) => {
            unit.rollback().await;
            Ok(value)
        }
        (Err(err), _) => {
            unit.rollback().await;
            Err(err)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
