//! # Client Repository
//!
//! Registered clients and their append-only ledger.
//!
//! ## Ledger Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  uow.clients().apply_ledger_entry(client_id, PURCHASE, 120, ...)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read client (balance 50, version 4)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ledger::apply_entry(50, PURCHASE, 120) = 0     (rules live in core)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT client_ledger_entries (seq = MAX(seq) + 1, balance_after = 0)   │
//! │  UPDATE clients SET balance = 0, version = 5 WHERE version = 4          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `clients.balance` is a cache; the entries are the record.
//! [`ClientStore::recompute_balance`] folds them to prove it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::ledger::{self, BalanceCheck};
use tillbook_core::{Client, CoreError, LedgerEntry, Money, TransactionType, ValidationError};

const SELECT_CLIENT: &str = r#"
    SELECT id, branch_id, name, phone, address, balance, is_active, is_suspended,
           last_transaction_date, created_at, updated_at, version
    FROM clients
    WHERE id = ?1
"#;

const SELECT_ENTRIES: &str = r#"
    SELECT id, client_id, seq, entry_type, amount, balance_after, description,
           reference, created_at
    FROM client_ledger_entries
    WHERE client_id = ?1
    ORDER BY seq
    LIMIT ?2 OFFSET ?3
"#;

/// A ledger line about to be written.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub kind: TransactionType,
    pub amount: Money,
    pub description: &'a str,
    pub reference: Option<&'a str>,
}

// =============================================================================
// Pool-level repository
// =============================================================================

/// Repository for client reads and registration.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        ClientStore::new(&mut conn).find(id).await
    }

    pub async fn insert(&self, client: &Client) -> DbResult<Client> {
        let mut conn = self.pool.acquire().await?;
        ClientStore::new(&mut conn).insert(client).await?;
        Ok(client.clone())
    }

    /// One page of a client's ledger, oldest first.
    pub async fn list_entries(
        &self,
        client_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        ClientStore::new(&mut conn)
            .list_entries(client_id, limit, offset)
            .await
    }

}

// =============================================================================
// Unit-scoped store
// =============================================================================

/// Client operations bound to one connection, usually a unit of work's.
pub struct ClientStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ClientStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ClientStore { conn }
    }

    pub async fn find(&mut self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(SELECT_CLIENT)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(client)
    }

    pub async fn get(&mut self, id: &str) -> DbResult<Client> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Registers a client with a zero balance.
    ///
    /// An opening balance is a DEPOSIT written with
    /// [`apply_ledger_entry`](Self::apply_ledger_entry) in the same unit, so
    /// the cached balance always has entries behind it.
    pub async fn insert(&mut self, client: &Client) -> DbResult<()> {
        if !client.balance.is_zero() {
            return Err(CoreError::from(ValidationError::InvalidFormat {
                field: "balance".to_string(),
                reason: format!(
                    "must be zero on registration, got {}; record a deposit instead",
                    client.balance
                ),
            })
            .into());
        }

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, branch_id, name, phone, address, balance, is_active, is_suspended,
                last_transaction_date, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&client.id)
        .bind(&client.branch_id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.balance)
        .bind(client.is_active)
        .bind(client.is_suspended)
        .bind(client.last_transaction_date)
        .bind(client.created_at)
        .bind(client.updated_at)
        .bind(client.version)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Appends one entry and moves the cached balance with it.
    ///
    /// ## Returns
    /// The client as stored after the write, and the entry written.
    ///
    /// ## Errors
    /// * `Domain(Validation(Negative))` - negative amount
    /// * `NotFound` - unknown client
    /// * `CommitConflict` - client row changed under the version check
    pub async fn apply_ledger_entry(
        &mut self,
        client_id: &str,
        entry: NewLedgerEntry<'_>,
        now: DateTime<Utc>,
    ) -> DbResult<(Client, LedgerEntry)> {
        let client = self.get(client_id).await?;
        let balance_after = ledger::apply_entry(client.balance, entry.kind, entry.amount)?;

        let seq: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM client_ledger_entries WHERE client_id = ?1",
        )
        .bind(client_id)
        .fetch_one(&mut *self.conn)
        .await?;

        let written = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            seq,
            entry_type: entry.kind,
            amount: entry.amount,
            balance_after,
            description: entry.description.to_string(),
            reference: entry.reference.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO client_ledger_entries (
                id, client_id, seq, entry_type, amount, balance_after,
                description, reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&written.id)
        .bind(&written.client_id)
        .bind(written.seq)
        .bind(written.entry_type)
        .bind(written.amount)
        .bind(written.balance_after)
        .bind(&written.description)
        .bind(&written.reference)
        .bind(written.created_at)
        .execute(&mut *self.conn)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET balance = ?1, last_transaction_date = ?2, updated_at = ?2, version = version + 1
            WHERE id = ?3 AND version = ?4
            "#,
        )
        .bind(balance_after)
        .bind(now)
        .bind(client_id)
        .bind(client.version)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "client {} changed since version {}",
                client_id, client.version
            )));
        }

        debug!(
            client = %client_id,
            kind = %entry.kind,
            amount = %entry.amount,
            from = %client.balance,
            to = %balance_after,
            seq,
            "Ledger entry applied"
        );

        let mut updated = client;
        updated.balance = balance_after;
        updated.last_transaction_date = Some(now);
        updated.updated_at = now;
        updated.version += 1;
        Ok((updated, written))
    }

    pub async fn list_entries(
        &mut self,
        client_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(SELECT_ENTRIES)
            .bind(client_id)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(entries)
    }

    /// Folds every entry from zero and compares with the cached balance.
    ///
    /// Run it inside one unit so the row and its entries are read from the
    /// same snapshot.
    pub async fn recompute_balance(&mut self, client_id: &str) -> DbResult<BalanceCheck> {
        let client = self.get(client_id).await?;

        // LIMIT -1 means no limit in SQLite
        let entries = sqlx::query_as::<_, LedgerEntry>(SELECT_ENTRIES)
            .bind(client_id)
            .bind(-1i64)
            .bind(0i64)
            .fetch_all(&mut *self.conn)
            .await?;

        let recomputed = ledger::fold_balance(entries.iter().map(|e| (e.entry_type, e.amount)))?;

        Ok(BalanceCheck {
            client_id: client.id,
            cached: client.balance,
            recomputed,
            entries: entries.len(),
        })
    }
}

/// Helper to generate a new client ID.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
