//! # Event Outbox Repository
//!
//! Durable queue of domain events written after a unit commits.
//!
//! ## The Outbox
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Event Outbox                                         │
//! │                                                                         │
//! │  SalesEngine::create_transaction                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unit of work COMMIT  (transaction, ledger, stock)                     │
//! │       │                                                                 │
//! │       ▼  post-commit, best effort                                       │
//! │  INSERT INTO event_outbox (event_type, aggregate_id, payload)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            PUBLISHER (another process)                          │   │
//! │  │                                                                 │   │
//! │  │  1. get_pending(limit)   WHERE published_at IS NULL            │   │
//! │  │  2. For each entry:                                            │   │
//! │  │     a. Deliver (websocket, webhook, ...)                       │   │
//! │  │     b. On success: mark_published                              │   │
//! │  │     c. On failure: mark_failed (attempts += 1, last_error)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  An enqueue failure is logged by the caller and never undoes the sale. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// One queued event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: String,
    pub branch_id: String,
    /// `transaction_created`, `transaction_updated`, `stock_corrected`, ...
    pub event_type: String,
    /// Id of the transaction / product the event is about.
    pub aggregate_id: String,
    /// JSON body of the event.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Repository for event outbox operations.
#[derive(Debug, Clone)]
pub struct EventOutboxRepository {
    pool: SqlitePool,
}

impl EventOutboxRepository {
    /// Creates a new EventOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventOutboxRepository { pool }
    }

    /// Queues an event for publishing.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&event)?;
    /// repo.enqueue("b-1", "transaction_created", &txn.id, &payload).await?;
    /// ```
    pub async fn enqueue(
        &self,
        branch_id: &str,
        event_type: &str,
        aggregate_id: &str,
        payload: &str,
    ) -> DbResult<OutboxEntry> {
        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.to_string(),
            event_type: event_type.to_string(),
            aggregate_id: aggregate_id.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            published_at: None,
        };

        debug!(
            event_type = %event_type,
            aggregate_id = %aggregate_id,
            "Queuing event"
        );

        sqlx::query(
            r#"
            INSERT INTO event_outbox (
                id, branch_id, event_type, aggregate_id, payload,
                attempts, last_error, created_at, attempted_at, published_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.branch_id)
        .bind(&entry.event_type)
        .bind(&entry.aggregate_id)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.published_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Entries not yet published, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT id, branch_id, event_type, aggregate_id, payload,
                   attempts, last_error, created_at, attempted_at, published_at
            FROM event_outbox
            WHERE published_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn mark_published(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query("UPDATE event_outbox SET published_at = ?2, attempted_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Records a delivery failure.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE event_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_outbox WHERE published_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries published more than `older_than` ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn purge_published(&self, older_than: Duration) -> DbResult<u64> {
        let cutoff = Utc::now() - older_than;

        let result = sqlx::query(
            "DELETE FROM event_outbox WHERE published_at IS NOT NULL AND published_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_publish_cycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.event_outbox();

        let first = outbox
            .enqueue("b-1", "transaction_created", "t-1", r#"{"invoice":"INV25070001"}"#)
            .await
            .unwrap();
        outbox
            .enqueue("b-1", "transaction_updated", "t-1", "{}")
            .await
            .unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        outbox.mark_failed(&first.id, "socket closed").await.unwrap();
        let pending = outbox.get_pending(10).await.unwrap();
        let failed = pending.iter().find(|e| e.id == first.id).unwrap();
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("socket closed"));

        outbox.mark_published(&first.id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        // published a moment ago: not old enough to purge
        assert_eq!(outbox.purge_published(Duration::days(7)).await.unwrap(), 0);
        assert_eq!(outbox.purge_published(Duration::seconds(-60)).await.unwrap(), 1);
    }
}
