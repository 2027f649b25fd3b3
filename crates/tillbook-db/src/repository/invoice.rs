//! # Invoice Counter
//!
//! One row per period prefix (`INV2507`), bumped with a single upsert so a
//! number is only ever handed out by a committed unit.
//!
//! ```text
//! INSERT INTO invoice_sequences (prefix, last_seq) VALUES ('INV2507', 1)
//! ON CONFLICT (prefix) DO UPDATE SET last_seq = last_seq + 1
//! RETURNING last_seq
//! ```

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Counter operations bound to a unit's connection.
pub struct InvoiceStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> InvoiceStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        InvoiceStore { conn }
    }

    /// Allocates the next sequence for `period_prefix`, starting at 1.
    pub async fn next_sequence(&mut self, period_prefix: &str) -> DbResult<i64> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (prefix, last_seq) VALUES (?1, 1)
            ON CONFLICT (prefix) DO UPDATE SET last_seq = last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(period_prefix)
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(prefix = %period_prefix, seq, "Allocated invoice sequence");
        Ok(seq)
    }

    /// Last sequence handed out for `period_prefix`, 0 if none.
    pub async fn current(&mut self, period_prefix: &str) -> DbResult<i64> {
        let seq: Option<i64> =
            sqlx::query_scalar("SELECT last_seq FROM invoice_sequences WHERE prefix = ?1")
                .bind(period_prefix)
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(seq.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbResult};

    #[tokio::test]
    async fn test_sequences_are_per_prefix() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let seqs: DbResult<(i64, i64, i64, i64)> = db
            .execute(|uow| {
                Box::pin(async move {
                    let a = uow.invoices().next_sequence("INV2507").await?;
                    let b = uow.invoices().next_sequence("INV2507").await?;
                    let c = uow.invoices().next_sequence("INV2508").await?;
                    let current = uow.invoices().current("INV2507").await?;
                    Ok((a, b, c, current))
                })
            })
            .await;

        assert_eq!(seqs.unwrap(), (1, 2, 1, 2));
    }
}
