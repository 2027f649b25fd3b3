//! # Audit Log Repository
//!
//! Append-only record of who did what. Written after commit; a failed
//! append is logged by the caller and never undoes the operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// One audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: String,
    pub actor_id: String,
    pub branch_id: String,
    /// e.g. `transaction.create`, `stock.correct`
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    /// JSON details.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    pub async fn append(&self, record: &AuditRecord) -> DbResult<()> {
        debug!(action = %record.action, entity = %record.entity_id, "Appending audit record");

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, actor_id, branch_id, action, entity_type, entity_id, details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(&record.actor_id)
        .bind(&record.branch_id)
        .bind(&record.action)
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(&record.details)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records about one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, actor_id, branch_id, action, entity_type, entity_id, details, created_at
            FROM audit_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_append_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let record = AuditRecord {
            id: "a-1".to_string(),
            actor_id: "u-1".to_string(),
            branch_id: "b-1".to_string(),
            action: "transaction.create".to_string(),
            entity_type: "transaction".to_string(),
            entity_id: "t-1".to_string(),
            details: r#"{"total":"120.00"}"#.to_string(),
            created_at: Utc::now(),
        };
        db.audit_log().append(&record).await.unwrap();

        let listed = db.audit_log().list_for_entity("transaction", "t-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].action, "transaction.create");
        assert!(db
            .audit_log()
            .list_for_entity("product", "t-1")
            .await
            .unwrap()
            .is_empty());
    }
}
