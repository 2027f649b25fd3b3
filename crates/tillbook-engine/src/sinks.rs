//! # Side-Effect Sinks
//!
//! Domain events and audit entries leave the engine only after the unit of
//! work that produced them has committed.
//!
//! ## Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SalesEngine::create_transaction                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.execute(...)  COMMIT                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sinks::publish(event, audit) ──► tokio::spawn ─┬─► AuditSink::append   │
//! │       │                                         └─► EventSink::emit     │
//! │       ▼                                                                 │
//! │  receipt returned to the caller       failure → warn!, nothing undone   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tillbook_core::{Actor, Money, Quantity, TransactionType};
use tillbook_db::{AuditRecord, Database};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AuditSinkKind, EventSinkKind, SinkSettings};
use crate::error::EngineResult;

// =============================================================================
// Payloads
// =============================================================================

/// Something that happened, for consumers outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TransactionCreated {
        transaction_id: String,
        invoice_number: String,
        transaction_type: TransactionType,
        branch_id: String,
        client_id: Option<String>,
        total: Money,
        amount_paid: Money,
        client_balance: Option<Money>,
    },
    TransactionUpdated {
        transaction_id: String,
        invoice_number: String,
        branch_id: String,
        amount_paid: Money,
        picked_up: bool,
        waybill_number: Option<String>,
    },
    DepositRecorded {
        client_id: String,
        branch_id: String,
        amount: Money,
        balance: Money,
    },
    StockCorrected {
        product_id: String,
        branch_id: String,
        from: Quantity,
        to: Quantity,
        reason: String,
    },
}

impl DomainEvent {
    /// Name stored in `event_outbox.event_type`.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TransactionCreated { .. } => "transaction_created",
            DomainEvent::TransactionUpdated { .. } => "transaction_updated",
            DomainEvent::DepositRecorded { .. } => "deposit_recorded",
            DomainEvent::StockCorrected { .. } => "stock_corrected",
        }
    }

    /// Id of the transaction, client or product the event is about.
    pub fn aggregate_id(&self) -> &str {
        match self {
            DomainEvent::TransactionCreated { transaction_id, .. }
            | DomainEvent::TransactionUpdated { transaction_id, .. } => transaction_id,
            DomainEvent::DepositRecorded { client_id, .. } => client_id,
            DomainEvent::StockCorrected { product_id, .. } => product_id,
        }
    }

    pub fn branch_id(&self) -> &str {
        match self {
            DomainEvent::TransactionCreated { branch_id, .. }
            | DomainEvent::TransactionUpdated { branch_id, .. }
            | DomainEvent::DepositRecorded { branch_id, .. }
            | DomainEvent::StockCorrected { branch_id, .. } => branch_id,
        }
    }
}

/// Who did what to which entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: Actor,
    /// e.g. `transaction.create`, `client.deposit`, `stock.correct`
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: serde_json::Value,
    ) -> Self {
        AuditEntry {
            actor: actor.clone(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details,
            at: Utc::now(),
        }
    }
}

// =============================================================================
// Ports
// =============================================================================

/// Receives domain events after commit.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &DomainEvent) -> EngineResult<()>;
}

/// Receives audit entries after commit.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> EngineResult<()>;
}

// =============================================================================
// Implementations
// =============================================================================

/// Logs events at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: &DomainEvent) -> EngineResult<()> {
        info!(
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            branch = %event.branch_id(),
            "Domain event"
        );
        Ok(())
    }
}

/// Queues events in `event_outbox` for a publisher process.
#[derive(Debug, Clone)]
pub struct OutboxEventSink {
    db: Database,
}

impl OutboxEventSink {
    pub fn new(db: Database) -> Self {
        OutboxEventSink { db }
    }
}

#[async_trait]
impl EventSink for OutboxEventSink {
    async fn emit(&self, event: &DomainEvent) -> EngineResult<()> {
        let payload = serde_json::to_string(event).map_err(tillbook_db::DbError::from)?;
        self.db
            .event_outbox()
            .enqueue(
                event.branch_id(),
                event.event_type(),
                event.aggregate_id(),
                &payload,
            )
            .await?;
        Ok(())
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, _event: &DomainEvent) -> EngineResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AuditSink for NullSink {
    async fn append(&self, _entry: &AuditEntry) -> EngineResult<()> {
        Ok(())
    }
}

/// Logs audit entries at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, entry: &AuditEntry) -> EngineResult<()> {
        info!(
            actor = %entry.actor.id,
            branch = %entry.actor.branch_id,
            action = %entry.action,
            entity = %entry.entity_id,
            details = %entry.details,
            "Audit"
        );
        Ok(())
    }
}

/// Appends to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct DbAuditSink {
    db: Database,
}

impl DbAuditSink {
    pub fn new(db: Database) -> Self {
        DbAuditSink { db }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn append(&self, entry: &AuditEntry) -> EngineResult<()> {
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            actor_id: entry.actor.id.clone(),
            branch_id: entry.actor.branch_id.clone(),
            action: entry.action.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id.clone(),
            details: entry.details.to_string(),
            created_at: entry.at,
        };
        self.db.audit_log().append(&record).await?;
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// The pair of sinks an engine publishes to. Cheap to clone.
#[derive(Clone)]
pub struct Sinks {
    events: Arc<dyn EventSink>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Sinks::new(Arc::new(TracingEventSink), Arc::new(TracingAuditSink))
    }
}

impl Sinks {
    pub fn new(events: Arc<dyn EventSink>, audit: Arc<dyn AuditSink>) -> Self {
        Sinks { events, audit }
    }

    /// Sinks that discard everything.
    pub fn silent() -> Self {
        Sinks::new(Arc::new(NullSink), Arc::new(NullSink))
    }

    /// Builds the sinks named in configuration.
    pub fn from_settings(settings: &SinkSettings, db: &Database) -> Self {
        let events: Arc<dyn EventSink> = match settings.event {
            EventSinkKind::Tracing => Arc::new(TracingEventSink),
            EventSinkKind::Outbox => Arc::new(OutboxEventSink::new(db.clone())),
            EventSinkKind::None => Arc::new(NullSink),
        };
        let audit: Arc<dyn AuditSink> = match settings.audit {
            AuditSinkKind::Tracing => Arc::new(TracingAuditSink),
            AuditSinkKind::Database => Arc::new(DbAuditSink::new(db.clone())),
            AuditSinkKind::None => Arc::new(NullSink),
        };
        Sinks { events, audit }
    }

    /// Hands both payloads to a background task and returns immediately.
    ///
    /// Must be called only after the producing unit has committed.
    pub fn publish(&self, event: DomainEvent, audit: AuditEntry) {
        let events = Arc::clone(&self.events);
        let audit_sink = Arc::clone(&self.audit);

        tokio::spawn(async move {
            if let Err(e) = audit_sink.append(&audit).await {
                warn!(action = %audit.action, entity = %audit.entity_id, error = %e, "Audit append failed");
            }
            if let Err(e) = events.emit(&event).await {
                warn!(
                    event_type = event.event_type(),
                    aggregate_id = %event.aggregate_id(),
                    error = %e,
                    "Event emit failed"
                );
            }
        });
    }
}
