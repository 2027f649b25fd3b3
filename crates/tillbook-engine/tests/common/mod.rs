//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tillbook_core::{
    Actor, Client, CreateTransactionInput, LineInput, Money, Product, Quantity, TransactionType,
    Unit, WalkInClient,
};
use tillbook_db::{Database, DbConfig};
use tillbook_engine::{
    AuditEntry, AuditSink, ConfigError, DomainEvent, EngineResult, EventSink, ReconciliationEngine,
    SalesEngine, Sinks,
};
use tokio::sync::mpsc;

pub const BRANCH: &str = "b-1";

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub fn qty(s: &str) -> Quantity {
    s.parse().unwrap()
}

pub fn cashier() -> Actor {
    Actor {
        id: "u-cashier".to_string(),
        role: "cashier".to_string(),
        branch_id: BRANCH.to_string(),
    }
}

pub fn product(id: &str, unit: Unit, price: &str, stock: &str) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        branch_id: BRANCH.to_string(),
        sku: format!("SKU-{}", id),
        name: format!("Product {}", id),
        unit,
        unit_price: money(price),
        stock: qty(stock),
        min_stock_level: Quantity::ZERO,
        is_active: true,
        last_correction_reason: None,
        last_corrected_at: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

pub fn client(id: &str) -> Client {
    let now = Utc::now();
    Client {
        id: id.to_string(),
        branch_id: BRANCH.to_string(),
        name: format!("Client {}", id),
        phone: None,
        address: None,
        balance: Money::ZERO,
        is_active: true,
        is_suspended: false,
        last_transaction_date: None,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

pub fn line(product_id: &str, unit: Unit, quantity: &str) -> LineInput {
    LineInput {
        product_id: product_id.to_string(),
        quantity: qty(quantity),
        unit,
        discount: Money::ZERO,
    }
}

pub fn registered_sale(
    kind: TransactionType,
    client_id: &str,
    items: Vec<LineInput>,
    amount_paid: &str,
) -> CreateTransactionInput {
    CreateTransactionInput {
        transaction_type: kind,
        client_id: Some(client_id.to_string()),
        walk_in: None,
        items,
        discount: Money::ZERO,
        amount_paid: money(amount_paid),
        waybill_number: None,
    }
}

pub fn walk_in_sale(items: Vec<LineInput>, amount_paid: &str) -> CreateTransactionInput {
    CreateTransactionInput {
        transaction_type: TransactionType::Purchase,
        client_id: None,
        walk_in: Some(WalkInClient {
            name: "Walk-in Customer".to_string(),
            phone: None,
            address: None,
        }),
        items,
        discount: Money::ZERO,
        amount_paid: money(amount_paid),
        waybill_number: None,
    }
}

/// In-memory database holding the given rows.
pub async fn database(products: &[Product], clients: &[Client]) -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    for p in products {
        db.products().insert(p).await.unwrap();
    }
    for c in clients {
        db.clients().insert(c).await.unwrap();
    }
    db
}

pub fn sales(db: &Database) -> SalesEngine {
    SalesEngine::new(db.clone(), Sinks::silent())
}

pub fn reconciliation(db: &Database) -> ReconciliationEngine {
    ReconciliationEngine::new(db.clone(), Sinks::silent())
}

pub async fn stock_of(db: &Database, product_id: &str) -> Quantity {
    db.products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

pub async fn balance_of(db: &Database, client_id: &str) -> Money {
    db.clients()
        .get_by_id(client_id)
        .await
        .unwrap()
        .unwrap()
        .balance
}

// =============================================================================
// Sinks
// =============================================================================

/// Forwards everything it receives to channels the test reads.
pub struct ChannelSink {
    events: mpsc::UnboundedSender<DomainEvent>,
    audit: mpsc::UnboundedSender<AuditEntry>,
}

pub struct Received {
    pub events: mpsc::UnboundedReceiver<DomainEvent>,
    pub audit: mpsc::UnboundedReceiver<AuditEntry>,
}

impl Received {
    pub async fn next_event(&mut self) -> DomainEvent {
        tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("event not delivered")
            .expect("event channel closed")
    }

    pub async fn next_audit(&mut self) -> AuditEntry {
        tokio::time::timeout(Duration::from_secs(2), self.audit.recv())
            .await
            .expect("audit entry not delivered")
            .expect("audit channel closed")
    }
}

pub fn channel_sinks() -> (Sinks, Received) {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (audit_tx, audit) = mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink {
        events: events_tx,
        audit: audit_tx,
    });
    (
        Sinks::new(sink.clone(), sink),
        Received { events, audit },
    )
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: &DomainEvent) -> EngineResult<()> {
        let _ = self.events.send(event.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditSink for ChannelSink {
    async fn append(&self, entry: &AuditEntry) -> EngineResult<()> {
        let _ = self.audit.send(entry.clone());
        Ok(())
    }
}

/// Fails every call.
pub struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn emit(&self, _event: &DomainEvent) -> EngineResult<()> {
        Err(ConfigError::Invalid("event sink offline".to_string()).into())
    }
}

#[async_trait]
impl AuditSink for FailingSink {
    async fn append(&self, _entry: &AuditEntry) -> EngineResult<()> {
        Err(ConfigError::Invalid("audit sink offline".to_string()).into())
    }
}
