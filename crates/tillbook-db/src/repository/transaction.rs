//! # Transaction Repository
//!
//! Sales transactions and their item snapshots.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Transaction Lifecycle                             │
//! │                                                                         │
//! │  1. INSERT (inside the sale's unit)                                    │
//! │     └── insert() → header row + one row per item, status COMPLETED     │
//! │                                                                         │
//! │  2. (PICKUP only) TOP-UP / CONFIRM                                     │
//! │     └── save_progress() → amount_paid, picked_up_at, waybill_number    │
//! │                                                                         │
//! │  3. (OPTIONAL) RETURN                                                  │
//! │     └── a new RETURN transaction whose reference_transaction_id        │
//! │         points here; returned_quantities() sums what came back        │
//! │                                                                         │
//! │  Rows are never deleted. Items never change after insert.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tillbook_core::{
    Customer, Money, Quantity, ReturnDetails, Transaction, TransactionItem, TransactionStatus,
    TransactionType, WalkInClient,
};

const SELECT_TRANSACTION: &str = r#"
    SELECT id, invoice_number, transaction_type, client_id,
           walk_in_name, walk_in_phone, walk_in_address,
           subtotal, discount, total, amount_paid, status, branch_id, created_by,
           waybill_number, reference_transaction_id, return_reason, actual_amount_returned,
           picked_up_at, created_at, updated_at
    FROM transactions
"#;

/// Header row as stored; the customer and return columns are flattened.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    invoice_number: String,
    transaction_type: TransactionType,
    client_id: Option<String>,
    walk_in_name: Option<String>,
    walk_in_phone: Option<String>,
    walk_in_address: Option<String>,
    subtotal: Money,
    discount: Money,
    total: Money,
    amount_paid: Money,
    status: TransactionStatus,
    branch_id: String,
    created_by: String,
    waybill_number: Option<String>,
    reference_transaction_id: Option<String>,
    return_reason: Option<String>,
    actual_amount_returned: Option<Money>,
    picked_up_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self, items: Vec<TransactionItem>) -> DbResult<Transaction> {
        let customer = match (self.client_id, self.walk_in_name) {
            (Some(client_id), None) => Customer::Registered { client_id },
            (None, Some(name)) => Customer::WalkIn(WalkInClient {
                name,
                phone: self.walk_in_phone,
                address: self.walk_in_address,
            }),
            _ => {
                return Err(DbError::CorruptValue {
                    column: "transactions.client_id".to_string(),
                    reason: format!("transaction {} has no single customer", self.id),
                })
            }
        };

        let return_details = match self.reference_transaction_id {
            None => None,
            Some(reference_transaction_id) => Some(ReturnDetails {
                reference_transaction_id,
                reason: self.return_reason.unwrap_or_default(),
                actual_amount_returned: self.actual_amount_returned.unwrap_or(Money::ZERO),
            }),
        };

        Ok(Transaction {
            id: self.id,
            invoice_number: self.invoice_number,
            transaction_type: self.transaction_type,
            customer,
            items,
            subtotal: self.subtotal,
            discount: self.discount,
            total: self.total,
            amount_paid: self.amount_paid,
            status: self.status,
            branch_id: self.branch_id,
            created_by: self.created_by,
            waybill_number: self.waybill_number,
            return_details,
            picked_up_at: self.picked_up_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Stock-out history of one product, as seen by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoldTotals {
    /// Σ quantity on COMPLETED PURCHASE/PICKUP/WHOLESALE items.
    pub sold: Quantity,
    pub last_transaction_date: Option<DateTime<Utc>>,
}

impl Default for SoldTotals {
    fn default() -> Self {
        SoldTotals {
            sold: Quantity::ZERO,
            last_transaction_date: None,
        }
    }
}

// =============================================================================
// Pool-level repository
// =============================================================================

/// Repository for transaction reads.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        TransactionStore::new(&mut conn).find(id).await
    }

    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        TransactionStore::new(&mut conn)
            .find_by_invoice(invoice_number)
            .await
    }

    /// Per-product stock-out totals over COMPLETED sales, optionally for
    /// one branch's products.
    pub async fn sold_totals(
        &self,
        branch_id: Option<&str>,
    ) -> DbResult<HashMap<String, SoldTotals>> {
        let rows: Vec<(String, Quantity, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT i.product_id, i.quantity, t.created_at
            FROM transaction_items i
            INNER JOIN transactions t ON t.id = i.transaction_id
            INNER JOIN products p ON p.id = i.product_id
            WHERE t.status = 'COMPLETED'
              AND t.transaction_type IN ('PURCHASE', 'PICKUP', 'WHOLESALE')
              AND (?1 IS NULL OR p.branch_id = ?1)
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        let mut totals: HashMap<String, SoldTotals> = HashMap::new();
        for (product_id, quantity, created_at) in rows {
            let entry = totals.entry(product_id).or_default();
            entry.sold += quantity;
            entry.last_transaction_date = match entry.last_transaction_date {
                Some(latest) if latest >= created_at => Some(latest),
                _ => Some(created_at),
            };
        }

        debug!(products = totals.len(), branch = ?branch_id, "Summed sold quantities");
        Ok(totals)
    }
}

// =============================================================================
// Unit-scoped store
// =============================================================================

/// Transaction operations bound to one connection, usually a unit of work's.
pub struct TransactionStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TransactionStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        TransactionStore { conn }
    }

    /// Inserts the header and its items.
    ///
    /// ## Errors
    /// * `UniqueViolation` - invoice number already used
    /// * `ForeignKeyViolation` - unknown client, product or referenced transaction
    pub async fn insert(&mut self, txn: &Transaction) -> DbResult<()> {
        debug!(
            id = %txn.id,
            invoice = %txn.invoice_number,
            kind = %txn.transaction_type,
            items = txn.items.len(),
            "Inserting transaction"
        );

        let (client_id, walk_in) = match &txn.customer {
            Customer::Registered { client_id } => (Some(client_id.as_str()), None),
            Customer::WalkIn(w) => (None, Some(w)),
        };
        let ret = txn.return_details.as_ref();

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, invoice_number, transaction_type, client_id,
                walk_in_name, walk_in_phone, walk_in_address,
                subtotal, discount, total, amount_paid, status, branch_id, created_by,
                waybill_number, reference_transaction_id, return_reason, actual_amount_returned,
                picked_up_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18,
                ?19, ?20, ?21
            )
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.invoice_number)
        .bind(txn.transaction_type)
        .bind(client_id)
        .bind(walk_in.map(|w| w.name.as_str()))
        .bind(walk_in.and_then(|w| w.phone.as_deref()))
        .bind(walk_in.and_then(|w| w.address.as_deref()))
        .bind(txn.subtotal)
        .bind(txn.discount)
        .bind(txn.total)
        .bind(txn.amount_paid)
        .bind(txn.status)
        .bind(&txn.branch_id)
        .bind(&txn.created_by)
        .bind(&txn.waybill_number)
        .bind(ret.map(|r| r.reference_transaction_id.as_str()))
        .bind(ret.map(|r| r.reason.as_str()))
        .bind(ret.map(|r| r.actual_amount_returned))
        .bind(txn.picked_up_at)
        .bind(txn.created_at)
        .bind(txn.updated_at)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("invoice_number") => {
                DbError::duplicate("invoice_number", &txn.invoice_number)
            }
            other => other,
        })?;

        for (line_no, item) in txn.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, line_no, product_id, product_name,
                    quantity, unit, unit_price, discount, subtotal
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&txn.id)
            .bind(line_no as i64 + 1)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit)
            .bind(item.unit_price)
            .bind(item.discount)
            .bind(item.subtotal)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }

    pub async fn find(&mut self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("{} WHERE id = ?1", SELECT_TRANSACTION);
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get(&mut self, id: &str) -> DbResult<Transaction> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    pub async fn find_by_invoice(&mut self, invoice_number: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("{} WHERE invoice_number = ?1", SELECT_TRANSACTION);
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(invoice_number)
            .fetch_optional(&mut *self.conn)
            .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn hydrate(&mut self, row: TransactionRow) -> DbResult<Transaction> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT product_id, product_name, quantity, unit, unit_price, discount, subtotal
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(&row.id)
        .fetch_all(&mut *self.conn)
        .await?;

        row.into_transaction(items)
    }

    /// Writes the fields a patch may touch. Everything else is frozen.
    pub async fn save_progress(&mut self, txn: &Transaction) -> DbResult<()> {
        debug!(id = %txn.id, amount_paid = %txn.amount_paid, "Saving transaction progress");

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET amount_paid = ?1, picked_up_at = ?2, waybill_number = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(txn.amount_paid)
        .bind(txn.picked_up_at)
        .bind(&txn.waybill_number)
        .bind(txn.updated_at)
        .bind(&txn.id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", &txn.id));
        }
        Ok(())
    }

    /// Quantities already returned against `reference_id`, per product.
    pub async fn returned_quantities(
        &mut self,
        reference_id: &str,
    ) -> DbResult<HashMap<String, Quantity>> {
        let rows: Vec<(String, Quantity)> = sqlx::query_as(
            r#"
            SELECT i.product_id, i.quantity
            FROM transaction_items i
            INNER JOIN transactions t ON t.id = i.transaction_id
            WHERE t.reference_transaction_id = ?1
              AND t.transaction_type = 'RETURN'
              AND t.status = 'COMPLETED'
            "#,
        )
        .bind(reference_id)
        .fetch_all(&mut *self.conn)
        .await?;

        let mut returned: HashMap<String, Quantity> = HashMap::new();
        for (product_id, quantity) in rows {
            *returned.entry(product_id).or_default() += quantity;
        }
        Ok(returned)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tillbook_core::{Client, Product, Unit};

    async fn seed(db: &Database) -> (Product, Client) {
        let now = Utc::now();
        let product = Product {
            id: "p-1".to_string(),
            branch_id: "b-1".to_string(),
            sku: "CEMENT".to_string(),
            name: "Cement 50kg".to_string(),
            unit: Unit::Bag,
            unit_price: "4500.00".parse().unwrap(),
            stock: Quantity::from_int(40),
            min_stock_level: Quantity::ZERO,
            is_active: true,
            last_correction_reason: None,
            last_corrected_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        let client = Client {
            id: "c-1".to_string(),
            branch_id: "b-1".to_string(),
            name: "Ade".to_string(),
            phone: None,
            address: None,
            balance: Money::ZERO,
            is_active: true,
            is_suspended: false,
            last_transaction_date: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        db.products().insert(&product).await.unwrap();
        db.clients().insert(&client).await.unwrap();
        (product, client)
    }

    fn sale(id: &str, invoice: &str, kind: TransactionType, customer: Customer, qty: i64) -> Transaction {
        let now = Utc::now();
        let unit_price: Money = "4500.00".parse().unwrap();
        let subtotal = unit_price.line_amount(Quantity::from_int(qty));
        Transaction {
            id: id.to_string(),
            invoice_number: invoice.to_string(),
            transaction_type: kind,
            customer,
            items: vec![TransactionItem {
                product_id: "p-1".to_string(),
                product_name: "Cement 50kg".to_string(),
                quantity: Quantity::from_int(qty),
                unit: Unit::Bag,
                unit_price,
                discount: Money::ZERO,
                subtotal,
            }],
            subtotal,
            discount: Money::ZERO,
            total: subtotal,
            amount_paid: subtotal,
            status: TransactionStatus::Completed,
            branch_id: "b-1".to_string(),
            created_by: "u-1".to_string(),
            waybill_number: None,
            return_details: None,
            picked_up_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert(db: &Database, txn: Transaction) {
        db.execute(|uow| Box::pin(async move { uow.transactions().insert(&txn).await }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_walk_in_round_trip_keeps_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;

        let walk_in = Customer::WalkIn(WalkInClient {
            name: "Ngozi".to_string(),
            phone: Some("0803".to_string()),
            address: None,
        });
        insert(&db, sale("t-1", "INV25070001", TransactionType::Purchase, walk_in.clone(), 2)).await;

        let loaded = db.transactions().get_by_invoice("INV25070001").await.unwrap().unwrap();
        assert_eq!(loaded.customer, walk_in);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].subtotal, "9000.00".parse::<Money>().unwrap());
        assert_eq!(loaded.status, TransactionStatus::Completed);
        assert!(loaded.return_details.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_invoice_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        let customer = Customer::Registered { client_id: "c-1".to_string() };
        insert(&db, sale("t-1", "INV25070001", TransactionType::Pickup, customer.clone(), 1)).await;

        let dup = sale("t-2", "INV25070001", TransactionType::Pickup, customer, 1);
        let err = db
            .execute(|uow| Box::pin(async move { uow.transactions().insert(&dup).await }))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "invoice_number"));
    }

    #[tokio::test]
    async fn test_returns_and_sold_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        let customer = Customer::Registered { client_id: "c-1".to_string() };
        insert(&db, sale("t-1", "INV25070001", TransactionType::Purchase, customer.clone(), 5)).await;
        insert(&db, sale("t-2", "INV25070002", TransactionType::Wholesale, customer.clone(), 3)).await;

        let mut ret = sale("t-3", "INV25070003", TransactionType::Return, customer, 2);
        ret.return_details = Some(ReturnDetails {
            reference_transaction_id: "t-1".to_string(),
            reason: "damaged".to_string(),
            actual_amount_returned: "9000.00".parse().unwrap(),
        });
        insert(&db, ret).await;

        let returned = db
            .execute(|uow| {
                Box::pin(async move { uow.transactions().returned_quantities("t-1").await })
            })
            .await
            .unwrap();
        assert_eq!(returned.get("p-1"), Some(&Quantity::from_int(2)));

        let totals = db.transactions().sold_totals(Some("b-1")).await.unwrap();
        assert_eq!(totals["p-1"].sold, Quantity::from_int(8));
        assert!(totals["p-1"].last_transaction_date.is_some());
        assert!(db.transactions().sold_totals(Some("b-9")).await.unwrap().is_empty());

        let loaded = db.transactions().get_by_id("t-3").await.unwrap().unwrap();
        let details = loaded.return_details.unwrap();
        assert_eq!(details.reason, "damaged");
    }

    #[tokio::test]
    async fn test_save_progress_only_touches_mutable_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        let customer = Customer::Registered { client_id: "c-1".to_string() };
        let mut txn = sale("t-1", "INV25070001", TransactionType::Pickup, customer, 1);
        txn.amount_paid = Money::ZERO;
        insert(&db, txn.clone()).await;

        txn.amount_paid = "1000.00".parse().unwrap();
        txn.picked_up_at = Some(Utc::now());
        txn.waybill_number = Some("WB-9".to_string());
        txn.total = Money::ZERO; // frozen column, must not be written
        let patched = txn.clone();
        db.execute(|uow| Box::pin(async move { uow.transactions().save_progress(&patched).await }))
            .await
            .unwrap();

        let loaded = db.transactions().get_by_id("t-1").await.unwrap().unwrap();
        assert_eq!(loaded.amount_paid, "1000.00".parse::<Money>().unwrap());
        assert_eq!(loaded.waybill_number.as_deref(), Some("WB-9"));
        assert!(loaded.picked_up_at.is_some());
        assert_eq!(loaded.total, "4500.00".parse::<Money>().unwrap());
    }
}
