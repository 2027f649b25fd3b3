//! # Sales Engine
//!
//! Sales, returns, deposits and payment top-ups. Every write runs in one
//! unit of work: the transaction row, the client's ledger entry and the
//! stock movements commit together or not at all.
//!
//! ## create_transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.execute(|uow| ...)                                                  │
//! │                                                                         │
//! │  1. customer    client_id XOR walk_in, client active + not suspended    │
//! │  2. lines       product active, unit match, quantity scale, stock       │
//! │  3. totals      subtotal - global discount                              │
//! │  4. payment     exact settlement per payer and type                     │
//! │  5. invoice     INV{YY}{MM}{seq:04} from the counter row                │
//! │  6. ledger      registered: entry of the sale's type for `total`        │
//! │  7. stock       decrement per line, re-checked at write time            │
//! │  COMMIT                                                                 │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 ▼
//!              audit + transaction_created (background, best effort)
//! ```
//!
//! `calculate_transaction` runs steps 1 to 4 through the same code inside a
//! read-only unit, so a preview and the committed sale agree.

use serde_json::json;
use std::collections::HashMap;
use tillbook_core::invoice::{format_invoice_number, period_prefix};
use tillbook_core::ledger::BalanceCheck;
use tillbook_core::pricing::{
    check_client_eligible, check_payment, compute_totals, ensure_sale_type, price_line, quote,
    select_customer, CustomerSelection, Payer, PricingPreview,
};
use tillbook_core::validation::{
    validate_line_count, validate_money, validate_name, validate_positive_money, validate_quantity,
    validate_reason,
};
use tillbook_core::{
    Actor, Client, CoreError, CreateTransactionInput, Customer, LedgerEntry, Money, Quantity,
    ReturnDetails, ReturnInput, Transaction, TransactionItem, TransactionPatch,
    TransactionReceipt, TransactionStatus, TransactionType, ValidationError,
    DEFAULT_INVOICE_PREFIX,
};
use tillbook_db::{Database, NewLedgerEntry, UnitOfWork};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::sinks::{AuditEntry, DomainEvent, Sinks};

/// Largest page `list_client_ledger` hands out.
pub const MAX_LEDGER_PAGE: u32 = 500;

/// Sales transaction engine.
#[derive(Debug, Clone)]
pub struct SalesEngine {
    db: Database,
    sinks: Sinks,
    invoice_prefix: String,
}

impl SalesEngine {
    pub fn new(db: Database, sinks: Sinks) -> Self {
        SalesEngine {
            db,
            sinks,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }

    /// Engine with the sinks and invoice prefix named in `config`.
    pub fn from_config(db: Database, config: &EngineConfig) -> Self {
        let sinks = Sinks::from_settings(&config.sinks, &db);
        SalesEngine::new(db, sinks).with_invoice_prefix(config.invoice_prefix())
    }

    pub fn with_invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.invoice_prefix = prefix.into();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Prices, settles and commits a PURCHASE, PICKUP or WHOLESALE.
    ///
    /// ## Errors
    /// * `InvalidCustomerReference` / `SuspendedClient` - customer side
    /// * `InvalidTransactionType` - DEPOSIT or RETURN requested
    /// * `NotFound`, `UnitMismatch`, `InsufficientStock`, `InvalidDiscount` - lines
    /// * `PaymentMismatch` / `Overpayment` - settlement
    /// * `CommitConflict` - another writer held the lock past the busy timeout
    #[instrument(skip(self, input), fields(actor = %actor.id, branch = %actor.branch_id, kind = %input.transaction_type))]
    pub async fn create_transaction(
        &self,
        input: CreateTransactionInput,
        actor: &Actor,
    ) -> EngineResult<TransactionReceipt> {
        let prefix = self.invoice_prefix.clone();
        let unit_actor = actor.clone();

        let receipt = self
            .db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let (preview, payer) = price_sale(uow, &input).await?;
                    check_payment(payer, preview.transaction_type, preview.total, input.amount_paid)?;

                    let now = uow.now();
                    let invoice_number = allocate_invoice(uow, &prefix).await?;
                    let transaction = Transaction {
                        id: Uuid::new_v4().to_string(),
                        invoice_number,
                        transaction_type: preview.transaction_type,
                        customer: preview.customer,
                        items: preview.items,
                        subtotal: preview.subtotal,
                        discount: preview.discount,
                        total: preview.total,
                        amount_paid: input.amount_paid,
                        status: TransactionStatus::Completed,
                        branch_id: unit_actor.branch_id,
                        created_by: unit_actor.id,
                        waybill_number: clean_optional(input.waybill_number),
                        return_details: None,
                        picked_up_at: None,
                        created_at: now,
                        updated_at: now,
                    };
                    uow.transactions().insert(&transaction).await?;

                    let client_balance = match transaction.customer.client_id() {
                        Some(client_id) => {
                            let description = format!(
                                "{} {}",
                                transaction.transaction_type, transaction.invoice_number
                            );
                            let entry = NewLedgerEntry {
                                kind: transaction.transaction_type,
                                amount: transaction.total,
                                description: &description,
                                reference: Some(&transaction.invoice_number),
                            };
                            let (client, _) =
                                uow.clients().apply_ledger_entry(client_id, entry, now).await?;
                            Some(client.balance)
                        }
                        None => None,
                    };

                    for item in &transaction.items {
                        uow.products()
                            .decrement_stock(&item.product_id, item.quantity, now)
                            .await?;
                    }

                    Ok(TransactionReceipt {
                        transaction,
                        client_balance,
                    })
                })
            })
            .await?;

        let txn = &receipt.transaction;
        info!(
            invoice = %txn.invoice_number,
            total = %txn.total,
            paid = %txn.amount_paid,
            lines = txn.items.len(),
            "Transaction committed"
        );

        self.sinks.publish(
            created_event(&receipt),
            AuditEntry::new(
                actor,
                "transaction.create",
                "transaction",
                &txn.id,
                json!({
                    "invoice_number": txn.invoice_number,
                    "transaction_type": txn.transaction_type,
                    "total": txn.total,
                    "amount_paid": txn.amount_paid,
                    "client_balance": receipt.client_balance,
                }),
            ),
        );

        Ok(receipt)
    }

    /// Dry run of `create_transaction` up to the payment check.
    ///
    /// Nothing is written. A payment the policy would reject does not fail
    /// the preview; it comes back with `payment_accepted = false` next to
    /// the `required_payment`.
    #[instrument(skip(self, input), fields(actor = %actor.id, kind = %input.transaction_type))]
    pub async fn calculate_transaction(
        &self,
        input: CreateTransactionInput,
        actor: &Actor,
    ) -> EngineResult<PricingPreview> {
        self.db
            .inspect::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let (preview, _) = price_sale(uow, &input).await?;
                    Ok(preview)
                })
            })
            .await
    }

    /// Applies a payment top-up, pickup confirmation or waybill number.
    ///
    /// ## Rules
    /// ```text
    /// payment         COMPLETED PICKUP, registered client,
    ///                 0 < payment <= total - amount_paid,
    ///                 books a DEPOSIT entry against the debt
    /// confirm_pickup  PICKUP only, once
    /// waybill_number  any transaction that is not CANCELLED
    /// ```
    #[instrument(skip(self, patch), fields(actor = %actor.id))]
    pub async fn update_transaction(
        &self,
        id: &str,
        patch: TransactionPatch,
        actor: &Actor,
    ) -> EngineResult<TransactionReceipt> {
        if patch.is_empty() {
            return Err(ValidationError::Required {
                field: "patch".to_string(),
            }
            .into());
        }
        if let Some(payment) = patch.payment {
            validate_positive_money("payment", payment)?;
        }
        if let Some(waybill) = &patch.waybill_number {
            validate_name("waybill_number", waybill)?;
        }

        let id = id.to_string();
        let payment = patch.payment;

        let receipt = self
            .db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let mut txn = uow
                        .transactions()
                        .find(&id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Transaction", &id))?;

                    if txn.status == TransactionStatus::Cancelled {
                        return Err(invalid_status(&txn, "be updated").into());
                    }

                    let now = uow.now();
                    let mut client_balance = None;

                    if let Some(payment) = patch.payment {
                        if txn.transaction_type != TransactionType::Pickup {
                            return Err(CoreError::InvalidTransactionType {
                                transaction_type: txn.transaction_type,
                                operation: "payment top-up".to_string(),
                            }
                            .into());
                        }
                        if txn.status != TransactionStatus::Completed {
                            return Err(invalid_status(&txn, "take a payment").into());
                        }
                        let client_id = txn
                            .customer
                            .client_id()
                            .map(str::to_string)
                            .ok_or_else(|| {
                                CoreError::invalid_customer(
                                    "payment top-up requires a registered client",
                                )
                            })?;

                        let outstanding = txn.outstanding();
                        if payment > outstanding {
                            return Err(CoreError::Overpayment {
                                allowed: outstanding,
                                paid: payment,
                            }
                            .into());
                        }

                        txn.amount_paid += payment;
                        let description = format!("Payment on {}", txn.invoice_number);
                        let entry = NewLedgerEntry {
                            kind: TransactionType::Deposit,
                            amount: payment,
                            description: &description,
                            reference: Some(&txn.invoice_number),
                        };
                        let (client, _) =
                            uow.clients().apply_ledger_entry(&client_id, entry, now).await?;
                        client_balance = Some(client.balance);
                    }

                    if patch.confirm_pickup {
                        if txn.transaction_type != TransactionType::Pickup {
                            return Err(CoreError::InvalidTransactionType {
                                transaction_type: txn.transaction_type,
                                operation: "confirm_pickup".to_string(),
                            }
                            .into());
                        }
                        if txn.picked_up_at.is_some() {
                            return Err(CoreError::InvalidTransactionStatus {
                                transaction_id: txn.id.clone(),
                                current_status: "PICKED_UP".to_string(),
                                operation: "confirm pickup again".to_string(),
                            }
                            .into());
                        }
                        txn.picked_up_at = Some(now);
                    }

                    if let Some(waybill) = patch.waybill_number {
                        txn.waybill_number = Some(waybill.trim().to_string());
                    }

                    txn.updated_at = now;
                    uow.transactions().save_progress(&txn).await?;

                    if client_balance.is_none() {
                        if let Some(client_id) = txn.customer.client_id() {
                            client_balance = uow.clients().find(client_id).await?.map(|c| c.balance);
                        }
                    }

                    Ok(TransactionReceipt {
                        transaction: txn,
                        client_balance,
                    })
                })
            })
            .await?;

        let txn = &receipt.transaction;
        info!(
            invoice = %txn.invoice_number,
            paid = %txn.amount_paid,
            picked_up = txn.picked_up_at.is_some(),
            "Transaction updated"
        );

        self.sinks.publish(
            DomainEvent::TransactionUpdated {
                transaction_id: txn.id.clone(),
                invoice_number: txn.invoice_number.clone(),
                branch_id: txn.branch_id.clone(),
                amount_paid: txn.amount_paid,
                picked_up: txn.picked_up_at.is_some(),
                waybill_number: txn.waybill_number.clone(),
            },
            AuditEntry::new(
                actor,
                "transaction.update",
                "transaction",
                &txn.id,
                json!({
                    "invoice_number": txn.invoice_number,
                    "payment": payment,
                    "amount_paid": txn.amount_paid,
                    "picked_up_at": txn.picked_up_at,
                    "waybill_number": txn.waybill_number,
                }),
            ),
        );

        Ok(receipt)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Books goods coming back against a COMPLETED sale.
    ///
    /// Lines are priced from the original snapshots without discount. Stock
    /// goes back on the shelf; a registered client is credited
    /// `actual_amount_returned` through a RETURN ledger entry.
    ///
    /// ## Errors
    /// * `NotFound` - unknown reference transaction
    /// * `InvalidTransactionType` / `InvalidTransactionStatus` - not a completed sale
    /// * `InvalidReturn` - product not on the invoice, more than was sold,
    ///   or an amount above the return's value
    #[instrument(skip(self, input), fields(actor = %actor.id, reference = %input.reference_transaction_id))]
    pub async fn create_return(
        &self,
        input: ReturnInput,
        actor: &Actor,
    ) -> EngineResult<TransactionReceipt> {
        validate_line_count(input.items.len())?;
        validate_reason(&input.reason)?;
        validate_money("actual_amount_returned", input.actual_amount_returned)?;

        let prefix = self.invoice_prefix.clone();
        let unit_actor = actor.clone();

        let receipt = self
            .db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let original = uow
                        .transactions()
                        .find(&input.reference_transaction_id)
                        .await?
                        .ok_or_else(|| {
                            CoreError::not_found("Transaction", &input.reference_transaction_id)
                        })?;

                    if !original.transaction_type.is_stock_out() {
                        return Err(CoreError::InvalidTransactionType {
                            transaction_type: original.transaction_type,
                            operation: "create_return".to_string(),
                        }
                        .into());
                    }
                    if original.status != TransactionStatus::Completed {
                        return Err(invalid_status(&original, "be returned").into());
                    }

                    let returned = uow.transactions().returned_quantities(&original.id).await?;
                    let items = price_return_lines(&original, &input, &returned)?;
                    let totals = compute_totals(&items, Money::ZERO)?;

                    if input.actual_amount_returned > totals.total {
                        return Err(CoreError::InvalidReturn {
                            reason: format!(
                                "actual amount returned {} exceeds the value of the returned goods {}",
                                input.actual_amount_returned, totals.total
                            ),
                        }
                        .into());
                    }

                    let now = uow.now();
                    let invoice_number = allocate_invoice(uow, &prefix).await?;
                    let transaction = Transaction {
                        id: Uuid::new_v4().to_string(),
                        invoice_number,
                        transaction_type: TransactionType::Return,
                        customer: original.customer.clone(),
                        items,
                        subtotal: totals.subtotal,
                        discount: totals.discount,
                        total: totals.total,
                        amount_paid: input.actual_amount_returned,
                        status: TransactionStatus::Completed,
                        branch_id: unit_actor.branch_id,
                        created_by: unit_actor.id,
                        waybill_number: None,
                        return_details: Some(ReturnDetails {
                            reference_transaction_id: original.id.clone(),
                            reason: input.reason.trim().to_string(),
                            actual_amount_returned: input.actual_amount_returned,
                        }),
                        picked_up_at: None,
                        created_at: now,
                        updated_at: now,
                    };
                    uow.transactions().insert(&transaction).await?;

                    for item in &transaction.items {
                        uow.products()
                            .increment_stock(&item.product_id, item.quantity, now)
                            .await?;
                    }

                    let client_balance = match transaction.customer.client_id() {
                        Some(client_id) => {
                            let description = format!(
                                "RETURN {} against {}",
                                transaction.invoice_number, original.invoice_number
                            );
                            let entry = NewLedgerEntry {
                                kind: TransactionType::Return,
                                amount: input.actual_amount_returned,
                                description: &description,
                                reference: Some(&transaction.invoice_number),
                            };
                            let (client, _) =
                                uow.clients().apply_ledger_entry(client_id, entry, now).await?;
                            Some(client.balance)
                        }
                        None => None,
                    };

                    Ok(TransactionReceipt {
                        transaction,
                        client_balance,
                    })
                })
            })
            .await?;

        let txn = &receipt.transaction;
        info!(
            invoice = %txn.invoice_number,
            total = %txn.total,
            refunded = %txn.amount_paid,
            "Return committed"
        );

        self.sinks.publish(
            created_event(&receipt),
            AuditEntry::new(
                actor,
                "transaction.return",
                "transaction",
                &txn.id,
                json!({
                    "invoice_number": txn.invoice_number,
                    "return_details": txn.return_details,
                    "total": txn.total,
                }),
            ),
        );

        Ok(receipt)
    }

    // =========================================================================
    // Client Ledger
    // =========================================================================

    /// Appends a manual DEPOSIT to a client's ledger.
    #[instrument(skip(self, description), fields(actor = %actor.id, amount = %amount))]
    pub async fn record_deposit(
        &self,
        client_id: &str,
        amount: Money,
        description: &str,
        actor: &Actor,
    ) -> EngineResult<Client> {
        validate_positive_money("amount", amount)?;
        let description = match description.trim() {
            "" => "Deposit".to_string(),
            text => text.to_string(),
        };
        let client_id = client_id.to_string();

        let client = self
            .db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let client = uow
                        .clients()
                        .find(&client_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Client", &client_id))?;
                    if !client.is_active {
                        return Err(CoreError::invalid_customer(format!(
                            "client {} is inactive",
                            client.id
                        ))
                        .into());
                    }

                    let now = uow.now();
                    let entry = NewLedgerEntry {
                        kind: TransactionType::Deposit,
                        amount,
                        description: &description,
                        reference: None,
                    };
                    let (client, _) = uow.clients().apply_ledger_entry(&client.id, entry, now).await?;
                    Ok(client)
                })
            })
            .await?;

        info!(client = %client.id, balance = %client.balance, "Deposit recorded");

        self.sinks.publish(
            DomainEvent::DepositRecorded {
                client_id: client.id.clone(),
                branch_id: client.branch_id.clone(),
                amount,
                balance: client.balance,
            },
            AuditEntry::new(
                actor,
                "client.deposit",
                "client",
                &client.id,
                json!({ "amount": amount, "balance": client.balance }),
            ),
        );

        Ok(client)
    }

    /// One page of a client's ledger, oldest first. `limit` is capped at
    /// [`MAX_LEDGER_PAGE`].
    pub async fn list_client_ledger(
        &self,
        client_id: &str,
        limit: u32,
        offset: u32,
    ) -> EngineResult<Vec<LedgerEntry>> {
        if limit == 0 {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: i64::from(MAX_LEDGER_PAGE),
            }
            .into());
        }
        if self.db.clients().get_by_id(client_id).await?.is_none() {
            return Err(CoreError::not_found("Client", client_id).into());
        }

        let entries = self
            .db
            .clients()
            .list_entries(client_id, limit.min(MAX_LEDGER_PAGE), offset)
            .await?;
        Ok(entries)
    }

    /// Refolds the ledger and compares it with the cached balance, both read
    /// in one read-only unit.
    pub async fn verify_client_balance(&self, client_id: &str) -> EngineResult<BalanceCheck> {
        let id = client_id.to_string();
        let check = self
            .db
            .inspect::<_, EngineError, _>(move |uow| {
                Box::pin(async move { Ok(uow.clients().recompute_balance(&id).await?) })
            })
            .await?;
        if !check.is_consistent() {
            warn!(
                client = %client_id,
                cached = %check.cached,
                recomputed = %check.recomputed,
                "Client balance drifted from its ledger"
            );
        }
        Ok(check)
    }

    // =========================================================================
    // Reads & Numbering
    // =========================================================================

    pub async fn get_transaction(&self, id: &str) -> EngineResult<Transaction> {
        self.db
            .transactions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Transaction", id).into())
    }

    /// Allocates the next invoice number in its own unit.
    pub async fn generate_invoice_number(&self) -> EngineResult<String> {
        let prefix = self.invoice_prefix.clone();
        self.db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move { allocate_invoice(uow, &prefix).await })
            })
            .await
    }
}

// =============================================================================
// Unit Helpers
// =============================================================================

/// Next `INV{YY}{MM}{seq:04}` for the unit's clock.
async fn allocate_invoice(uow: &mut UnitOfWork, prefix: &str) -> EngineResult<String> {
    let period = period_prefix(prefix, uow.now());
    let seq = uow.invoices().next_sequence(&period).await?;
    Ok(format_invoice_number(&period, seq))
}

/// Steps 1 to 3 plus the payment verdict, against rows read in `uow`.
async fn price_sale(
    uow: &mut UnitOfWork,
    input: &CreateTransactionInput,
) -> EngineResult<(PricingPreview, Payer)> {
    ensure_sale_type(input.transaction_type)?;
    validate_line_count(input.items.len())?;

    let selection = select_customer(input.client_id.as_deref(), input.walk_in.as_ref())?;
    let (customer, payer) = match selection {
        CustomerSelection::Registered(client_id) => {
            let client = uow.clients().find(client_id).await?.ok_or_else(|| {
                CoreError::invalid_customer(format!("client {} does not exist", client_id))
            })?;
            check_client_eligible(&client)?;
            (
                Customer::Registered {
                    client_id: client.id.clone(),
                },
                Payer::Registered {
                    balance: client.balance,
                },
            )
        }
        CustomerSelection::WalkIn(walk_in) => {
            let mut snapshot = walk_in.clone();
            snapshot.name = snapshot.name.trim().to_string();
            (Customer::WalkIn(snapshot), Payer::WalkIn)
        }
    };

    let mut items = Vec::with_capacity(input.items.len());
    for line in &input.items {
        let product = uow
            .products()
            .find(&line.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;
        items.push(price_line(&product, line)?);
    }

    let preview = quote(
        input.transaction_type,
        customer,
        payer,
        items,
        input.discount,
        input.amount_paid,
    )?;
    Ok((preview, payer))
}

/// Prices returned lines from the original's snapshots.
///
/// Quantities are summed per product across the original's lines, the
/// request's lines and earlier returns.
fn price_return_lines(
    original: &Transaction,
    input: &ReturnInput,
    already_returned: &HashMap<String, Quantity>,
) -> Result<Vec<TransactionItem>, CoreError> {
    let mut sold: HashMap<&str, (Quantity, &TransactionItem)> = HashMap::new();
    for item in &original.items {
        let entry = sold
            .entry(item.product_id.as_str())
            .or_insert((Quantity::ZERO, item));
        entry.0 += item.quantity;
    }

    let mut requested: HashMap<&str, Quantity> = HashMap::new();
    let mut items = Vec::with_capacity(input.items.len());

    for line in &input.items {
        let (sold_qty, snapshot) = sold.get(line.product_id.as_str()).copied().ok_or_else(|| {
            CoreError::InvalidReturn {
                reason: format!(
                    "product {} is not on invoice {}",
                    line.product_id, original.invoice_number
                ),
            }
        })?;
        validate_quantity(line.quantity, snapshot.unit)?;

        let earlier = already_returned
            .get(&line.product_id)
            .copied()
            .unwrap_or(Quantity::ZERO);
        let so_far = requested.entry(line.product_id.as_str()).or_insert(Quantity::ZERO);
        *so_far += line.quantity;

        if earlier + *so_far > sold_qty {
            return Err(CoreError::InvalidReturn {
                reason: format!(
                    "{}: returning {} more exceeds the {} sold ({} already returned)",
                    snapshot.product_name, *so_far, sold_qty, earlier
                ),
            });
        }

        items.push(TransactionItem {
            product_id: snapshot.product_id.clone(),
            product_name: snapshot.product_name.clone(),
            quantity: line.quantity,
            unit: snapshot.unit,
            unit_price: snapshot.unit_price,
            discount: Money::ZERO,
            subtotal: snapshot.unit_price.line_amount(line.quantity),
        });
    }

    Ok(items)
}

fn invalid_status(txn: &Transaction, operation: &str) -> CoreError {
    CoreError::InvalidTransactionStatus {
        transaction_id: txn.id.clone(),
        current_status: txn.status.to_string(),
        operation: operation.to_string(),
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn created_event(receipt: &TransactionReceipt) -> DomainEvent {
    let txn = &receipt.transaction;
    DomainEvent::TransactionCreated {
        transaction_id: txn.id.clone(),
        invoice_number: txn.invoice_number.clone(),
        transaction_type: txn.transaction_type,
        branch_id: txn.branch_id.clone(),
        client_id: txn.customer.client_id().map(str::to_string),
        total: txn.total,
        amount_paid: txn.amount_paid,
        client_balance: receipt.client_balance,
    }
}
