//! # Domain Types
//!
//! Core domain types used throughout Tillbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │     Client      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  invoice_number │   │  name           │       │
//! │  │  unit           │   │  customer ──────┼──►│  balance (±)    │       │
//! │  │  unit_price     │   │  items[]        │   │  is_suspended   │       │
//! │  │  stock (≥ 0)    │   │  total          │   │  version        │       │
//! │  │  version        │   │  amount_paid    │   └────────┬────────┘       │
//! │  └─────────────────┘   └─────────────────┘            │                │
//! │                                                        ▼                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Unit       │   │TransactionType  │   │  LedgerEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  piece, bag...  │   │  DEPOSIT        │   │  seq            │       │
//! │  │  (whole)        │   │  PURCHASE       │   │  entry_type     │       │
//! │  │  kg, litre...   │   │  PICKUP         │   │  amount         │       │
//! │  │  (≤ 3 places)   │   │  RETURN         │   │  balance_after  │       │
//! │  └─────────────────┘   │  WHOLESALE      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::{Money, Quantity};
use crate::MAX_QUANTITY_SCALE;

// =============================================================================
// Unit
// =============================================================================

/// The unit a product is stocked and sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Piece,
    Pack,
    Carton,
    Bag,
    Dozen,
    Kg,
    Gram,
    Litre,
    Metre,
}

impl Unit {
    /// Piece-like units are counted, never measured.
    pub const fn is_piece_like(&self) -> bool {
        matches!(
            self,
            Unit::Piece | Unit::Pack | Unit::Carton | Unit::Bag | Unit::Dozen
        )
    }

    /// Decimal places a quantity in this unit may carry.
    pub const fn max_quantity_places(&self) -> u32 {
        if self.is_piece_like() {
            0
        } else {
            MAX_QUANTITY_SCALE
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "piece",
            Unit::Pack => "pack",
            Unit::Carton => "carton",
            Unit::Bag => "bag",
            Unit::Dozen => "dozen",
            Unit::Kg => "kg",
            Unit::Gram => "gram",
            Unit::Litre => "litre",
            Unit::Metre => "metre",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "piece" => Unit::Piece,
            "pack" => Unit::Pack,
            "carton" => Unit::Carton,
            "bag" => Unit::Bag,
            "dozen" => Unit::Dozen,
            "kg" => Unit::Kg,
            "gram" => Unit::Gram,
            "litre" => Unit::Litre,
            "metre" => Unit::Metre,
            other => {
                return Err(ValidationError::InvalidFormat {
                    field: "unit".to_string(),
                    reason: format!("unknown unit '{}'", other),
                }
                .into())
            }
        };
        Ok(unit)
    }
}

// =============================================================================
// Transaction Type & Status
// =============================================================================

/// What a transaction does to stock and to the client ledger.
///
/// ```text
/// ┌────────────┬──────────────┬──────────────────────────────────────────┐
/// │ Type       │ Stock        │ Client balance                           │
/// ├────────────┼──────────────┼──────────────────────────────────────────┤
/// │ DEPOSIT    │ -            │ += amount                                │
/// │ PURCHASE   │ -= qty       │ -= min(max(balance, 0), amount)          │
/// │ PICKUP     │ -= qty       │ -= amount (may go negative)              │
/// │ RETURN     │ += qty       │ += amount                                │
/// │ WHOLESALE  │ -= qty       │ same as PURCHASE                         │
/// └────────────┴──────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Purchase,
    Pickup,
    Return,
    Wholesale,
}

impl TransactionType {
    /// Types whose items take stock out of the shop.
    pub const fn is_stock_out(&self) -> bool {
        matches!(
            self,
            TransactionType::Purchase | TransactionType::Pickup | TransactionType::Wholesale
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Purchase => "PURCHASE",
            TransactionType::Pickup => "PICKUP",
            TransactionType::Return => "RETURN",
            TransactionType::Wholesale => "WHOLESALE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a transaction. The engine only ever writes COMPLETED;
/// PENDING and CANCELLED exist for records created by other tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product held in a branch's stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Branch whose shelf this stock sits on.
    pub branch_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, copied onto every line that sells it.
    pub name: String,

    pub unit: Unit,

    pub unit_price: Money,

    /// Current stock, never negative in a committed state.
    pub stock: Quantity,

    /// Reorder threshold.
    pub min_stock_level: Quantity,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// Reason given by the last reconciliation correction, if any.
    pub last_correction_reason: Option<String>,

    #[ts(as = "Option<String>")]
    pub last_corrected_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped on every stock write.
    pub version: i64,
}

impl Product {
    /// Checks if the shelf covers `quantity`.
    pub fn can_sell(&self, quantity: Quantity) -> bool {
        self.stock >= quantity
    }

    pub fn is_below_min_stock(&self) -> bool {
        self.stock < self.min_stock_level
    }

    /// `round2(stock × unit_price)`.
    pub fn stock_value(&self) -> Money {
        self.unit_price.line_amount(self.stock)
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered client with a running balance.
///
/// ## Balance Sign
/// ```text
///   balance > 0  → credit the shop owes the client (prepaid deposit)
///   balance = 0  → settled
///   balance < 0  → debt the client owes the shop (goods picked up unpaid)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Cached fold of the client's ledger entries.
    pub balance: Money,
    pub is_active: bool,
    pub is_suspended: bool,
    #[ts(as = "Option<String>")]
    pub last_transaction_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Client {
    /// Spendable credit: `max(balance, 0)`.
    #[inline]
    pub fn credit(&self) -> Money {
        self.balance.non_negative()
    }

    /// Outstanding debt as a positive amount (zero when in credit).
    #[inline]
    pub fn debt(&self) -> Money {
        (-self.balance).non_negative()
    }
}

/// One append-only line of a client's ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub client_id: String,
    /// 1-based position in the client's ledger.
    pub seq: i64,
    pub entry_type: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub description: String,
    /// Invoice number or other external reference.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// Snapshot of an unregistered customer, embedded in the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WalkInClient {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Exactly one of a registered client or a walk-in snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Customer {
    Registered { client_id: String },
    WalkIn(WalkInClient),
}

impl Customer {
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Customer::Registered { client_id } => Some(client_id),
            Customer::WalkIn(_) => None,
        }
    }

    pub fn is_walk_in(&self) -> bool {
        matches!(self, Customer::WalkIn(_))
    }
}

/// A priced line, frozen at the time of sale.
///
/// `subtotal = round2(quantity × unit_price) - discount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: Quantity,
    pub unit: Unit,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    pub discount: Money,
    pub subtotal: Money,
}

/// Extra fields carried by RETURN transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnDetails {
    pub reference_transaction_id: String,
    pub reason: String,
    /// What was actually handed back (cash or credit).
    pub actual_amount_returned: Money,
}

/// A sales transaction with its item snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub invoice_number: String,
    pub transaction_type: TransactionType,
    pub customer: Customer,
    pub items: Vec<TransactionItem>,
    pub subtotal: Money,
    /// Transaction-level discount applied after line discounts.
    pub discount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub status: TransactionStatus,
    pub branch_id: String,
    /// Actor id.
    pub created_by: String,
    pub waybill_number: Option<String>,
    pub return_details: Option<ReturnDetails>,
    #[ts(as = "Option<String>")]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// `total - amount_paid`.
    pub fn outstanding(&self) -> Money {
        self.total - self.amount_paid
    }
}

/// What create/update/return operations hand back.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    /// Client balance after commit (registered clients only).
    pub client_balance: Option<Money>,
}

// =============================================================================
// Identity
// =============================================================================

/// Who is calling. Supplied per call by the session layer and trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: String,
    pub branch_id: String,
}

// =============================================================================
// Inputs
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    pub product_id: String,
    pub quantity: Quantity,
    pub unit: Unit,
    #[serde(default)]
    pub discount: Money,
}

/// Request to create (or dry-run) a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateTransactionInput {
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub walk_in: Option<WalkInClient>,
    pub items: Vec<LineInput>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub waybill_number: Option<String>,
}

/// Changes allowed on a committed transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionPatch {
    /// Top-up payment against a PICKUP debt.
    #[serde(default)]
    pub payment: Option<Money>,
    #[serde(default)]
    pub confirm_pickup: bool,
    #[serde(default)]
    pub waybill_number: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.payment.is_none() && !self.confirm_pickup && self.waybill_number.is_none()
    }
}

/// One returned line, matched to the original by product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnLineInput {
    pub product_id: String,
    pub quantity: Quantity,
}

/// Request to book goods coming back against an earlier sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnInput {
    pub reference_transaction_id: String,
    pub items: Vec<ReturnLineInput>,
    pub reason: String,
    pub actual_amount_returned: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
