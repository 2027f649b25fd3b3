//! # Client Ledger Rules
//!
//! How each transaction type moves a client's running balance.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance 50, PURCHASE 120                                               │
//! │      used = min(max(50, 0), 120) = 50                                   │
//! │      balance → 0           (cash covers the remaining 70)               │
//! │                                                                         │
//! │  balance 0, PICKUP 30                                                   │
//! │      balance → -30         (goods leave now, client owes 30)            │
//! │                                                                         │
//! │  balance -30, PURCHASE 20                                               │
//! │      used = min(max(-30, 0), 20) = 0                                    │
//! │      balance → -30         (paid in full, debt untouched)               │
//! │                                                                         │
//! │  balance -30, DEPOSIT 30                                                │
//! │      balance → 0                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! RETURN credits the client like a DEPOSIT; WHOLESALE draws down credit
//! like a PURCHASE.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::TransactionType;

/// Credit consumed by a purchase-class entry: `min(max(balance, 0), amount)`.
pub fn credit_used(balance: Money, amount: Money) -> Money {
    balance.non_negative().min(amount)
}

/// Applies one ledger entry to a balance and returns the new balance.
///
/// `amount` is the entry's absolute amount and must not be negative. A
/// balance that would leave the decimal range is `InvalidDecimal`.
///
/// ## Example
/// ```rust
/// use tillbook_core::ledger::apply_entry;
/// use tillbook_core::{Money, TransactionType};
///
/// let after = apply_entry(Money::from_major(50), TransactionType::Purchase, Money::from_major(120)).unwrap();
/// assert_eq!(after, Money::ZERO);
///
/// let after = apply_entry(Money::ZERO, TransactionType::Pickup, Money::from_major(30)).unwrap();
/// assert_eq!(after, Money::from_major(-30));
/// ```
pub fn apply_entry(balance: Money, kind: TransactionType, amount: Money) -> CoreResult<Money> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: "ledger amount".to_string(),
        }
        .into());
    }

    match kind {
        TransactionType::Deposit | TransactionType::Return => balance.checked_add(amount),
        TransactionType::Purchase | TransactionType::Wholesale => {
            balance.checked_sub(credit_used(balance, amount))
        }
        TransactionType::Pickup => balance.checked_sub(amount),
    }
}

/// Folds a sequence of entries from a zero balance.
///
/// Used to verify that the cached balance on a client matches its ledger.
pub fn fold_balance<I>(entries: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = (TransactionType, Money)>,
{
    entries
        .into_iter()
        .try_fold(Money::ZERO, |balance, (kind, amount)| {
            apply_entry(balance, kind, amount)
        })
}

/// Cached balance against the fold of the client's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceCheck {
    pub client_id: String,
    pub cached: Money,
    pub recomputed: Money,
    pub entries: usize,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.cached == self.recomputed
    }

    /// `cached - recomputed`; zero when consistent.
    pub fn drift(&self) -> Money {
        self.cached - self.recomputed
    }
}
