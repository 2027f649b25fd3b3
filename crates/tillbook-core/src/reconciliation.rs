//! # Stock Reconciliation Math
//!
//! Pure half of the reconciliation pass. The engine gathers
//! [`StockSnapshot`]s (pass 1), re-reads stored stock per product (pass 2)
//! and hands both to [`compare`]; the report figures are computed here.
//!
//! ```text
//! pass 1  snapshot   stock, Σ sold qty (COMPLETED stock-out items)
//!                    expected = (stock + sold) - sold
//!                        │
//! pass 2  compare    actual = stock re-read in its own unit
//!                    actual ≠ expected → StockDiscrepancy { delta = actual - expected }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Quantity};
use crate::types::Unit;

/// Pass-1 view of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub product_id: String,
    pub product_name: String,
    pub branch_id: String,
    pub unit: Unit,
    pub unit_price: Money,
    pub stock: Quantity,
    /// Σ quantity on COMPLETED PURCHASE/PICKUP/WHOLESALE items.
    pub sold: Quantity,
    pub last_transaction_date: Option<DateTime<Utc>>,
}

impl StockSnapshot {
    /// Stock reconstructed from the pass-1 reading and sales history.
    pub fn expected(&self) -> Quantity {
        let received = self.stock + self.sold;
        received - self.sold
    }
}

/// A product whose stored stock differs from what history implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockDiscrepancy {
    pub product_id: String,
    pub product_name: String,
    pub branch_id: String,
    pub unit: Unit,
    pub unit_price: Money,
    pub expected: Quantity,
    pub actual: Quantity,
    /// `actual - expected`.
    pub delta: Quantity,
    #[ts(as = "Option<String>")]
    pub last_transaction_date: Option<DateTime<Utc>>,
}

impl StockDiscrepancy {
    /// `round2(|delta| × unit_price)`.
    pub fn value(&self) -> Money {
        self.unit_price.line_amount(self.delta.abs())
    }
}

/// One product the pass could not check, with the error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemFailure {
    pub product_id: String,
    pub error: String,
}

/// Output of a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationReport {
    pub branch_id: Option<String>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub products_checked: usize,
    pub discrepancies: Vec<StockDiscrepancy>,
    /// Σ round2(actual × unit_price) over checked products.
    pub total_inventory_value: Money,
    /// Σ round2(|delta| × unit_price) over discrepancies.
    pub discrepancy_value: Money,
    pub failures: Vec<ItemFailure>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty() && self.failures.is_empty()
    }
}

/// What `auto_correct` did with each discrepancy it was given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AutoCorrectOutcome {
    /// Products whose stock was set to the expected figure.
    pub corrected: Vec<String>,
    /// Products already at the expected figure (nothing written).
    pub already_correct: Vec<String>,
    /// Products whose stock moved since the report; left alone.
    pub skipped_stale: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

/// Compares a pass-1 snapshot with the stock re-read in pass 2.
pub fn compare(snapshot: &StockSnapshot, actual: Quantity) -> Option<StockDiscrepancy> {
    let expected = snapshot.expected();
    if actual == expected {
        return None;
    }
    Some(StockDiscrepancy {
        product_id: snapshot.product_id.clone(),
        product_name: snapshot.product_name.clone(),
        branch_id: snapshot.branch_id.clone(),
        unit: snapshot.unit,
        unit_price: snapshot.unit_price,
        expected,
        actual,
        delta: actual - expected,
        last_transaction_date: snapshot.last_transaction_date,
    })
}

/// What to do with one discrepancy given the stock currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionDecision {
    AlreadyCorrect,
    Stale,
    Apply,
}

/// Decides how `auto_correct` treats one product.
///
/// Checked in order: already at `expected` → no-op; moved away from the
/// reported `actual` → stale; otherwise apply.
pub fn decide_correction(discrepancy: &StockDiscrepancy, current: Quantity) -> CorrectionDecision {
    if current == discrepancy.expected {
        CorrectionDecision::AlreadyCorrect
    } else if current != discrepancy.actual {
        CorrectionDecision::Stale
    } else {
        CorrectionDecision::Apply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn snapshot(stock: &str, sold: &str) -> StockSnapshot {
        StockSnapshot {
            product_id: "p-1".to_string(),
            product_name: "Rope".to_string(),
            branch_id: "b-1".to_string(),
            unit: Unit::Metre,
            unit_price: "1.25".parse().unwrap(),
            stock: q(stock),
            sold: q(sold),
            last_transaction_date: None,
        }
    }

    #[test]
    fn test_expected_is_exact_for_fractional_history() {
        let s = snapshot("12.345", "0.005");
        assert_eq!(s.expected(), q("12.345"));
    }

    #[test]
    fn test_compare_matching_stock_is_clean() {
        assert!(compare(&snapshot("10", "4"), q("10.000")).is_none());
    }

    #[test]
    fn test_compare_reports_delta_and_value() {
        let d = compare(&snapshot("10", "4"), q("7.5")).unwrap();
        assert_eq!(d.expected, q("10"));
        assert_eq!(d.actual, q("7.5"));
        assert_eq!(d.delta, q("-2.5"));
        assert_eq!(d.value(), "3.13".parse::<Money>().unwrap());
    }

    #[test]
    fn test_correction_decisions() {
        let d = compare(&snapshot("10", "0"), q("8")).unwrap();
        assert_eq!(decide_correction(&d, q("8")), CorrectionDecision::Apply);
        assert_eq!(decide_correction(&d, q("10")), CorrectionDecision::AlreadyCorrect);
        assert_eq!(decide_correction(&d, q("6")), CorrectionDecision::Stale);
    }
}
