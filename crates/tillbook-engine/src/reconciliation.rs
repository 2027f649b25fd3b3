//! # Reconciliation Engine
//!
//! Checks stored stock against what sales history implies and, on request,
//! corrects it.
//!
//! ## Passes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  snapshot(branch)                                                       │
//! │     active products + Σ sold per product  ─►  Vec<StockSnapshot>        │
//! │                                                                         │
//! │  compare(snapshots, branch)                                             │
//! │     for each product:  inspect unit ─► re-read stock ─► compare()       │
//! │     one product failing does not stop the pass                          │
//! │                                                                         │
//! │  auto_correct(discrepancies, reason)                                    │
//! │     for each product:  execute unit ─► decide_correction()              │
//! │        AlreadyCorrect  nothing written                                  │
//! │        Stale           stock moved since the report, left alone         │
//! │        Apply           stock := expected, reason stamped on the row     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Running `auto_correct` twice with the same report writes nothing the
//! second time.

use chrono::Utc;
use serde_json::json;
use tillbook_core::reconciliation::{
    compare, decide_correction, AutoCorrectOutcome, CorrectionDecision, ItemFailure,
    ReconciliationReport, StockDiscrepancy, StockSnapshot,
};
use tillbook_core::validation::validate_reason;
use tillbook_core::{Actor, CoreError, Money, Quantity};
use tillbook_db::Database;
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, EngineResult};
use crate::sinks::{AuditEntry, DomainEvent, Sinks};

/// Actor id recorded on corrections made by the reconciliation pass.
pub const RECONCILIATION_ACTOR: &str = "reconciliation";

/// Stock reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    db: Database,
    sinks: Sinks,
}

impl ReconciliationEngine {
    pub fn new(db: Database, sinks: Sinks) -> Self {
        ReconciliationEngine { db, sinks }
    }

    /// Snapshot then compare. `branch_id = None` covers every branch.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, branch_id: Option<&str>) -> EngineResult<ReconciliationReport> {
        let snapshots = self.snapshot(branch_id).await?;
        self.compare(&snapshots, branch_id).await
    }

    /// Pass 1: stored stock and sold totals for every active product.
    pub async fn snapshot(&self, branch_id: Option<&str>) -> EngineResult<Vec<StockSnapshot>> {
        let products = self.db.products().list_for_branch(branch_id).await?;
        let mut sold = self.db.transactions().sold_totals(branch_id).await?;

        let snapshots = products
            .into_iter()
            .map(|product| {
                let totals = sold.remove(&product.id).unwrap_or_default();
                StockSnapshot {
                    product_id: product.id,
                    product_name: product.name,
                    branch_id: product.branch_id,
                    unit: product.unit,
                    unit_price: product.unit_price,
                    stock: product.stock,
                    sold: totals.sold,
                    last_transaction_date: totals.last_transaction_date,
                }
            })
            .collect::<Vec<_>>();

        debug!(products = snapshots.len(), "Stock snapshot taken");
        Ok(snapshots)
    }

    /// Pass 2: re-reads each product's stock in its own unit.
    pub async fn compare(
        &self,
        snapshots: &[StockSnapshot],
        branch_id: Option<&str>,
    ) -> EngineResult<ReconciliationReport> {
        let mut report = ReconciliationReport {
            branch_id: branch_id.map(str::to_string),
            generated_at: Utc::now(),
            products_checked: 0,
            discrepancies: Vec::new(),
            total_inventory_value: Money::ZERO,
            discrepancy_value: Money::ZERO,
            failures: Vec::new(),
        };

        for snapshot in snapshots {
            match self.current_stock(&snapshot.product_id).await {
                Ok(actual) => {
                    report.products_checked += 1;
                    report.total_inventory_value += snapshot.unit_price.line_amount(actual);
                    if let Some(discrepancy) = compare(snapshot, actual) {
                        report.discrepancy_value += discrepancy.value();
                        report.discrepancies.push(discrepancy);
                    }
                }
                Err(e) => {
                    warn!(product = %snapshot.product_id, error = %e, "Reconciliation check failed");
                    report.failures.push(ItemFailure {
                        product_id: snapshot.product_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            checked = report.products_checked,
            discrepancies = report.discrepancies.len(),
            failures = report.failures.len(),
            inventory_value = %report.total_inventory_value,
            discrepancy_value = %report.discrepancy_value,
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Sets each product's stock to its expected figure, one unit per
    /// product. Products whose stock moved since the report are skipped.
    #[instrument(skip(self, discrepancies), fields(count = discrepancies.len()))]
    pub async fn auto_correct(
        &self,
        discrepancies: &[StockDiscrepancy],
        reason: &str,
    ) -> EngineResult<AutoCorrectOutcome> {
        validate_reason(reason)?;
        let reason = reason.trim().to_string();
        let mut outcome = AutoCorrectOutcome::default();

        for discrepancy in discrepancies {
            let product_id = discrepancy.product_id.clone();
            match self.correct_one(discrepancy.clone(), reason.clone()).await {
                Ok((CorrectionDecision::Apply, Some(from))) => {
                    info!(
                        product = %product_id,
                        from = %from,
                        to = %discrepancy.expected,
                        "Stock corrected"
                    );
                    let actor = Actor {
                        id: RECONCILIATION_ACTOR.to_string(),
                        role: "system".to_string(),
                        branch_id: discrepancy.branch_id.clone(),
                    };
                    self.sinks.publish(
                        DomainEvent::StockCorrected {
                            product_id: product_id.clone(),
                            branch_id: discrepancy.branch_id.clone(),
                            from,
                            to: discrepancy.expected,
                            reason: reason.clone(),
                        },
                        AuditEntry::new(
                            &actor,
                            "stock.correct",
                            "product",
                            &product_id,
                            json!({
                                "from": from,
                                "to": discrepancy.expected,
                                "reason": reason,
                            }),
                        ),
                    );
                    outcome.corrected.push(product_id);
                }
                Ok((CorrectionDecision::AlreadyCorrect, _)) => outcome.already_correct.push(product_id),
                Ok((CorrectionDecision::Stale, _)) | Ok((CorrectionDecision::Apply, None)) => {
                    debug!(product = %product_id, "Stock moved since the report, skipping");
                    outcome.skipped_stale.push(product_id);
                }
                Err(e) => {
                    warn!(product = %product_id, error = %e, "Stock correction failed");
                    outcome.failures.push(ItemFailure {
                        product_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    async fn current_stock(&self, product_id: &str) -> EngineResult<Quantity> {
        let product_id = product_id.to_string();
        self.db
            .inspect::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let product = uow
                        .products()
                        .find(&product_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Product", &product_id))?;
                    Ok(product.stock)
                })
            })
            .await
    }

    /// Returns the decision and, when applied, the stock it replaced.
    async fn correct_one(
        &self,
        discrepancy: StockDiscrepancy,
        reason: String,
    ) -> EngineResult<(CorrectionDecision, Option<Quantity>)> {
        self.db
            .execute::<_, EngineError, _>(move |uow| {
                Box::pin(async move {
                    let product = uow
                        .products()
                        .find(&discrepancy.product_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Product", &discrepancy.product_id))?;

                    let decision = decide_correction(&discrepancy, product.stock);
                    if decision != CorrectionDecision::Apply {
                        return Ok((decision, None));
                    }

                    let now = uow.now();
                    uow.products()
                        .correct_stock(&product.id, discrepancy.expected, &reason, now)
                        .await?;
                    Ok((decision, Some(product.stock)))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::{Product, Unit};
    use tillbook_db::DbConfig;

    fn product(id: &str, branch: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            branch_id: branch.to_string(),
            sku: format!("SKU-{}", id),
            name: format!("Product {}", id),
            unit: Unit::Piece,
            unit_price: Money::from_minor(250),
            stock: Quantity::from_int(stock),
            min_stock_level: Quantity::ZERO,
            is_active: true,
            last_correction_reason: None,
            last_corrected_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    async fn engine_with(products: &[Product]) -> ReconciliationEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for p in products {
            db.products().insert(p).await.unwrap();
        }
        ReconciliationEngine::new(db, Sinks::silent())
    }

    #[tokio::test]
    async fn test_untouched_shelf_reconciles_clean() {
        let engine = engine_with(&[product("p-1", "b-1", 4), product("p-2", "b-1", 10)]).await;
        let report = engine.reconcile(Some("b-1")).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.products_checked, 2);
        assert_eq!(report.total_inventory_value, Money::from_minor(3500));
    }

    #[tokio::test]
    async fn test_branch_filter() {
        let engine = engine_with(&[product("p-1", "b-1", 4), product("p-2", "b-2", 10)]).await;
        let snapshots = engine.snapshot(Some("b-2")).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].product_id, "p-2");
    }

    #[tokio::test]
    async fn test_missing_product_is_a_failure_not_an_abort() {
        let engine = engine_with(&[product("p-1", "b-1", 4)]).await;
        let mut snapshots = engine.snapshot(None).await.unwrap();
        let mut ghost = snapshots[0].clone();
        ghost.product_id = "p-gone".to_string();
        snapshots.push(ghost);

        let report = engine.compare(&snapshots, None).await.unwrap();
        assert_eq!(report.products_checked, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id, "p-gone");
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_auto_correct_rejects_blank_reason() {
        let engine = engine_with(&[]).await;
        let err = engine.auto_correct(&[], "   ").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }
}
