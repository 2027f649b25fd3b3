//! Reconciliation scenarios: stock moving between passes, corrections,
//! idempotence.

mod common;

use common::*;
use tillbook_core::reconciliation::StockDiscrepancy;
use tillbook_core::{TransactionType, Unit};
use tillbook_engine::{DomainEvent, ReconciliationEngine};

#[tokio::test]
async fn test_reconcile_after_sales_is_clean_and_repeatable() {
    let db = database(
        &[
            product("p-1", Unit::Piece, "10.00", "10"),
            product("p-2", Unit::Kg, "2.00", "5"),
        ],
        &[client("c-1")],
    )
    .await;
    let engine = sales(&db);
    engine
        .create_transaction(walk_in_sale(vec![line("p-1", Unit::Piece, "4")], "40.00"), &cashier())
        .await
        .unwrap();
    engine
        .create_transaction(
            registered_sale(
                TransactionType::Pickup,
                "c-1",
                vec![line("p-2", Unit::Kg, "1.25")],
                "0",
            ),
            &cashier(),
        )
        .await
        .unwrap();

    let recon = reconciliation(&db);
    let first = recon.reconcile(Some(BRANCH)).await.unwrap();
    assert!(first.is_clean());
    assert_eq!(first.products_checked, 2);
    assert_eq!(first.total_inventory_value, money("67.50"));

    let second = recon.reconcile(Some(BRANCH)).await.unwrap();
    assert!(second.is_clean());
    assert_eq!(second.total_inventory_value, first.total_inventory_value);
}

#[tokio::test]
async fn test_snapshot_counts_completed_sales() {
    let db = database(&[product("p-1", Unit::Piece, "10.00", "10")], &[]).await;
    let engine = sales(&db);
    for _ in 0..3 {
        engine
            .create_transaction(walk_in_sale(vec![line("p-1", Unit::Piece, "2")], "20.00"), &cashier())
            .await
            .unwrap();
    }

    let snapshots = reconciliation(&db).snapshot(None).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].stock, qty("4"));
    assert_eq!(snapshots[0].sold, qty("6"));
    assert!(snapshots[0].last_transaction_date.is_some());
}

#[tokio::test]
async fn test_stock_moved_between_passes_is_reported() {
    let db = database(&[product("p-1", Unit::Piece, "2.50", "10")], &[]).await;
    let recon = reconciliation(&db);

    let snapshots = recon.snapshot(Some(BRANCH)).await.unwrap();
    sales(&db)
        .create_transaction(walk_in_sale(vec![line("p-1", Unit::Piece, "3")], "7.50"), &cashier())
        .await
        .unwrap();

    let report = recon.compare(&snapshots, Some(BRANCH)).await.unwrap();
    assert_eq!(report.discrepancies.len(), 1);
    let d = &report.discrepancies[0];
    assert_eq!(d.expected, qty("10"));
    assert_eq!(d.actual, qty("7"));
    assert_eq!(d.delta, qty("-3"));
    assert_eq!(report.discrepancy_value, money("7.50"));
    assert_eq!(report.total_inventory_value, money("17.50"));
    assert_eq!(report.branch_id.as_deref(), Some(BRANCH));
}

fn discrepancy(product_id: &str, expected: &str, actual: &str) -> StockDiscrepancy {
    StockDiscrepancy {
        product_id: product_id.to_string(),
        product_name: format!("Product {}", product_id),
        branch_id: BRANCH.to_string(),
        unit: Unit::Piece,
        unit_price: money("2.50"),
        expected: qty(expected),
        actual: qty(actual),
        delta: qty(actual) - qty(expected),
        last_transaction_date: None,
    }
}

#[tokio::test]
async fn test_auto_correct_is_idempotent() {
    let db = database(&[product("p-1", Unit::Piece, "2.50", "7")], &[]).await;
    let (sinks, mut received) = channel_sinks();
    let recon = ReconciliationEngine::new(db.clone(), sinks);
    let found = vec![discrepancy("p-1", "10", "7")];

    let first = recon.auto_correct(&found, "Shelf count").await.unwrap();
    assert_eq!(first.corrected, vec!["p-1".to_string()]);
    assert_eq!(stock_of(&db, "p-1").await, qty("10"));

    let stored = db.products().get_by_id("p-1").await.unwrap().unwrap();
    assert_eq!(stored.last_correction_reason.as_deref(), Some("Shelf count"));
    assert!(stored.last_corrected_at.is_some());

    let audit = received.next_audit().await;
    assert_eq!(audit.action, "stock.correct");
    assert_eq!(audit.actor.id, "reconciliation");
    match received.next_event().await {
        DomainEvent::StockCorrected { from, to, .. } => {
            assert_eq!(from, qty("7"));
            assert_eq!(to, qty("10"));
        }
        other => panic!("unexpected event {:?}", other),
    }

    let second = recon.auto_correct(&found, "Shelf count").await.unwrap();
    assert!(second.corrected.is_empty());
    assert_eq!(second.already_correct, vec!["p-1".to_string()]);
    assert_eq!(stock_of(&db, "p-1").await, qty("10"));
}

#[tokio::test]
async fn test_auto_correct_leaves_moved_stock_alone() {
    let db = database(
        &[
            product("p-1", Unit::Piece, "2.50", "5"),
            product("p-2", Unit::Piece, "2.50", "7"),
        ],
        &[],
    )
    .await;
    let recon = reconciliation(&db);

    let outcome = recon
        .auto_correct(
            &[
                discrepancy("p-1", "10", "7"),
                discrepancy("p-2", "10", "7"),
                discrepancy("p-gone", "1", "0"),
            ],
            "Shelf count",
        )
        .await
        .unwrap();

    assert_eq!(outcome.skipped_stale, vec!["p-1".to_string()]);
    assert_eq!(outcome.corrected, vec!["p-2".to_string()]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].product_id, "p-gone");
    assert_eq!(stock_of(&db, "p-1").await, qty("5"));
    assert_eq!(stock_of(&db, "p-2").await, qty("10"));
}
