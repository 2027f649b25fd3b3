//! # Pricing & Payment Policy
//!
//! Pure pricing of a sale: customer selection, line pricing, totals and the
//! exact-settlement payment rules. Both `create_transaction` and the dry-run
//! `calculate_transaction` go through these functions, so a preview and the
//! committed transaction always agree.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select_customer(client_id?, walk_in?)                                  │
//! │       │   exactly one, non-blank                                        │
//! │       ▼                                                                 │
//! │  check_client_eligible(&Client)      (registered only)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_line(&Product, &LineInput)  × N                                  │
//! │       │   unit match, quantity scale, stock, line discount              │
//! │       ▼                                                                 │
//! │  quote(...) → PricingPreview                                            │
//! │       │   subtotal, global discount, total, required payment            │
//! │       ▼                                                                 │
//! │  check_payment(payer, type, total, amount_paid)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::money::Money;
use crate::types::{Client, Customer, LineInput, Product, TransactionItem, TransactionType, WalkInClient};
use crate::validation::{validate_money, validate_name, validate_quantity};

// =============================================================================
// Customer
// =============================================================================

/// The customer side of a request after the exactly-one check.
#[derive(Debug, Clone, Copy)]
pub enum CustomerSelection<'a> {
    Registered(&'a str),
    WalkIn(&'a WalkInClient),
}

/// Enforces exactly one of `client_id` or `walk_in`, with a non-blank value.
pub fn select_customer<'a>(
    client_id: Option<&'a str>,
    walk_in: Option<&'a WalkInClient>,
) -> CoreResult<CustomerSelection<'a>> {
    match (client_id, walk_in) {
        (Some(_), Some(_)) => Err(CoreError::invalid_customer(
            "provide either client_id or walk_in, not both",
        )),
        (None, None) => Err(CoreError::invalid_customer(
            "either client_id or walk_in is required",
        )),
        (Some(id), None) => {
            if id.trim().is_empty() {
                return Err(CoreError::invalid_customer("client_id is blank"));
            }
            Ok(CustomerSelection::Registered(id))
        }
        (None, Some(walk_in)) => {
            validate_name("walk_in.name", &walk_in.name)
                .map_err(|e| CoreError::invalid_customer(e.to_string()))?;
            Ok(CustomerSelection::WalkIn(walk_in))
        }
    }
}

/// A registered client may buy only while active and not suspended.
pub fn check_client_eligible(client: &Client) -> CoreResult<()> {
    if !client.is_active {
        return Err(CoreError::invalid_customer(format!(
            "client {} is inactive",
            client.id
        )));
    }
    if client.is_suspended {
        return Err(CoreError::SuspendedClient {
            client_id: client.id.clone(),
        });
    }
    Ok(())
}

/// `create_transaction` books sales only; deposits and returns have their
/// own operations.
pub fn ensure_sale_type(kind: TransactionType) -> CoreResult<()> {
    if kind.is_stock_out() {
        Ok(())
    } else {
        Err(CoreError::InvalidTransactionType {
            transaction_type: kind,
            operation: "create_transaction".to_string(),
        })
    }
}

// =============================================================================
// Lines & Totals
// =============================================================================

/// Prices one requested line against a product snapshot.
///
/// ## Example
/// ```rust
/// # use chrono::Utc;
/// use tillbook_core::pricing::price_line;
/// use tillbook_core::{LineInput, Money, Product, Quantity, Unit};
///
/// # let now = Utc::now();
/// let nails = Product {
///     id: "p-1".into(), branch_id: "b-1".into(), sku: "NAIL-2IN".into(),
///     name: "Nails 2in".into(), unit: Unit::Kg, unit_price: "3.35".parse().unwrap(),
///     stock: Quantity::from_int(40), min_stock_level: Quantity::ZERO, is_active: true,
///     last_correction_reason: None, last_corrected_at: None,
///     created_at: now, updated_at: now, version: 1,
/// };
/// let line = LineInput {
///     product_id: "p-1".into(), quantity: "2.5".parse().unwrap(),
///     unit: Unit::Kg, discount: Money::ZERO,
/// };
/// let item = price_line(&nails, &line).unwrap();
/// assert_eq!(item.subtotal.to_string(), "8.38");
/// ```
pub fn price_line(product: &Product, line: &LineInput) -> CoreResult<TransactionItem> {
    if !product.is_active {
        return Err(CoreError::not_found("Product", &product.id));
    }

    if line.unit != product.unit {
        return Err(CoreError::UnitMismatch {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            expected: product.unit,
            requested: line.unit,
        });
    }

    validate_quantity(line.quantity, product.unit)?;
    validate_money("discount", line.discount)?;

    if !product.can_sell(line.quantity) {
        return Err(CoreError::InsufficientStock {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            available: product.stock,
            requested: line.quantity,
        });
    }

    let gross = product.unit_price.line_amount(line.quantity);
    if line.discount > gross {
        return Err(CoreError::InvalidDiscount {
            context: format!("line {}", product.name),
            amount: gross,
            discount: line.discount,
        });
    }

    Ok(TransactionItem {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity: line.quantity,
        unit: product.unit,
        unit_price: product.unit_price,
        discount: line.discount,
        subtotal: gross - line.discount,
    })
}

/// Transaction-level figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// `subtotal = Σ line subtotals`, `total = subtotal - discount`.
pub fn compute_totals(items: &[TransactionItem], discount: Money) -> CoreResult<Totals> {
    validate_money("discount", discount)?;

    let subtotal: Money = items.iter().map(|item| item.subtotal).sum();
    if discount > subtotal {
        return Err(CoreError::InvalidDiscount {
            context: "transaction".to_string(),
            amount: subtotal,
            discount,
        });
    }

    Ok(Totals {
        subtotal,
        discount,
        total: subtotal - discount,
    })
}

// =============================================================================
// Payment Policy
// =============================================================================

/// Who settles the transaction, as far as the payment rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payer {
    Registered { balance: Money },
    WalkIn,
}

/// What the customer must hand over for this transaction.
///
/// ```text
/// ┌──────────────┬─────────────┬─────────────────────────────────────────┐
/// │ Payer        │ Type        │ Required                                │
/// ├──────────────┼─────────────┼─────────────────────────────────────────┤
/// │ walk-in      │ any         │ total                                   │
/// │ registered   │ PICKUP      │ 0 (booked as debt)                      │
/// │ registered   │ PURCHASE    │ max(total - max(balance, 0), 0)         │
/// │ registered   │ WHOLESALE   │ max(total - max(balance, 0), 0)         │
/// └──────────────┴─────────────┴─────────────────────────────────────────┘
/// ```
pub fn required_payment(payer: Payer, kind: TransactionType, total: Money) -> Money {
    match payer {
        Payer::WalkIn => total,
        Payer::Registered { balance } => match kind {
            TransactionType::Pickup => Money::ZERO,
            TransactionType::Purchase | TransactionType::Wholesale => {
                (total - balance.non_negative()).non_negative()
            }
            TransactionType::Deposit | TransactionType::Return => total,
        },
    }
}

/// Checks `amount_paid` against the exact-settlement rules and returns the
/// required amount on success.
///
/// ## Errors
/// - `Overpayment` when nothing is owed but something was paid
/// - `PaymentMismatch` when the payment differs from the required amount
pub fn check_payment(
    payer: Payer,
    kind: TransactionType,
    total: Money,
    amount_paid: Money,
) -> CoreResult<Money> {
    validate_money("amount_paid", amount_paid)?;

    match payer {
        Payer::WalkIn => {
            if amount_paid != total {
                return Err(CoreError::PaymentMismatch {
                    required: total,
                    paid: amount_paid,
                });
            }
            Ok(total)
        }
        Payer::Registered { balance } => match kind {
            TransactionType::Pickup => {
                if !amount_paid.is_zero() {
                    return Err(CoreError::Overpayment {
                        allowed: Money::ZERO,
                        paid: amount_paid,
                    });
                }
                Ok(Money::ZERO)
            }
            TransactionType::Purchase | TransactionType::Wholesale => {
                let required = total - balance.non_negative();
                if !required.is_positive() {
                    if !amount_paid.is_zero() {
                        return Err(CoreError::Overpayment {
                            allowed: Money::ZERO,
                            paid: amount_paid,
                        });
                    }
                    return Ok(Money::ZERO);
                }
                if amount_paid != required {
                    return Err(CoreError::PaymentMismatch {
                        required,
                        paid: amount_paid,
                    });
                }
                Ok(required)
            }
            TransactionType::Deposit | TransactionType::Return => {
                Err(CoreError::InvalidTransactionType {
                    transaction_type: kind,
                    operation: "sale payment".to_string(),
                })
            }
        },
    }
}

// =============================================================================
// Preview
// =============================================================================

/// Result of pricing a sale without committing it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingPreview {
    pub transaction_type: TransactionType,
    pub customer: Customer,
    pub items: Vec<TransactionItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub required_payment: Money,
    /// Whether the request's `amount_paid` would be accepted.
    pub payment_accepted: bool,
    /// Current balance (registered clients only).
    pub client_balance: Option<Money>,
    /// Balance after the ledger entry this sale would append.
    pub projected_balance: Option<Money>,
}

/// Builds the full preview for priced lines.
pub fn quote(
    kind: TransactionType,
    customer: Customer,
    payer: Payer,
    items: Vec<TransactionItem>,
    discount: Money,
    amount_paid: Money,
) -> CoreResult<PricingPreview> {
    let totals = compute_totals(&items, discount)?;
    let required = required_payment(payer, kind, totals.total);
    let payment_accepted = check_payment(payer, kind, totals.total, amount_paid).is_ok();

    let (client_balance, projected_balance) = match payer {
        Payer::Registered { balance } => (
            Some(balance),
            Some(ledger::apply_entry(balance, kind, totals.total)?),
        ),
        Payer::WalkIn => (None, None),
    };

    Ok(PricingPreview {
        transaction_type: kind,
        customer,
        items,
        subtotal: totals.subtotal,
        discount: totals.discount,
        total: totals.total,
        required_payment: required,
        payment_accepted,
        client_balance,
        projected_balance,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::money::Quantity;
    use crate::types::Unit;
    use chrono::Utc;

    fn m(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn product(unit: Unit, price: &str, stock: &str) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            branch_id: "b-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Portland Cement".to_string(),
            unit,
            unit_price: m(price),
            stock: q(stock),
            min_stock_level: Quantity::ZERO,
            is_active: true,
            last_correction_reason: None,
            last_corrected_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    fn line(unit: Unit, quantity: &str, discount: &str) -> LineInput {
        LineInput {
            product_id: "p-1".to_string(),
            quantity: q(quantity),
            unit,
            discount: m(discount),
        }
    }

    fn walk_in(name: &str) -> WalkInClient {
        WalkInClient {
            name: name.to_string(),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_select_customer_exactly_one() {
        let w = walk_in("Ada");
        assert!(matches!(
            select_customer(Some("c-1"), Some(&w)),
            Err(CoreError::InvalidCustomerReference { .. })
        ));
        assert!(matches!(
            select_customer(None, None),
            Err(CoreError::InvalidCustomerReference { .. })
        ));
        assert!(matches!(
            select_customer(Some("c-1"), None),
            Ok(CustomerSelection::Registered("c-1"))
        ));
        assert!(matches!(
            select_customer(None, Some(&walk_in("   "))),
            Err(CoreError::InvalidCustomerReference { .. })
        ));
    }

    #[test]
    fn test_sale_types() {
        assert!(ensure_sale_type(TransactionType::Purchase).is_ok());
        assert!(ensure_sale_type(TransactionType::Wholesale).is_ok());
        assert!(matches!(
            ensure_sale_type(TransactionType::Deposit),
            Err(CoreError::InvalidTransactionType { .. })
        ));
    }

    #[test]
    fn test_price_line_rounds_then_discounts() {
        let item = price_line(&product(Unit::Kg, "3.35", "40"), &line(Unit::Kg, "2.5", "0.38")).unwrap();
        assert_eq!(item.subtotal, m("8.00"));
        assert_eq!(item.product_name, "Portland Cement");
    }

    #[test]
    fn test_price_line_rejections() {
        let bags = product(Unit::Bag, "12.00", "3");

        assert!(matches!(
            price_line(&bags, &line(Unit::Kg, "1", "0")),
            Err(CoreError::UnitMismatch { expected: Unit::Bag, requested: Unit::Kg, .. })
        ));
        assert!(matches!(
            price_line(&bags, &line(Unit::Bag, "1.5", "0")),
            Err(CoreError::Validation(ValidationError::NonIntegerQuantity { .. }))
        ));
        match price_line(&bags, &line(Unit::Bag, "5", "0")) {
            Err(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, q("3"));
                assert_eq!(requested, q("5"));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        assert!(matches!(
            price_line(&bags, &line(Unit::Bag, "1", "12.01")),
            Err(CoreError::InvalidDiscount { .. })
        ));

        let mut inactive = bags.clone();
        inactive.is_active = false;
        assert!(matches!(
            price_line(&inactive, &line(Unit::Bag, "1", "0")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_full_line_discount_is_allowed() {
        let item = price_line(&product(Unit::Piece, "4.99", "10"), &line(Unit::Piece, "2", "9.98")).unwrap();
        assert_eq!(item.subtotal, Money::ZERO);
    }

    #[test]
    fn test_totals_exact_sum() {
        let p = product(Unit::Kg, "0.10", "100");
        let items: Vec<_> = (0..3)
            .map(|_| price_line(&p, &line(Unit::Kg, "1", "0")).unwrap())
            .collect();
        let totals = compute_totals(&items, m("0.05")).unwrap();
        assert_eq!(totals.subtotal, m("0.30"));
        assert_eq!(totals.total, m("0.25"));

        assert!(matches!(
            compute_totals(&items, m("0.31")),
            Err(CoreError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn test_walk_in_pays_exact_total() {
        let total = m("45.50");
        assert_eq!(check_payment(Payer::WalkIn, TransactionType::Purchase, total, m("45.50")).unwrap(), total);
        assert!(matches!(
            check_payment(Payer::WalkIn, TransactionType::Purchase, total, m("45.49")),
            Err(CoreError::PaymentMismatch { .. })
        ));
        assert!(matches!(
            check_payment(Payer::WalkIn, TransactionType::Purchase, total, m("45.51")),
            Err(CoreError::PaymentMismatch { .. })
        ));
    }

    #[test]
    fn test_registered_purchase_uses_credit_first() {
        let payer = Payer::Registered { balance: m("50") };
        let total = m("120");
        assert_eq!(check_payment(payer, TransactionType::Purchase, total, m("70")).unwrap(), m("70"));

        match check_payment(payer, TransactionType::Purchase, total, m("120")) {
            Err(CoreError::PaymentMismatch { required, paid }) => {
                assert_eq!(required, m("70"));
                assert_eq!(paid, m("120"));
            }
            other => panic!("expected PaymentMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_registered_purchase_fully_covered_by_credit() {
        let payer = Payer::Registered { balance: m("200") };
        assert_eq!(check_payment(payer, TransactionType::Wholesale, m("120"), Money::ZERO).unwrap(), Money::ZERO);
        assert!(matches!(
            check_payment(payer, TransactionType::Wholesale, m("120"), m("1")),
            Err(CoreError::Overpayment { .. })
        ));
    }

    #[test]
    fn test_registered_in_debt_pays_full_total() {
        let payer = Payer::Registered { balance: m("-30") };
        assert_eq!(required_payment(payer, TransactionType::Purchase, m("20")), m("20"));
        assert!(check_payment(payer, TransactionType::Purchase, m("20"), m("20")).is_ok());
    }

    #[test]
    fn test_registered_pickup_takes_no_payment() {
        let payer = Payer::Registered { balance: Money::ZERO };
        assert_eq!(check_payment(payer, TransactionType::Pickup, m("30"), Money::ZERO).unwrap(), Money::ZERO);
        assert!(matches!(
            check_payment(payer, TransactionType::Pickup, m("30"), m("30")),
            Err(CoreError::Overpayment { .. })
        ));
    }

    #[test]
    fn test_quote_projects_balance() {
        let p = product(Unit::Piece, "30", "5");
        let item = price_line(&p, &line(Unit::Piece, "1", "0")).unwrap();
        let preview = quote(
            TransactionType::Pickup,
            Customer::Registered { client_id: "c-1".to_string() },
            Payer::Registered { balance: Money::ZERO },
            vec![item],
            Money::ZERO,
            Money::ZERO,
        )
        .unwrap();
        assert_eq!(preview.total, m("30"));
        assert_eq!(preview.required_payment, Money::ZERO);
        assert!(preview.payment_accepted);
        assert_eq!(preview.projected_balance, Some(m("-30")));
    }
}
