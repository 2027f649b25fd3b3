//! # Seed Data Generator
//!
//! Populates a database with demo branches, products and clients.
//!
//! ## Usage
//! ```bash
//! # Two branches, 12 clients each (default)
//! cargo run -p tillbook-db --bin seed
//!
//! # Custom amounts
//! cargo run -p tillbook-db --bin seed -- --branches 3 --clients 40
//!
//! # Specify database path
//! cargo run -p tillbook-db --bin seed -- --db ./data/tillbook.db
//! ```
//!
//! ## Generated Data
//! - Every branch gets the full catalog below, with stock scaled per branch
//! - Clients alternate between opening deposits and a clean slate; deposits
//!   go through the ledger so `recompute_balance` holds from day one

use chrono::Utc;
use rust_decimal::Decimal;
use std::env;
use tillbook_core::{Client, Money, Product, Quantity, TransactionType, Unit};
use tillbook_db::{Database, DbConfig, DbResult, NewLedgerEntry};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (sku, name, unit, unit price in minor units, base stock in thousandths)
const CATALOG: &[(&str, &str, Unit, i64, i64)] = &[
    ("CEM-50", "Cement 50kg", Unit::Bag, 450_000, 120_000),
    ("ROD-12", "Iron Rod 12mm", Unit::Piece, 720_000, 300_000),
    ("ROD-16", "Iron Rod 16mm", Unit::Piece, 1_150_000, 180_000),
    ("NAIL-3", "Nails 3 inch", Unit::Kg, 180_000, 45_500),
    ("WIRE-BND", "Binding Wire", Unit::Kg, 210_000, 30_250),
    ("PAINT-W", "Emulsion Paint White", Unit::Litre, 95_000, 80_000),
    ("PVC-4", "PVC Pipe 4 inch", Unit::Metre, 120_000, 150_000),
    ("TILE-60", "Floor Tiles 60x60", Unit::Carton, 1_400_000, 60_000),
    ("RICE-50", "Rice 50kg", Unit::Bag, 7_800_000, 25_000),
    ("OIL-25", "Vegetable Oil 25L", Unit::Litre, 160_000, 75_000),
    ("SUGAR-P", "Sugar Cubes", Unit::Pack, 90_000, 200_000),
    ("EGG-DZ", "Eggs", Unit::Dozen, 250_000, 40_000),
];

const CLIENT_NAMES: &[&str] = &[
    "Adebayo Builders",
    "Chioma Ventures",
    "Emeka & Sons",
    "Fatima Provisions",
    "Grace Hardware",
    "Ibrahim Contractors",
    "Kemi Stores",
    "Musa Enterprises",
    "Ngozi Supermart",
    "Olu Construction",
    "Sade Foods",
    "Tunde Depot",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut branches: usize = 2;
    let mut clients_per_branch: usize = CLIENT_NAMES.len();
    let mut db_path = String::from("./tillbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--branches" | "-b" => {
                if i + 1 < args.len() {
                    branches = args[i + 1].parse().unwrap_or(2);
                    i += 1;
                }
            }
            "--clients" | "-c" => {
                if i + 1 < args.len() {
                    clients_per_branch = args[i + 1].parse().unwrap_or(CLIENT_NAMES.len());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --branches <N>  Number of branches (default: 2)");
                println!("  -c, --clients <N>   Clients per branch (default: 12)");
                println!("  -d, --db <PATH>     Database file path (default: ./tillbook_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tillbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Branches: {}", branches);
    println!("Clients per branch: {}", clients_per_branch);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut products = 0;
    let mut clients = 0;

    for b in 1..=branches {
        let branch_id = format!("branch-{:02}", b);
        println!();
        println!("Seeding {}...", branch_id);

        for (idx, entry) in CATALOG.iter().enumerate() {
            let product = generate_product(&branch_id, entry, b + idx);
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.sku, e);
                continue;
            }
            products += 1;
        }

        for n in 0..clients_per_branch {
            let client = generate_client(&branch_id, n);
            let opening = opening_deposit(n);
            if let Err(e) = insert_client(&db, client, opening).await {
                eprintln!("Failed to insert client {}: {}", n, e);
                continue;
            }
            clients += 1;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} clients in {:?}",
        products, clients, elapsed
    );
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one catalog product for a branch; `seed` varies the shelf.
fn generate_product(branch_id: &str, entry: &(&str, &str, Unit, i64, i64), seed: usize) -> Product {
    let (sku, name, unit, price_minor, stock_milli) = *entry;
    let now = Utc::now();

    // piece-like shelves stay whole
    let stock_milli = stock_milli + ((seed * 7) % 5) as i64 * 1_000;
    let mut stock = Decimal::new(stock_milli, 3);
    if unit.is_piece_like() {
        stock = stock.trunc();
    }

    Product {
        id: Uuid::new_v4().to_string(),
        branch_id: branch_id.to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        unit,
        unit_price: Money::from_minor(price_minor),
        stock: Quantity::from_decimal(stock.normalize()),
        min_stock_level: Quantity::from_int(5),
        is_active: true,
        last_correction_reason: None,
        last_corrected_at: None,
        created_at: now,
        updated_at: now,
        version: 1,
    }
}

fn generate_client(branch_id: &str, n: usize) -> Client {
    let now = Utc::now();
    let base = CLIENT_NAMES[n % CLIENT_NAMES.len()];
    let name = if n < CLIENT_NAMES.len() {
        base.to_string()
    } else {
        format!("{} {}", base, n / CLIENT_NAMES.len() + 1)
    };

    Client {
        id: Uuid::new_v4().to_string(),
        branch_id: branch_id.to_string(),
        name,
        phone: Some(format!("0803{:07}", n * 7919 % 10_000_000)),
        address: None,
        balance: Money::ZERO,
        is_active: true,
        is_suspended: false,
        last_transaction_date: None,
        created_at: now,
        updated_at: now,
        version: 1,
    }
}

/// Every other client starts with credit on file.
fn opening_deposit(n: usize) -> Option<Money> {
    if n % 2 == 0 {
        Some(Money::from_major(5_000 * (n as i64 % 4 + 1)))
    } else {
        None
    }
}

/// Inserts the client and books its opening deposit in one unit.
async fn insert_client(db: &Database, client: Client, opening: Option<Money>) -> DbResult<()> {
    db.execute(|uow| {
        Box::pin(async move {
            uow.clients().insert(&client).await?;
            if let Some(amount) = opening {
                let now = uow.now();
                let entry = NewLedgerEntry {
                    kind: TransactionType::Deposit,
                    amount,
                    description: "Opening balance",
                    reference: None,
                };
                uow.clients().apply_ledger_entry(&client.id, entry, now).await?;
            }
            Ok(())
        })
    })
    .await
}
