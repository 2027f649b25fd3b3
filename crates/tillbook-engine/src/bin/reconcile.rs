//! # Stock Reconciliation Tool
//!
//! Prints a reconciliation report as JSON and, with `--apply`, corrects the
//! products it flagged.
//!
//! ## Usage
//! ```bash
//! # Report for every branch
//! cargo run -p tillbook-engine --bin reconcile
//!
//! # One branch, custom config
//! cargo run -p tillbook-engine --bin reconcile -- --branch b-1 --config ./tillbook.toml
//!
//! # Correct what the report found
//! cargo run -p tillbook-engine --bin reconcile -- --apply --reason "Quarterly count"
//! ```
//!
//! Exit status is 1 when the report is not clean and nothing was applied.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tillbook_db::Database;
use tillbook_engine::{init_tracing, EngineConfig, ReconciliationEngine, Sinks};

const DEFAULT_REASON: &str = "Automatic reconciliation correction";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;
    let mut apply = false;
    let mut reason = String::from(DEFAULT_REASON);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--branch" | "-b" => {
                if i + 1 < args.len() {
                    branch = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--reason" | "-r" => {
                if i + 1 < args.len() {
                    reason = args[i + 1].clone();
                    i += 1;
                }
            }
            "--apply" => apply = true,
            "--help" | "-h" => {
                println!("Tillbook Stock Reconciliation");
                println!();
                println!("Usage: reconcile [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file, overrides the config");
                println!("  -b, --branch <ID>    Only check this branch");
                println!("      --apply          Correct flagged products");
                println!("  -r, --reason <TEXT>  Reason stamped on corrections");
                println!("  -h, --help           Show this help message");
                return Ok(ExitCode::SUCCESS);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                return Ok(ExitCode::from(2));
            }
        }
        i += 1;
    }

    let mut config = EngineConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    config.validate()?;
    init_tracing(&config.logging.filter);

    let db = Database::new(config.to_db_config()).await?;
    let engine = ReconciliationEngine::new(db.clone(), Sinks::from_settings(&config.sinks, &db));

    let report = engine.reconcile(branch.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        return Ok(ExitCode::SUCCESS);
    }
    if !apply {
        eprintln!(
            "{} discrepancies, {} failures. Re-run with --apply to correct.",
            report.discrepancies.len(),
            report.failures.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    let outcome = engine.auto_correct(&report.discrepancies, &reason).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // Sink tasks run in the background; give them a moment before exit.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    Ok(if outcome.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
