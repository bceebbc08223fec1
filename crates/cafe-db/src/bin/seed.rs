//! # Legacy Data Import
//!
//! Loads the JSON files of the old file-based shop into a database.
//!
//! ## Usage
//! ```bash
//! # Import ./data/*.json into ./cafe.db
//! cargo run -p cafe-db --bin seed
//!
//! # Custom locations
//! cargo run -p cafe-db --bin seed -- --dir ./old/data --db /var/lib/cafe/cafe.db
//! ```
//!
//! Safe to run more than once: records already present are skipped.

use std::env;
use std::path::PathBuf;

use cafe_db::import::{import_dir, CASHBOX_FILE, CUSTOMERS_FILE, PRODUCTS_FILE, SALES_FILE};
use cafe_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut data_dir = PathBuf::from("./data");
    let mut db_path = PathBuf::from("./cafe.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    data_dir = PathBuf::from(value);
                    i += 1;
                }
            }
            "--db" => {
                if let Some(value) = args.get(i + 1) {
                    db_path = PathBuf::from(value);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cafe POS legacy import");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --dir <PATH>   Directory with the JSON files (default: ./data)");
                println!("      --db <PATH>    Database file path (default: ./cafe.db)");
                println!("  -h, --help         Show this help message");
                println!();
                println!(
                    "Reads {}, {}, {} and {} when present.",
                    PRODUCTS_FILE, SALES_FILE, CUSTOMERS_FILE, CASHBOX_FILE
                );
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {} (try --help)", other),
        }
        i += 1;
    }

    println!("Cafe POS legacy import");
    println!("======================");
    println!("Data dir: {}", data_dir.display());
    println!("Database: {}", db_path.display());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let summary = import_dir(&db, &data_dir).await?;

    println!();
    println!("✓ Products:  {}", summary.products);
    println!("✓ Customers: {}", summary.customers);
    println!("✓ Sales:     {}", summary.sales);
    println!(
        "✓ Cashbox:   {}",
        if summary.cashbox { "imported" } else { "not present" }
    );
    if summary.skipped > 0 {
        println!("⚠ Skipped:   {} (already present or unreadable)", summary.skipped);
    }

    db.close().await;
    Ok(())
}
