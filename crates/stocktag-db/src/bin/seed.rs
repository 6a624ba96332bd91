//! # Seed Data Generator
//!
//! Populates the database with demo products and units, then walks one
//! order through the full lifecycle: reserve, scan each unit, auto-confirm.
//!
//! ## Usage
//! ```bash
//! # Default: 12 product variants, 8 units each
//! cargo run -p stocktag-db --bin seed
//!
//! # Custom unit count per product
//! cargo run -p stocktag-db --bin seed -- --units 20
//!
//! # Specify database path
//! cargo run -p stocktag-db --bin seed -- --db ./data/stocktag.db
//! ```

use std::env;

use stocktag_core::CreationPolicy;
use stocktag_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Demo catalog: every (category, size, color) combination becomes a
/// product variant.
const CATEGORIES: &[&str] = &["tshirt", "hoodie", "cap"];
const SIZES: &[&str] = &["S", "M", "L", "XL"];
const COLORS: &[&str] = &["black", "white", "navy"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut units_per_product: i64 = 8;
    let mut db_path = String::from("./stocktag_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--units" | "-u" => {
                if i + 1 < args.len() {
                    units_per_product = args[i + 1].parse().unwrap_or(8);
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
                println!("Stocktag Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --units <N>    Units per product variant (default: 8)");
                println!("  -d, --db <PATH>    Database file path (default: ./stocktag_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stocktag Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Units per product: {}", units_per_product);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products and units...");

    let start = std::time::Instant::now();
    let mut first_product_id = None;

    for category in CATEGORIES {
        for size in SIZES {
            for color in COLORS {
                let product = db.stock_in().create_product(category, size, color).await?;
                db.stock_in()
                    .stock_in(
                        &product.id,
                        units_per_product,
                        CreationPolicy::ValidatedAtCreation,
                        Some("seed"),
                    )
                    .await?;

                first_product_id.get_or_insert(product.id);
            }
        }
    }

    let products = db.products().count().await?;
    let units = db.units().count().await?;
    let elapsed = start.elapsed();
    println!(
        "✓ Generated {} products / {} units in {:?}",
        products, units, elapsed
    );

    // Walk one order through the full lifecycle as a smoke test.
    println!();
    println!("Running demo order lifecycle...");

    let product_id = first_product_id.ok_or("no products generated")?;
    let reservation = db.reservations().reserve("demo-customer", &product_id, 2).await?;
    println!("  Reserved {} units:", reservation.units.len());
    println!("{}", serde_json::to_string_pretty(&reservation)?);

    for unit in &reservation.units {
        let outcome = db.scanner().scan(&unit.code, Some("demo-gate")).await?;
        println!("  Scan {} → {}", unit.code, outcome.message);
    }

    let order = db
        .orders()
        .get_by_id(&reservation.order.id)
        .await?
        .ok_or("demo order vanished")?;
    println!("  Order status: {}", order.status);

    let stock = db
        .products()
        .get_by_id(&product_id)
        .await?
        .ok_or("demo product vanished")?
        .stock;
    println!("  Remaining stock for demo product: {}", stock);

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
