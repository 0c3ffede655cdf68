//! # Seed Data Generator
//!
//! Populates the database with car listings for development.
//!
//! ## Usage
//! ```bash
//! # 50 cars (default)
//! cargo run -p carlot-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p carlot-db --bin seed -- --count 200 --db ./data/carlot.db
//! ```
//!
//! Every third car is listed for sale only, every fifth for both rent and
//! sale, the rest for rent only. Owners rotate through `owner-1..owner-5`.

use std::env;

use anyhow::Context;
use carlot_core::{CarStore, NewCar};
use carlot_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MODELS: &[(&str, &[&str])] = &[
    ("Toyota", &["Corolla", "Camry", "Innova", "Fortuner", "Yaris"]),
    ("Honda", &["City", "Civic", "Amaze", "Jazz"]),
    ("Hyundai", &["Creta", "Verna", "i20", "Venue", "Tucson"]),
    ("Maruti", &["Swift", "Baleno", "Dzire", "Ertiga", "Brezza"]),
    ("Mahindra", &["Thar", "XUV700", "Scorpio", "Bolero"]),
    ("Tata", &["Nexon", "Harrier", "Punch", "Altroz", "Safari"]),
];

const OWNERS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./carlot_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1]
                        .parse()
                        .with_context(|| format!("invalid --count: {}", args[i + 1]))?;
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
                println!("Carlot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of cars to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./carlot_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding cars");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;
    let cars = db.cars();

    let existing = cars.count().await?;
    if existing > 0 {
        warn!(existing, "Database already has cars, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for car in (0..count).map(generate_car) {
        let label = format!("{} {}", car.make, car.model);
        if let Err(e) = cars.insert_car(car).await {
            warn!(car = %label, error = %e, "Failed to insert car");
            continue;
        }
        generated += 1;
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");

    db.close().await;
    Ok(())
}

/// Generates a listing from a sequence number.
fn generate_car(seed: usize) -> NewCar {
    let (make, models) = MODELS[seed % MODELS.len()];
    let model = models[(seed / MODELS.len()) % models.len()];
    let year = 2015 + (seed % 10) as i32;

    // 1500.00 - 6500.00 per day, in paise
    let daily = 150_000 + ((seed * 37) % 500) as i64 * 1_000;
    // 4L - 24L
    let sale = 40_000_000 + ((seed * 53) % 200) as i64 * 1_000_000;

    let (daily_rate, sale_price) = if seed % 5 == 0 {
        (Some(daily), Some(sale))
    } else if seed % 3 == 0 {
        (None, Some(sale))
    } else {
        (Some(daily), None)
    };

    NewCar {
        owner_id: format!("owner-{}", seed % OWNERS + 1),
        make: make.to_string(),
        model: model.to_string(),
        year,
        daily_rate,
        sale_price,
    }
}
