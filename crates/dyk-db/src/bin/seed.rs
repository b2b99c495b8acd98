//! # Seed Data Generator
//!
//! Populates a development database with courses, equipment and the
//! settings rows the order engine reads.
//!
//! ## Usage
//! ```bash
//! cargo run -p dyk-db --bin seed
//!
//! # Specify database path
//! cargo run -p dyk-db --bin seed -- --db ./data/dyk.db
//! ```
//!
//! Logging follows `RUST_LOG` (default `info,dyk=debug,sqlx=warn`).

use chrono::Utc;
use dyk_core::settings::{
    KEY_COMPANY_ADDRESS, KEY_COMPANY_BANKGIRO, KEY_COMPANY_CITY, KEY_COMPANY_EMAIL,
    KEY_COMPANY_F_TAX, KEY_COMPANY_NAME, KEY_COMPANY_ORG_NUMBER, KEY_COMPANY_PHONE,
    KEY_COMPANY_VAT_NUMBER, KEY_COMPANY_ZIP, KEY_INVOICE_PREFIX, KEY_INVOICE_TERMS_DAYS,
    KEY_INVOICE_VAT_RATE, KEY_REGISTRATION_MODE,
};
use dyk_core::{Course, Equipment};
use dyk_db::{Database, DbConfig};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (name, price in öre, VAT bps; `None` = reduced education rate)
const COURSES: &[(&str, i64, Option<u32>)] = &[
    ("Prova på-dykning", 95_000, None),
    ("Open Water Diver", 450_000, Some(600)),
    ("Advanced Open Water", 395_000, Some(600)),
    ("Torrdräktskurs", 220_000, Some(600)),
    ("Nitrox", 180_000, None),
    ("Guidad båtdykning", 85_000, Some(2500)),
];

/// (name, rent price, sale price, quantity)
const EQUIPMENT: &[(&str, Option<i64>, Option<i64>, i64)] = &[
    ("Torrdräkt", Some(10_000), None, 8),
    ("Våtdräkt 7 mm", Some(7_500), Some(249_000), 15),
    ("BCD", Some(8_000), None, 12),
    ("Regulator", Some(9_000), None, 12),
    ("Mask", None, Some(49_900), 30),
    ("Fenor", Some(3_000), Some(89_900), 20),
    ("Dykdator", Some(15_000), Some(499_000), 6),
];

const SETTINGS: &[(&str, &str, &str)] = &[
    (KEY_INVOICE_PREFIX, "DYK", "invoicing"),
    (KEY_INVOICE_TERMS_DAYS, "30", "invoicing"),
    (KEY_INVOICE_VAT_RATE, "0.25", "invoicing"),
    (KEY_REGISTRATION_MODE, "optional", "checkout"),
    (KEY_COMPANY_NAME, "Dykskolan i Stockholm AB", "company"),
    (KEY_COMPANY_ORG_NUMBER, "556123-4567", "company"),
    (KEY_COMPANY_VAT_NUMBER, "SE556123456701", "company"),
    (KEY_COMPANY_ADDRESS, "Strandvägen 1", "company"),
    (KEY_COMPANY_ZIP, "114 51", "company"),
    (KEY_COMPANY_CITY, "Stockholm", "company"),
    (KEY_COMPANY_EMAIL, "info@dykskolan.se", "company"),
    (KEY_COMPANY_PHONE, "08-123 456 78", "company"),
    (KEY_COMPANY_BANKGIRO, "123-4567", "company"),
    (KEY_COMPANY_F_TAX, "true", "company"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./dyk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dykskolan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./dyk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.courses().list_active().await?;
    if !existing.is_empty() {
        warn!(
            courses = existing.len(),
            "Database already has courses, skipping seed (delete the file to regenerate)"
        );
        return Ok(());
    }

    let now = Utc::now();

    for (name, price_cents, vat_rate_bps) in COURSES {
        let course = Course {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            price_cents: *price_cents,
            vat_rate_bps: *vat_rate_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.courses().insert(&course).await?;
    }
    info!(count = COURSES.len(), "Courses created");

    for (name, rent, sale, quantity) in EQUIPMENT {
        let equipment = Equipment {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            rent_price_cents: *rent,
            sale_price_cents: *sale,
            available_quantity: *quantity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.equipment().insert(&equipment).await?;
    }
    info!(count = EQUIPMENT.len(), "Equipment created");

    for (key, value, category) in SETTINGS {
        db.settings().upsert(key, value, category).await?;
    }
    info!(count = SETTINGS.len(), "Settings written");

    info!("Seed complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dyk=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
