//! # Seed Data Generator
//!
//! Populates the database with a demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./borka_dev.db
//! cargo run -p borka-db --bin seed
//!
//! # Specify database path
//! cargo run -p borka-db --bin seed -- --db ./data/borka.db
//! ```
//!
//! ## Generated Data
//! - Two staff members (manager, cashier)
//! - Two branches (Gulshan, Dhanmondi), each with the default refund policy
//! - Abayas, hijabs and accessories in a few colours, stock split per branch
//! - A handful of loyalty customers
//! - One active percentage coupon (EID10)

use borka_core::{
    Branch, Customer, Discount, DiscountKind, PolicyUpdate, Product, User,
};
use borka_db::{Database, DbConfig};
use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

/// (sku prefix, category, names, price in taka)
const CATALOGUE: &[(&str, &str, &[&str], i64)] = &[
    ("ABY", "abaya", &["Nida Classic", "Dubai Open", "Kimono Abaya", "Butterfly"], 2450),
    ("HJB", "hijab", &["Jersey Hijab", "Chiffon Hijab", "Modal Hijab"], 350),
    ("NQB", "niqab", &["Three Layer Niqab", "Half Niqab"], 450),
    ("ACC", "accessory", &["Hijab Pins", "Under Cap"], 120),
];

const COLOURS: &[&str] = &["Black", "Navy", "Maroon"];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Nusrat Jahan", "01711000001"),
    ("Farhana Islam", "01811000002"),
    ("Tahmina Akter", "01911000003"),
    ("Sadia Rahman", "01611000004"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./borka_dev.db");

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
                println!("Borka POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./borka_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Borka POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.branches().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} branches", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Staff
    let manager = User {
        id: "user-manager".into(),
        name: Some("Rumana Akter".into()),
        email: Some("rumana@borka.local".into()),
    };
    let cashier = User {
        id: "user-cashier".into(),
        name: Some("Mitu Begum".into()),
        email: Some("mitu@borka.local".into()),
    };
    db.users().insert(&manager).await?;
    db.users().insert(&cashier).await?;
    println!("✓ Staff: {}, {}", manager.display_name(), cashier.display_name());

    // Branches with default policies
    let branches = [
        Branch {
            id: "branch-gulshan".into(),
            name: "Gulshan".into(),
        },
        Branch {
            id: "branch-dhanmondi".into(),
            name: "Dhanmondi".into(),
        },
    ];
    for branch in &branches {
        db.branches().insert(branch).await?;
        db.policies()
            .update(&branch.id, &PolicyUpdate::default(), &manager)
            .await?;
    }
    println!("✓ Branches: {} (default refund policy)", branches.len());

    // Products
    let start = std::time::Instant::now();
    let mut generated = 0usize;
    for (prefix, category, names, price_taka) in CATALOGUE {
        for (name_idx, name) in names.iter().enumerate() {
            for (colour_idx, colour) in COLOURS.iter().enumerate() {
                let seed = generated;
                let per_branch = 4 + (seed % 7) as i64;
                let product = generate_product(
                    prefix,
                    category,
                    name,
                    colour,
                    price_taka + (name_idx as i64) * 50,
                    per_branch * branches.len() as i64,
                    name_idx * 10 + colour_idx,
                );

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }
                for branch in &branches {
                    db.products()
                        .set_branch_stock(&product.id, &branch.id, per_branch)
                        .await?;
                }
                generated += 1;
            }
        }
    }
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    // Customers
    for (idx, (name, phone)) in CUSTOMERS.iter().enumerate() {
        db.customers()
            .insert(&Customer {
                id: Uuid::new_v4().to_string(),
                name: (*name).to_string(),
                phone: Some((*phone).to_string()),
                loyalty_points: (idx as i64) * 25,
                created_at: Utc::now(),
            })
            .await?;
    }
    println!("✓ Customers: {}", CUSTOMERS.len());

    // Coupon
    let now = Utc::now();
    db.discounts()
        .insert(&Discount {
            id: Uuid::new_v4().to_string(),
            code: "EID10".into(),
            name: "Eid 10% off".into(),
            kind: DiscountKind::Percentage,
            value: 1000,
            min_purchase_paisa: Some(100_000),
            max_discount_paisa: Some(50_000),
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(30),
            usage_limit: Some(500),
            usage_count: 0,
            is_active: true,
        })
        .await?;
    println!("✓ Coupon: EID10");

    let abayas = db.products().list_active(Some("abaya"), 5).await?;
    println!("  Search 'abaya': {} results", abayas.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with a stable SKU.
fn generate_product(
    prefix: &str,
    category: &str,
    name: &str,
    colour: &str,
    price_taka: i64,
    stock: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    let sku = format!(
        "{}-{}-{:03}",
        prefix,
        colour[..3].to_uppercase(),
        seed
    );

    Product {
        id: Uuid::new_v4().to_string(),
        sku,
        name: format!("{} ({})", name, colour),
        category: Some(category.to_string()),
        price_paisa: price_taka * 100,
        current_stock: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
