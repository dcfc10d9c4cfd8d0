//! Database seeder for Kakeibo development and testing.
//!
//! Seeds a two-member family, a solo user, and a handful of expenses for
//! local development. All accounts get the password `password123`.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use kakeibo_core::auth::hash_password;
use kakeibo_core::expense::{ExpenseDraft, ExpenseService};
use kakeibo_db::{
    AuditLogRepository, ExpenseRepository, FamilyRepository, UserRepository, connect,
};

const SEED_PASSWORD: &str = "password123";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = connect(&database_url, 5)
        .await
        .expect("Failed to connect to database");

    let users = UserRepository::new(db.clone());
    let families = FamilyRepository::new(db.clone());

    if users
        .username_exists("alice")
        .await
        .expect("Failed to query users")
    {
        println!("Seed users already present, nothing to do.");
        return;
    }

    println!("Seeding users...");
    let password_hash = hash_password(SEED_PASSWORD).expect("Failed to hash seed password");
    for (username, display_name) in [
        ("alice", "Alice Hart"),
        ("bob", "Bob Hart"),
        ("carol", "Carol Solo"),
    ] {
        users
            .create(username, &password_hash, display_name)
            .await
            .expect("Failed to create user");
    }

    println!("Seeding family...");
    let family = families
        .create("Hart Household")
        .await
        .expect("Failed to create family");
    for username in ["alice", "bob"] {
        families
            .add_member(family.id, username)
            .await
            .expect("Failed to add family member");
    }

    // Seed expenses through the service so ownership stamping and audit
    // entries behave exactly like production traffic.
    let service = ExpenseService::new(
        Arc::new(users),
        Arc::new(families),
        Arc::new(ExpenseRepository::new(db.clone())),
        Arc::new(AuditLogRepository::new(db.clone())),
    );

    println!("Seeding expenses...");
    let samples = [
        ("alice", dec!(42.50), "groceries", "weekly shop", (2026, 2, 2, 10)),
        ("alice", dec!(9.90), "coffee", "beans and filters", (2026, 2, 5, 8)),
        ("bob", dec!(61.00), "fuel", "road trip fill-up", (2026, 2, 3, 17)),
        ("bob", dec!(120.00), "utilities", "electricity bill", (2026, 2, 10, 9)),
        ("carol", dec!(15.75), "books", "paperback haul", (2026, 2, 7, 14)),
    ];
    for (owner, amount, category, description, (y, m, d, h)) in samples {
        let draft = ExpenseDraft {
            amount,
            category: category.to_string(),
            description: description.to_string(),
            expense_date: NaiveDate::from_ymd_opt(y, m, d)
                .expect("valid seed date")
                .and_hms_opt(h, 0, 0)
                .expect("valid seed time"),
        };
        service
            .create(owner, &draft)
            .await
            .expect("Failed to seed expense");
    }

    println!("Seeding complete!");
}
