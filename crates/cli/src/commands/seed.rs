//! Seed stores, customers and products from a YAML fixture.
//!
//! Orders are never seeded; create them through the API so they go through
//! the lifecycle engine.
//!
//! # Fixture Format
//!
//! ```yaml
//! stores:
//!   - name: Harbour Street Grocer
//!     customers:
//!       - name: Amara Osei
//!         email: amara@example.com
//!     products:
//!       - name: Sourdough Loaf
//!         category: Bakery
//!         price: "6.50"
//!         stock: 24
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use tracing::{error, info};

use mercato_core::{CustomerId, Money, ProductId, StoreId};

/// Top-level fixture document.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub stores: Vec<StoreFixture>,
}

/// A store with its customers and catalog.
#[derive(Debug, Deserialize)]
pub struct StoreFixture {
    pub name: String,
    #[serde(default)]
    pub customers: Vec<CustomerFixture>,
    #[serde(default)]
    pub products: Vec<ProductFixture>,
}

/// A customer of a store.
#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    pub name: String,
    pub email: Option<String>,
}

/// A catalog product.
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

/// Rows created by a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stores: usize,
    pub customers: usize,
    pub products: usize,
}

/// Check a fixture for problems, returning one message per problem.
#[must_use]
pub fn validate(fixture: &Fixture) -> Vec<String> {
    let mut errors = Vec::new();

    if fixture.stores.is_empty() {
        errors.push("fixture contains no stores".to_string());
    }

    for (i, store) in fixture.stores.iter().enumerate() {
        let label = format!("stores[{i}] ({})", store.name);
        if store.name.trim().is_empty() {
            errors.push(format!("stores[{i}]: name is empty"));
        }
        for (j, customer) in store.customers.iter().enumerate() {
            if customer.name.trim().is_empty() {
                errors.push(format!("{label}.customers[{j}]: name is empty"));
            }
        }
        for (j, product) in store.products.iter().enumerate() {
            if product.name.trim().is_empty() {
                errors.push(format!("{label}.products[{j}]: name is empty"));
            }
            if let Err(e) = Money::new(product.price) {
                errors.push(format!("{label}.products[{j}]: price {}: {e}", product.price));
            }
            if product.stock < 0 {
                errors.push(format!("{label}.products[{j}]: stock is negative"));
            }
        }
    }

    errors
}

/// Seed the database from a fixture file in a single transaction.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or any insert fails (in which case nothing is written).
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading fixture");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let fixture: Fixture = serde_yaml::from_str(&content)?;

    let errors = validate(&fixture);
    if !errors.is_empty() {
        error!("Fixture validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let mut tx = pool.begin().await?;
    let summary = insert_fixture(&mut tx, &fixture).await?;
    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Stores: {}", summary.stores);
    info!("  Customers: {}", summary.customers);
    info!("  Products: {}", summary.products);

    Ok(())
}

async fn insert_fixture(
    conn: &mut PgConnection,
    fixture: &Fixture,
) -> Result<SeedSummary, sqlx::Error> {
    let mut summary = SeedSummary::default();

    for store in &fixture.stores {
        let store_id: StoreId = sqlx::query_scalar(
            "INSERT INTO commerce.store (store_name) VALUES ($1) RETURNING id",
        )
        .bind(store.name.trim())
        .fetch_one(&mut *conn)
        .await?;
        info!(%store_id, name = %store.name, "Created store");
        summary.stores += 1;

        for customer in &store.customers {
            let customer_id: CustomerId = sqlx::query_scalar(
                r"
                INSERT INTO commerce.customer (store_id, customer_name, email)
                VALUES ($1, $2, $3)
                RETURNING id
                ",
            )
            .bind(store_id)
            .bind(customer.name.trim())
            .bind(customer.email.as_deref())
            .fetch_one(&mut *conn)
            .await?;
            info!(%store_id, %customer_id, name = %customer.name, "Created customer");
            summary.customers += 1;
        }

        for product in &store.products {
            let product_id: ProductId = sqlx::query_scalar(
                r"
                INSERT INTO commerce.product
                    (store_id, product_name, product_category, description, price, stock_quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                ",
            )
            .bind(store_id)
            .bind(product.name.trim())
            .bind(product.category.as_deref())
            .bind(product.description.as_deref())
            .bind(product.price)
            .bind(product.stock)
            .fetch_one(&mut *conn)
            .await?;
            info!(%store_id, %product_id, name = %product.name, price = %product.price, "Created product");
            summary.products += 1;
        }
    }

    Ok(summary)
}
