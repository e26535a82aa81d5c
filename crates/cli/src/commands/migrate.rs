//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mercato migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MERCATO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Stored in `crates/api/migrations/`:
//! ```text
//! migrations/
//! ├── 20260301000001_create_tenants.sql
//! ├── 20260301000002_create_orders.sql
//! └── 20260301000003_create_sales_ledger.sql
//! ```

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
