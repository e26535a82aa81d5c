//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod seed;

use mercato_api::config::ApiConfig;
use mercato_api::db;
use sqlx::PgPool;

/// Connect using the same environment as the API server.
async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let config = ApiConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;
    Ok(pool)
}
