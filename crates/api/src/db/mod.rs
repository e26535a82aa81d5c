//! Database operations for the order lifecycle `PostgreSQL` schema.
//!
//! # Schema: `commerce`
//!
//! ## Tables
//!
//! - `store` - Tenants
//! - `customer` - Customer directory (read-only here)
//! - `product` - Catalog with current prices (read-only here)
//! - `customer_order` - Orders; store reached through `customer`
//! - `order_item` - Line items, created atomically with their order
//! - `sales_record` - Append-only sales ledger
//!
//! # Transactions
//!
//! Statements that must share a transaction with others take
//! `&mut PgConnection` so the caller decides the unit of work. Read-only
//! projections live on repositories that borrow the pool.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p mercato-cli -- migrate
//! ```

pub mod catalog;
pub mod orders;
pub mod sales;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use sales::SalesLedgerRepository;

use crate::config::DatabaseConfig;

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a product listed twice on one order).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether retrying the whole operation may succeed.
    ///
    /// Covers pool exhaustion, dropped connections, serialization failures and
    /// deadlocks.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db_err) => db_err
                    .code()
                    .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED),
                _ => false,
            },
            Self::DataCorruption(_) | Self::NotFound | Self::Conflict(_) => false,
        }
    }

    /// Map unique violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Transaction isolation used for status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read committed plus explicit row locks on the order and its customer.
    #[default]
    ReadCommitted,
    /// Snapshot isolation; concurrent writers fail with a retryable error.
    RepeatableRead,
    /// Full serializability; conflicting transactions fail with a retryable error.
    Serializable,
}

impl IsolationLevel {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }

    /// Apply this level to a freshly begun transaction.
    ///
    /// Must be the first statement of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn apply(self, conn: &mut PgConnection) -> Result<(), RepositoryError> {
        sqlx::query(self.as_sql()).execute(conn).await?;
        Ok(())
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "read_committed" => Ok(Self::ReadCommitted),
            "repeatable_read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            other => Err(format!("unknown isolation level: {other}")),
        }
    }
}

/// Create a `PostgreSQL` connection pool from configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config)
        .connect(config.url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect_lazy(config.url.expose_secret())
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_from_str() {
        assert_eq!(
            "read_committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "Repeatable Read".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert_eq!(
            "SERIALIZABLE".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_transient());
        assert!(!RepositoryError::NotFound.is_transient());
        assert!(!RepositoryError::Conflict("x".to_owned()).is_transient());
    }
}
