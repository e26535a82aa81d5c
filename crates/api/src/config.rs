//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MERCATO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `MERCATO_HOST` - Bind address (default: 127.0.0.1)
//! - `MERCATO_PORT` - Listen port (default: 5000)
//! - `MERCATO_DB_MAX_CONNECTIONS` - Pool capacity (default: 10)
//! - `MERCATO_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 2)
//! - `MERCATO_DB_ACQUIRE_TIMEOUT_SECS` - Wait for a pooled connection (default: 10)
//! - `MERCATO_STATUS_ISOLATION` - Isolation for status transitions:
//!   `read_committed` (default), `repeatable_read` or `serializable`
//! - `MERCATO_REQUEST_TIMEOUT_SECS` - Request deadline (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: production)
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.1)
//! - `LOG_FORMAT` - `pretty` (default) or `json`

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::db::IsolationLevel;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for log shipping.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Order lifecycle API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Database pool settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Isolation level for status transitions
    pub status_isolation: IsolationLevel,
    /// Request deadline in seconds
    pub request_timeout_secs: u64,
    /// Error tracking settings
    pub sentry: SentryConfig,
    /// Log output format
    pub log_format: LogFormat,
}

/// Connection pool configuration.
///
/// Implements `Debug` manually to redact the connection string.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub url: SecretString,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Minimum idle connections
    pub min_connections: u32,
    /// Seconds to wait for a free connection before failing
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Pool settings with defaults for everything but the URL.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: SecretString::from(url.into()),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 10,
        }
    }
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; error tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: String,
    /// Fraction of error events sent
    pub sample_rate: f32,
    /// Fraction of transactions traced
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required keys are missing or invalid.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Source(get);

        let url = env
            .optional("MERCATO_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .ok_or_else(|| ConfigError::MissingEnvVar("MERCATO_DATABASE_URL".to_string()))?;

        let database = DatabaseConfig {
            url: SecretString::from(url),
            max_connections: env.parse_or("MERCATO_DB_MAX_CONNECTIONS", 10)?,
            min_connections: env.parse_or("MERCATO_DB_MIN_CONNECTIONS", 2)?,
            acquire_timeout_secs: env.parse_or("MERCATO_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
        };
        if database.min_connections > database.max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "MERCATO_DB_MIN_CONNECTIONS".to_string(),
                format!("exceeds MERCATO_DB_MAX_CONNECTIONS ({})", database.max_connections),
            ));
        }

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            environment: env
                .optional("SENTRY_ENVIRONMENT")
                .unwrap_or_else(|| "production".to_string()),
            sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        };

        Ok(Self {
            database,
            host: env.parse_or("MERCATO_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env.parse_or("MERCATO_PORT", 5000)?,
            status_isolation: env.parse_or("MERCATO_STATUS_ISOLATION", IsolationLevel::default())?,
            request_timeout_secs: env.parse_or("MERCATO_REQUEST_TIMEOUT_SECS", 30)?,
            sentry,
            log_format: env.parse_or("LOG_FORMAT", LogFormat::default())?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

struct Source<F>(F);

impl<F: Fn(&str) -> Option<String>> Source<F> {
    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Parse a variable, falling back to `default` when unset or blank.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(value) if !value.trim().is_empty() => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            _ => Ok(default),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("MERCATO_DATABASE_URL", "postgres://localhost/mercato")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert_eq!(config.status_isolation, IsolationLevel::ReadCommitted);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry.dsn.is_none());
        assert_eq!(config.sentry.environment, "production");
        assert_eq!(config.sentry.sample_rate, 1.0);
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "MERCATO_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fallback/db")]).unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://fallback/db");

        let config = load(&[
            ("MERCATO_DATABASE_URL", "postgres://primary/db"),
            ("DATABASE_URL", "postgres://fallback/db"),
        ])
        .unwrap();
        assert_eq!(config.database.url.expose_secret(), "postgres://primary/db");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MERCATO_DATABASE_URL", "postgres://localhost/mercato"),
            ("MERCATO_HOST", "0.0.0.0"),
            ("MERCATO_PORT", "8080"),
            ("MERCATO_DB_MAX_CONNECTIONS", "32"),
            ("MERCATO_STATUS_ISOLATION", "serializable"),
            ("LOG_FORMAT", "json"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("SENTRY_TRACES_SAMPLE_RATE", "0.5"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 32);
        assert_eq!(config.status_isolation, IsolationLevel::Serializable);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.sentry.dsn.is_some());
        assert_eq!(config.sentry.traces_sample_rate, 0.5);
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[
            ("MERCATO_DATABASE_URL", "postgres://localhost/mercato"),
            ("MERCATO_PORT", "not-a-port"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MERCATO_PORT"));

        let err = load(&[
            ("MERCATO_DATABASE_URL", "postgres://localhost/mercato"),
            ("MERCATO_STATUS_ISOLATION", "snapshot"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MERCATO_STATUS_ISOLATION")
        );
    }

    #[test]
    fn test_min_connections_cannot_exceed_max() {
        let err = load(&[
            ("MERCATO_DATABASE_URL", "postgres://localhost/mercato"),
            ("MERCATO_DB_MAX_CONNECTIONS", "4"),
            ("MERCATO_DB_MIN_CONNECTIONS", "8"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }

    #[test]
    fn test_blank_sentry_dsn_is_disabled() {
        let config = load(&[
            ("MERCATO_DATABASE_URL", "postgres://localhost/mercato"),
            ("SENTRY_DSN", ""),
        ])
        .unwrap();
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_database_config_debug_redacts_url() {
        let config = DatabaseConfig::with_url("postgres://user:hunter2@db/mercato");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("max_connections"));
        assert!(!debug_output.contains("hunter2"));
    }
}
