//! Database configuration.
//!
//! A `DbConfig` is built once at process start, either explicitly with the
//! builder methods or from environment variables, and handed to
//! [`Database::new`](crate::Database::new). Nothing reads configuration from
//! process-wide state after that.
//!
//! ## Environment
//! ```text
//! CRM_DB_PATH                  ./crm_db.sqlite
//! CRM_DB_MAX_CONNECTIONS       5
//! CRM_DB_MIN_CONNECTIONS       1
//! CRM_DB_ACQUIRE_TIMEOUT_SECS  30
//! CRM_DB_RUN_MIGRATIONS        true
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default database file when `CRM_DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "./crm_db.sqlite";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/crm/crm.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long a checkout waits for a free connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created on first connect if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Fresh schema, isolated from every other test
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    /// True for the `:memory:` path.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present;
    /// variables already set in the process take precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a closure over a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("CRM_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let config = DbConfig::new(path)
            .max_connections(parse_or(&lookup, "CRM_DB_MAX_CONNECTIONS", 5)?)
            .min_connections(parse_or(&lookup, "CRM_DB_MIN_CONNECTIONS", 1)?)
            .acquire_timeout(Duration::from_secs(parse_or(
                &lookup,
                "CRM_DB_ACQUIRE_TIMEOUT_SECS",
                30,
            )?))
            .run_migrations(parse_or(&lookup, "CRM_DB_RUN_MIGRATIONS", true)?);

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "CRM_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if config.min_connections > config.max_connections {
            return Err(ConfigError::Inconsistent(format!(
                "min_connections ({}) exceeds max_connections ({})",
                config.min_connections, config.max_connections
            )));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
