//! # Database Pool Management
//!
//! The Connection Provider: pool creation, connection checkout and the
//! handle that hands out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process start                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env() ← one explicit configuration value               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ open_connection(): one checkout per statement,                 │
//! │       │ returned to the pool when the guard drops                      │
//! │       ▼                                                                 │
//! │  QueryExecutor ──► customers() / visits() / payments() / stats()       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Autocommit
//! Statements run outside explicit transactions, so SQLite commits each one
//! on its own. A visit insert followed by a payment insert are two commits.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::executor::QueryExecutor;
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::stats::StatsRepository;
use crate::repository::visit::VisitRepository;

// =============================================================================
// Connection Provider
// =============================================================================

/// Checks a connection out of the pool.
///
/// Failures (pool closed, acquire timeout, unreadable file) are logged with
/// their cause and returned as `DbError`; the caller never sees a panic or a
/// silent `None`.
pub(crate) async fn open_connection(pool: &SqlitePool) -> DbResult<PoolConnection<Sqlite>> {
    match pool.acquire().await {
        Ok(conn) => Ok(conn),
        Err(sqlx::Error::PoolTimedOut) => {
            warn!(
                size = pool.size(),
                idle = pool.num_idle(),
                "Timed out waiting for a database connection"
            );
            Err(DbError::PoolExhausted)
        }
        Err(e) => {
            error!(error = %e, "Failed to open database connection");
            Err(DbError::ConnectionFailed(e.to_string()))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; every clone shares the same pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
/// let alice_id = db.customers().create(&new_customer).await?;
/// let stats = db.stats().get_customer_statistics(alice_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled (the cascade policy lives in the schema)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            // An idle in-memory connection must never be reaped: the data goes with it.
            .idle_timeout(if config.is_in_memory() {
                None
            } else {
                Some(config.idle_timeout)
            })
            .max_lifetime(if config.is_in_memory() {
                None
            } else {
                Some(std::time::Duration::from_secs(30 * 60))
            })
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create database pool");
                DbError::ConnectionFailed(e.to_string())
            })?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Checks out one connection (scoped: returned to the pool on drop).
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        open_connection(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the query executor for ad-hoc parameterized statements.
    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.pool.clone())
    }

    /// Returns the customer repository.
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.executor())
    }

    /// Returns the visit repository.
    pub fn visits(&self) -> VisitRepository {
        VisitRepository::new(self.executor())
    }

    /// Returns the payment repository.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.executor())
    }

    /// Returns the statistics (aggregation) repository.
    pub fn stats(&self) -> StatsRepository {
        StatsRepository::new(self.executor())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations fail with
    /// `DbError::ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
