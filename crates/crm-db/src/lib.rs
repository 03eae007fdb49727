//! # crm-db: Data-Access Layer for the Customer CRM
//!
//! Persistence for customers, visits, payments and the statistics built on
//! them. SQLite through sqlx, one pooled connection per statement.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CRM Data Flow                                    │
//! │                                                                         │
//! │  Web handler (customer list, visit form, stats page)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     crm-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ VisitRepo     │    │ 001_init.sql │  │   │
//! │  │   │ DbConfig      │    │ PaymentRepo   │    │ 002_methods  │  │   │
//! │  │   │ QueryExecutor │    │ StatsRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (CRM_DB_PATH, default ./crm_db.sqlite)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `DbConfig` from builder or environment
//! - [`pool`] - Connection provider and the `Database` handle
//! - [`executor`] - Parameterized statement execution
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Customer, visit, payment and statistics repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crm_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let alice = db.customers().create(&new_customer).await?;
//! let visit = db.visits().create(alice, &new_visit).await?;
//! db.payments().create(visit, &new_payment).await?;
//!
//! let stats = db.stats().get_customer_statistics(alice).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod executor;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult};
pub use executor::{FetchMode, QueryExecutor, QueryOutcome, QueryOutput, Record, SqlParam};
pub use pool::Database;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::payment::PaymentRepository;
pub use repository::stats::StatsRepository;
pub use repository::visit::VisitRepository;
