//! # crm-core: Domain Types for the Customer CRM
//!
//! This crate holds everything about customers, visits and payments that
//! does not touch the database: entity types, the statistics shapes the
//! dashboards render, integer money, and validation of form input.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CRM Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Web layer (routes, templates)                    │   │
//! │  │   customer list ──► customer detail ──► visits ──► payments     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain scalar values                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ crm-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   stats   │  │ validation│  │   │
//! │  │   │ Customer  │  │   Money   │  │ Overall   │  │   rules   │  │   │
//! │  │   │ Visit     │  │           │  │ Monthly   │  │  checks   │  │   │
//! │  │   │ Payment   │  │           │  │ YearMonth │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    crm-db (Data-access layer)                   │   │
//! │  │        executor, repositories, aggregation, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Customer, Visit, Payment, PaymentMethod) and read models
//! - [`stats`] - Aggregate shapes and calendar-month arithmetic
//! - [`money`] - Integer money (no floating point for stored amounts)
//! - [`error`] - Domain error types
//! - [`validation`] - Form input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use crm_core::money::Money;
//! use crm_core::stats::YearMonth;
//!
//! let total = Money::new(50_000) + Money::new(25_000);
//! assert_eq!(total.amount(), 75_000);
//!
//! let month = YearMonth::new(2026, 1).unwrap();
//! assert_eq!(month.previous(), YearMonth::new(2025, 12).ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use stats::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a customer name.
pub const MAX_NAME_LEN: usize = 50;

/// Maximum length of a phone number as typed into the form.
pub const MAX_PHONE_LEN: usize = 20;

/// Maximum length of a free-text memo.
pub const MAX_MEMO_LEN: usize = 1000;

/// Number of trailing months shown on the statistics dashboard.
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Number of recent visits shown on the home dashboard.
pub const DEFAULT_RECENT_VISITS: u32 = 5;
