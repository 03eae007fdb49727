//! # Repository Module
//!
//! Entity repositories for the CRM.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Web handler                                                           │
//! │       │                                                                 │
//! │       │  db.customers().search("kim")                                  │
//! │       ▼                                                                 │
//! │  CustomerRepository / VisitRepository / PaymentRepository              │
//! │  StatsRepository (read-only aggregates)                                │
//! │       │                                                                 │
//! │       │  parameterized SQL + SqlParam values                           │
//! │       ▼                                                                 │
//! │  QueryExecutor ── one pooled connection per statement                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer CRUD, search, birthdays
//! - [`VisitRepository`](visit::VisitRepository) - Visits, date ranges, recent feed
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and payment methods
//! - [`StatsRepository`](stats::StatsRepository) - Per-customer, overall and monthly totals

pub mod customer;
pub mod payment;
pub mod stats;
pub mod visit;

/// Turns a search term into a `LIKE` pattern matching it anywhere.
///
/// The term is trimmed and `%`, `_` and `\` are escaped, so queries using
/// the pattern must say `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let term = term.trim();
    let mut pattern = String::with_capacity(term.len() + 2);

    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern(" kim "), "%kim%");
        assert_eq!(contains_pattern(""), "%%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
