//! # Statistics Types
//!
//! Shapes returned by the aggregation layer, plus calendar-month arithmetic
//! used to bound monthly queries.
//!
//! ## Zero Coercion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQL:   SUM(amount) over zero rows  →  NULL                            │
//! │  Here:  total_payment: Money        →  Money(0)                        │
//! │                                                                         │
//! │  No field below is optional unless "no value" is a real answer         │
//! │  (e.g. last_visit_date of a customer who never visited).               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;
use crate::types::{Customer, CustomerId, VisitDetail};

// =============================================================================
// Per-customer statistics
// =============================================================================

/// Visit and payment totals for one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerStatistics {
    pub customer_id: CustomerId,
    pub name: String,
    pub total_visits: i64,
    pub total_payment: Money,
    /// Mean payment amount (0.0 when the customer never paid).
    pub avg_payment: f64,
    #[ts(as = "Option<String>")]
    pub first_visit_date: Option<NaiveDateTime>,
    #[ts(as = "Option<String>")]
    pub last_visit_date: Option<NaiveDateTime>,
}

// =============================================================================
// Store-wide statistics
// =============================================================================

/// Totals across every customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OverallStatistics {
    pub total_customers: i64,
    pub total_visits: i64,
    pub total_revenue: Money,
    pub avg_revenue_per_visit: f64,
    /// Number of distinct calendar days with at least one visit.
    pub total_visit_days: i64,
}

/// Totals for visits falling in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyStatistics {
    pub year: i32,
    pub month: u32,
    pub unique_customers: i64,
    pub total_visits: i64,
    pub total_revenue: Money,
    pub avg_revenue_per_visit: f64,
}

/// Everything the home dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub overall: OverallStatistics,
    /// Customers whose birthday falls in the current month.
    pub birthday_customers: Vec<Customer>,
    pub recent_visits: Vec<VisitDetail>,
}

// =============================================================================
// Year / Month
// =============================================================================

/// A validated calendar month.
///
/// ## Example
/// ```rust
/// use crm_core::stats::YearMonth;
///
/// let oct = YearMonth::new(2026, 10).unwrap();
/// let window: Vec<_> = oct.trailing(3).collect();
/// assert_eq!(window[2], YearMonth::new(2026, 8).unwrap());
///
/// assert!(YearMonth::new(2026, 13).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a year/month, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonth(month));
        }
        Ok(YearMonth { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn month(&self) -> u32 {
        self.month
    }

    /// The calendar month before this one, or `None` past the first
    /// representable year.
    pub fn previous(&self) -> Option<Self> {
        if self.month == 1 {
            Some(YearMonth {
                year: self.year.checked_sub(1)?,
                month: 12,
            })
        } else {
            Some(YearMonth {
                year: self.year,
                month: self.month - 1,
            })
        }
    }

    /// The calendar month after this one, or `None` past the last
    /// representable year.
    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            Some(YearMonth {
                year: self.year.checked_add(1)?,
                month: 1,
            })
        } else {
            Some(YearMonth {
                year: self.year,
                month: self.month + 1,
            })
        }
    }

    /// First day of the month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// `count` months ending at (and including) this one, newest first.
    ///
    /// Stops early if the window would run past `i32::MIN`.
    pub fn trailing(self, count: u32) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(self), YearMonth::previous).take(count as usize)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
