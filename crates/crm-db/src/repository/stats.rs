//! # Statistics Repository
//!
//! Read-only aggregates over customers, visits and payments.
//!
//! ## Counting Through Joins
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customer ─┬─ visit 1 ─┬─ payment 50,000                               │
//! │            │           └─ payment 25,000                               │
//! │            └─ visit 2     (no payment)                                 │
//! │                                                                         │
//! │  LEFT JOIN rows:   3                                                   │
//! │  COUNT(v.visit_id) 3   ✗  (visit 1 counted once per payment)           │
//! │  COUNT(DISTINCT)   2   ✓                                               │
//! │  SUM(p.amount)     75,000                                              │
//! │  AVG(p.amount)     37,500  (NULL payment rows are skipped)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `SUM`/`AVG` is wrapped in `COALESCE(.., 0)`, so a customer or month
//! with no payments reports zero rather than NULL.

use chrono::{Datelike, NaiveDate};
use sqlx::FromRow;
use tracing::debug;

use crm_core::{
    CustomerId, CustomerStatistics, DashboardSummary, Money, MonthlyStatistics,
    OverallStatistics, ValidationError, YearMonth,
};

use super::customer::CustomerRepository;
use super::visit::VisitRepository;
use crate::error::DbResult;
use crate::executor::QueryExecutor;
use crate::params;

/// Calendar years SQLite's date functions handle.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Longest trend window, one hundred years of months.
const MAX_TREND_MONTHS: u32 = 1200;

/// Monthly aggregate row; the year and month are added by the caller.
#[derive(Debug, FromRow)]
struct MonthlyTotals {
    unique_customers: i64,
    total_visits: i64,
    total_revenue: Money,
    avg_revenue_per_visit: f64,
}

/// Repository for aggregate statistics.
///
/// ## Usage
/// ```rust,ignore
/// let stats = db.stats();
/// let alice = stats.get_customer_statistics(alice_id).await?;
/// let trend = stats.get_recent_monthly_statistics(2026, 10, 6).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StatsRepository {
    exec: QueryExecutor,
}

impl StatsRepository {
    /// Creates a new StatsRepository.
    pub fn new(exec: QueryExecutor) -> Self {
        StatsRepository { exec }
    }

    /// Number of visits recorded for a customer (0 for unknown ids).
    pub async fn total_visits_by_customer(&self, customer_id: CustomerId) -> DbResult<i64> {
        self.exec
            .fetch_scalar(
                "SELECT COUNT(*) FROM visit WHERE customer_id = ?1",
                &params![customer_id],
            )
            .await
    }

    /// Sum of all payments across a customer's visits.
    pub async fn total_payment_by_customer(&self, customer_id: CustomerId) -> DbResult<Money> {
        let total: i64 = self
            .exec
            .fetch_scalar(
                r#"
                SELECT COALESCE(SUM(p.amount), 0)
                FROM payment p
                JOIN visit v ON p.visit_id = v.visit_id
                WHERE v.customer_id = ?1
                "#,
                &params![customer_id],
            )
            .await?;

        Ok(Money::new(total))
    }

    /// Visit count, payment totals and first/last visit of one customer.
    ///
    /// ## Returns
    /// * `Ok(None)` - No such customer
    /// * `Ok(Some(stats))` - Zero totals for a customer with no visits
    pub async fn get_customer_statistics(
        &self,
        customer_id: CustomerId,
    ) -> DbResult<Option<CustomerStatistics>> {
        debug!(customer_id, "Computing customer statistics");

        self.exec
            .fetch_optional(
                r#"
                SELECT
                    c.customer_id,
                    c.name,
                    COUNT(DISTINCT v.visit_id)  AS total_visits,
                    COALESCE(SUM(p.amount), 0)  AS total_payment,
                    COALESCE(AVG(p.amount), 0.0) AS avg_payment,
                    MIN(v.visit_date)           AS first_visit_date,
                    MAX(v.visit_date)           AS last_visit_date
                FROM customer c
                LEFT JOIN visit v ON c.customer_id = v.customer_id
                LEFT JOIN payment p ON v.visit_id = p.visit_id
                WHERE c.customer_id = ?1
                GROUP BY c.customer_id, c.name
                "#,
                &params![customer_id],
            )
            .await
    }

    /// Statistics for every customer, ordered by name.
    pub async fn get_all_customer_statistics(&self) -> DbResult<Vec<CustomerStatistics>> {
        self.exec
            .fetch_all(
                r#"
                SELECT
                    c.customer_id,
                    c.name,
                    COUNT(DISTINCT v.visit_id)  AS total_visits,
                    COALESCE(SUM(p.amount), 0)  AS total_payment,
                    COALESCE(AVG(p.amount), 0.0) AS avg_payment,
                    MIN(v.visit_date)           AS first_visit_date,
                    MAX(v.visit_date)           AS last_visit_date
                FROM customer c
                LEFT JOIN visit v ON c.customer_id = v.customer_id
                LEFT JOIN payment p ON v.visit_id = p.visit_id
                GROUP BY c.customer_id, c.name
                ORDER BY c.name, c.customer_id
                "#,
                &[],
            )
            .await
    }

    /// Store-wide totals.
    ///
    /// Each figure comes from its own table, so payments never inflate the
    /// visit count and customers without visits still count.
    pub async fn get_overall_statistics(&self) -> DbResult<OverallStatistics> {
        let overall: Option<OverallStatistics> = self
            .exec
            .fetch_optional(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM customer)                        AS total_customers,
                    (SELECT COUNT(*) FROM visit)                           AS total_visits,
                    (SELECT COALESCE(SUM(amount), 0) FROM payment)         AS total_revenue,
                    (SELECT COALESCE(AVG(amount), 0.0) FROM payment)       AS avg_revenue_per_visit,
                    (SELECT COUNT(DISTINCT DATE(visit_date)) FROM visit)   AS total_visit_days
                "#,
                &[],
            )
            .await?;

        // A SELECT without FROM always yields one row.
        Ok(overall.unwrap_or(OverallStatistics {
            total_customers: 0,
            total_visits: 0,
            total_revenue: Money::zero(),
            avg_revenue_per_visit: 0.0,
            total_visit_days: 0,
        }))
    }

    /// Unique customers, visits and revenue for one calendar month.
    ///
    /// Month must be 1..=12 and year 1..=9999.
    pub async fn get_monthly_statistics(&self, year: i32, month: u32) -> DbResult<MonthlyStatistics> {
        let period = YearMonth::new(year, month)?;
        self.monthly(period).await
    }

    /// The `months` calendar months ending at `year`/`month`, newest first.
    ///
    /// `get_recent_monthly_statistics(2026, 2, 3)` covers February 2026,
    /// January 2026 and December 2025. `months` is at most 1200, and the
    /// whole window must fall within years 1..=9999.
    pub async fn get_recent_monthly_statistics(
        &self,
        year: i32,
        month: u32,
        months: u32,
    ) -> DbResult<Vec<MonthlyStatistics>> {
        let latest = YearMonth::new(year, month)?;

        if months > MAX_TREND_MONTHS {
            return Err(ValidationError::OutOfRange {
                field: "months".to_string(),
                min: 0,
                max: i64::from(MAX_TREND_MONTHS),
            }
            .into());
        }

        let window: Vec<YearMonth> = latest.trailing(months).collect();
        if window.len() < months as usize {
            return Err(year_out_of_range().into());
        }
        for period in &window {
            month_bounds(*period)?;
        }

        let mut trend = Vec::new();
        for period in window {
            trend.push(self.monthly(period).await?);
        }
        Ok(trend)
    }

    /// Overall totals, this month's birthdays and the latest visits.
    pub async fn get_dashboard(
        &self,
        today: NaiveDate,
        recent_visit_limit: u32,
    ) -> DbResult<DashboardSummary> {
        let overall = self.get_overall_statistics().await?;
        let birthday_customers = CustomerRepository::new(self.exec.clone())
            .get_by_birth_month(today.month())
            .await?;
        let recent_visits = VisitRepository::new(self.exec.clone())
            .get_recent(recent_visit_limit)
            .await?;

        Ok(DashboardSummary {
            overall,
            birthday_customers,
            recent_visits,
        })
    }

    async fn monthly(&self, period: YearMonth) -> DbResult<MonthlyStatistics> {
        let (start, end) = month_bounds(period)?;

        debug!(year = period.year(), month = period.month(), "Computing monthly statistics");

        let totals: Option<MonthlyTotals> = self
            .exec
            .fetch_optional(
                r#"
                SELECT
                    COUNT(DISTINCT v.customer_id) AS unique_customers,
                    COUNT(DISTINCT v.visit_id)    AS total_visits,
                    COALESCE(SUM(p.amount), 0)    AS total_revenue,
                    COALESCE(AVG(p.amount), 0.0)  AS avg_revenue_per_visit
                FROM visit v
                LEFT JOIN payment p ON v.visit_id = p.visit_id
                WHERE v.visit_date >= ?1 AND v.visit_date < ?2
                "#,
                &params![start, end],
            )
            .await?;

        let totals = totals.unwrap_or(MonthlyTotals {
            unique_customers: 0,
            total_visits: 0,
            total_revenue: Money::zero(),
            avg_revenue_per_visit: 0.0,
        });

        Ok(MonthlyStatistics {
            year: period.year(),
            month: period.month(),
            unique_customers: totals.unique_customers,
            total_visits: totals.total_visits,
            total_revenue: totals.total_revenue,
            avg_revenue_per_visit: totals.avg_revenue_per_visit,
        })
    }
}

/// Half-open `[first day, first day of next month)` bounds of a month.
fn month_bounds(period: YearMonth) -> DbResult<(NaiveDate, NaiveDate)> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&period.year()) {
        return Err(year_out_of_range().into());
    }

    let start = period.first_day().ok_or_else(year_out_of_range)?;
    let end = period
        .next()
        .and_then(|m| m.first_day())
        .ok_or_else(year_out_of_range)?;
    Ok((start, end))
}

fn year_out_of_range() -> ValidationError {
    ValidationError::OutOfRange {
        field: "year".to_string(),
        min: i64::from(MIN_YEAR),
        max: i64::from(MAX_YEAR),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use chrono::NaiveDateTime;
    use crm_core::{CoreError, NewCustomer, NewPayment, NewVisit, VisitId};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    async fn customer(db: &Database, name: &str, birth: Option<NaiveDate>) -> CustomerId {
        db.customers()
            .create(&NewCustomer {
                name: name.to_string(),
                phone: "010-0000-0000".to_string(),
                birth_date: birth,
                gender: None,
                memo: None,
            })
            .await
            .unwrap()
    }

    async fn visit(db: &Database, customer_id: CustomerId, ts: &str) -> VisitId {
        db.visits()
            .create(
                customer_id,
                &NewVisit {
                    visit_date: at(ts),
                    memo: None,
                },
            )
            .await
            .unwrap()
    }

    async fn pay(db: &Database, visit_id: VisitId, amount: i64, ts: &str) {
        db.payments()
            .create(
                visit_id,
                &NewPayment {
                    amount: Money::new(amount),
                    payment_method_code: "CARD".to_string(),
                    payment_datetime: at(ts),
                },
            )
            .await
            .unwrap();
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_single_paid_visit() {
        let db = db().await;
        let alice = customer(&db, "Alice", None).await;
        let v = visit(&db, alice, "2026-01-05 10:00:00").await;
        pay(&db, v, 50_000, "2026-01-05 10:30:00").await;

        let stats = db.stats();
        assert_eq!(stats.total_visits_by_customer(alice).await.unwrap(), 1);
        assert_eq!(
            stats.total_payment_by_customer(alice).await.unwrap(),
            Money::new(50_000)
        );

        let s = stats.get_customer_statistics(alice).await.unwrap().unwrap();
        assert_eq!(s.name, "Alice");
        assert_eq!(s.total_visits, 1);
        assert_eq!(s.total_payment, Money::new(50_000));
        assert_eq!(s.first_visit_date, Some(at("2026-01-05 10:00:00")));
        assert_eq!(s.last_visit_date, Some(at("2026-01-05 10:00:00")));
    }

    #[tokio::test]
    async fn test_two_payments_sum_and_average() {
        let db = db().await;
        let alice = customer(&db, "Alice", None).await;
        let v = visit(&db, alice, "2026-01-05 10:00:00").await;
        pay(&db, v, 50_000, "2026-01-05 10:30:00").await;
        pay(&db, v, 25_000, "2026-01-05 10:31:00").await;

        let s = db
            .stats()
            .get_customer_statistics(alice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.total_payment, Money::new(75_000));
        assert_eq!(s.avg_payment, 37_500.0);
        // Two payment rows, still one visit.
        assert_eq!(s.total_visits, 1);
    }

    #[tokio::test]
    async fn test_customer_without_activity_reports_zero() {
        let db = db().await;
        let bob = customer(&db, "Bob", None).await;
        let stats = db.stats();

        assert_eq!(stats.total_visits_by_customer(bob).await.unwrap(), 0);
        assert_eq!(
            stats.total_payment_by_customer(bob).await.unwrap(),
            Money::zero()
        );

        let s = stats.get_customer_statistics(bob).await.unwrap().unwrap();
        assert_eq!(s.total_visits, 0);
        assert_eq!(s.total_payment, Money::zero());
        assert_eq!(s.avg_payment, 0.0);
        assert_eq!(s.first_visit_date, None);

        // A visit with no payment still has a zero total.
        visit(&db, bob, "2026-01-05 10:00:00").await;
        assert_eq!(
            stats.total_payment_by_customer(bob).await.unwrap(),
            Money::zero()
        );
    }

    #[tokio::test]
    async fn test_unknown_customer_statistics_is_none() {
        let db = db().await;
        assert_eq!(db.stats().get_customer_statistics(42).await.unwrap(), None);
        assert_eq!(db.stats().total_visits_by_customer(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_all_customer_statistics_ordered_by_name() {
        let db = db().await;
        let zoe = customer(&db, "Zoe", None).await;
        customer(&db, "Adam", None).await;
        let v = visit(&db, zoe, "2026-01-05 10:00:00").await;
        pay(&db, v, 10_000, "2026-01-05 10:30:00").await;

        let all = db.stats().get_all_customer_statistics().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Adam");
        assert_eq!(all[0].total_payment, Money::zero());
        assert_eq!(all[1].total_payment, Money::new(10_000));
    }

    #[tokio::test]
    async fn test_overall_statistics() {
        let db = db().await;
        let stats = db.stats();

        let empty = stats.get_overall_statistics().await.unwrap();
        assert_eq!(empty.total_customers, 0);
        assert_eq!(empty.total_revenue, Money::zero());
        assert_eq!(empty.avg_revenue_per_visit, 0.0);

        let alice = customer(&db, "Alice", None).await;
        customer(&db, "Bob", None).await;
        let v1 = visit(&db, alice, "2026-01-05 10:00:00").await;
        let v2 = visit(&db, alice, "2026-01-05 15:00:00").await;
        visit(&db, alice, "2026-01-06 10:00:00").await;
        pay(&db, v1, 50_000, "2026-01-05 10:30:00").await;
        pay(&db, v1, 25_000, "2026-01-05 10:31:00").await;
        pay(&db, v2, 15_000, "2026-01-05 15:30:00").await;

        let overall = stats.get_overall_statistics().await.unwrap();
        assert_eq!(overall.total_customers, 2);
        assert_eq!(overall.total_visits, 3);
        assert_eq!(overall.total_revenue, Money::new(90_000));
        assert_eq!(overall.avg_revenue_per_visit, 30_000.0);
        assert_eq!(overall.total_visit_days, 2);
    }

    #[tokio::test]
    async fn test_monthly_statistics_bounds() {
        let db = db().await;
        let alice = customer(&db, "Alice", None).await;
        let bob = customer(&db, "Bob", None).await;
        let jan_first = visit(&db, alice, "2026-01-01 00:00:00").await;
        let jan_last = visit(&db, bob, "2026-01-31 23:59:59").await;
        visit(&db, alice, "2026-02-01 00:00:00").await;
        visit(&db, bob, "2025-12-31 23:59:59").await;
        pay(&db, jan_first, 20_000, "2026-01-01 00:10:00").await;
        pay(&db, jan_last, 40_000, "2026-01-31 23:59:59").await;

        let jan = db.stats().get_monthly_statistics(2026, 1).await.unwrap();
        assert_eq!((jan.year, jan.month), (2026, 1));
        assert_eq!(jan.unique_customers, 2);
        assert_eq!(jan.total_visits, 2);
        assert_eq!(jan.total_revenue, Money::new(60_000));
        assert_eq!(jan.avg_revenue_per_visit, 30_000.0);

        let empty = db.stats().get_monthly_statistics(2024, 6).await.unwrap();
        assert_eq!(empty.total_visits, 0);
        assert_eq!(empty.total_revenue, Money::zero());
    }

    #[tokio::test]
    async fn test_monthly_statistics_rejects_bad_month() {
        let db = db().await;
        let err = db.stats().get_monthly_statistics(2026, 13).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidMonth(13))));

        let err = db.stats().get_monthly_statistics(0, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_recent_months_cross_year_boundary() {
        let db = db().await;
        let alice = customer(&db, "Alice", None).await;
        visit(&db, alice, "2025-12-15 10:00:00").await;
        visit(&db, alice, "2026-02-03 10:00:00").await;

        let trend = db
            .stats()
            .get_recent_monthly_statistics(2026, 2, 3)
            .await
            .unwrap();
        let periods: Vec<(i32, u32, i64)> = trend
            .iter()
            .map(|m| (m.year, m.month, m.total_visits))
            .collect();
        assert_eq!(periods, vec![(2026, 2, 1), (2026, 1, 0), (2025, 12, 1)]);

        assert!(db
            .stats()
            .get_recent_monthly_statistics(2026, 2, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_recent_months_reject_window_before_year_one() {
        let db = db().await;
        let stats = db.stats();

        let err = stats
            .get_recent_monthly_statistics(i32::MIN, 1, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "year"
        ));

        // February of year 1 back three months reaches year 0.
        let err = stats
            .get_recent_monthly_statistics(1, 2, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::OutOfRange { .. })));

        assert_eq!(
            stats.get_recent_monthly_statistics(1, 2, 2).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_recent_months_reject_oversized_window() {
        let db = db().await;
        let stats = db.stats();

        let err = stats
            .get_recent_monthly_statistics(2026, 1, u32::MAX)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::OutOfRange { ref field, max: 1200, .. }) if field == "months"
        ));

        assert_eq!(
            stats
                .get_recent_monthly_statistics(2026, 1, MAX_TREND_MONTHS)
                .await
                .unwrap()
                .len(),
            1200
        );
    }

    #[tokio::test]
    async fn test_dashboard() {
        let db = db().await;
        let alice = customer(&db, "Alice", NaiveDate::from_ymd_opt(1990, 10, 3)).await;
        customer(&db, "Bob", NaiveDate::from_ymd_opt(1988, 4, 9)).await;
        for ts in [
            "2026-10-01 10:00:00",
            "2026-10-02 10:00:00",
            "2026-10-03 10:00:00",
        ] {
            visit(&db, alice, ts).await;
        }

        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let dashboard = db.stats().get_dashboard(today, 2).await.unwrap();

        assert_eq!(dashboard.overall.total_visits, 3);
        assert_eq!(dashboard.birthday_customers.len(), 1);
        assert_eq!(dashboard.birthday_customers[0].name, "Alice");
        assert_eq!(dashboard.recent_visits.len(), 2);
        assert_eq!(
            dashboard.recent_visits[0].visit_date,
            at("2026-10-03 10:00:00")
        );
    }
}
