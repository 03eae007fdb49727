//! # Visit Repository
//!
//! Recording and listing customer visits. List queries join the customer's
//! name so pages don't need a second lookup; they are ordered most recent
//! first with the visit id as tie-breaker.

use chrono::NaiveDate;
use tracing::debug;

use crm_core::validation::{validate_memo, validate_visit};
use crm_core::{CoreError, CustomerId, NewVisit, Visit, VisitDetail, VisitId};

use super::contains_pattern;
use crate::error::{DbError, DbResult};
use crate::executor::QueryExecutor;
use crate::params;

/// Repository for visit database operations.
#[derive(Debug, Clone)]
pub struct VisitRepository {
    exec: QueryExecutor,
}

impl VisitRepository {
    /// Creates a new VisitRepository.
    pub fn new(exec: QueryExecutor) -> Self {
        VisitRepository { exec }
    }

    /// Records a visit for an existing customer.
    ///
    /// ## Returns
    /// * `Ok(id)` - Visit recorded
    /// * `Err(DbError::ForeignKeyViolation)` - Customer doesn't exist
    pub async fn create(&self, customer_id: CustomerId, visit: &NewVisit) -> DbResult<VisitId> {
        validate_visit(visit)?;

        debug!(customer_id, visit_date = %visit.visit_date, "Recording visit");

        let outcome = self
            .exec
            .run(
                r#"
                INSERT INTO visit (customer_id, visit_date, memo)
                VALUES (?1, ?2, ?3)
                "#,
                &params![customer_id, visit.visit_date, visit.memo.as_deref()],
            )
            .await?;

        Ok(outcome.last_insert_id)
    }

    /// Every visit with its customer's name, most recent first.
    pub async fn get_all(&self) -> DbResult<Vec<VisitDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT v.visit_id, v.customer_id, v.visit_date, v.memo,
                       c.name AS customer_name
                FROM visit v
                JOIN customer c ON v.customer_id = c.customer_id
                ORDER BY v.visit_date DESC, v.visit_id DESC
                "#,
                &[],
            )
            .await
    }

    /// Gets a visit by id.
    pub async fn get_by_id(&self, visit_id: VisitId) -> DbResult<Option<Visit>> {
        self.exec
            .fetch_optional(
                r#"
                SELECT visit_id, customer_id, visit_date, memo
                FROM visit
                WHERE visit_id = ?1
                "#,
                &params![visit_id],
            )
            .await
    }

    /// Visits of one customer, most recent first.
    pub async fn get_by_customer(&self, customer_id: CustomerId) -> DbResult<Vec<VisitDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT v.visit_id, v.customer_id, v.visit_date, v.memo,
                       c.name AS customer_name
                FROM visit v
                JOIN customer c ON v.customer_id = c.customer_id
                WHERE v.customer_id = ?1
                ORDER BY v.visit_date DESC, v.visit_id DESC
                "#,
                &params![customer_id],
            )
            .await
    }

    /// Visits whose calendar date lies in `start..=end`.
    ///
    /// A visit at 18:00 on `end` is included.
    ///
    /// ## Returns
    /// * `Err(DbError::Core(CoreError::InvalidDateRange))` - `start` is after `end`
    pub async fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<VisitDetail>> {
        if start > end {
            return Err(CoreError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }

        debug!(%start, %end, "Listing visits by date range");

        self.exec
            .fetch_all(
                r#"
                SELECT v.visit_id, v.customer_id, v.visit_date, v.memo,
                       c.name AS customer_name
                FROM visit v
                JOIN customer c ON v.customer_id = c.customer_id
                WHERE DATE(v.visit_date) BETWEEN ?1 AND ?2
                ORDER BY v.visit_date DESC, v.visit_id DESC
                "#,
                &params![start, end],
            )
            .await
    }

    /// Substring search over visit memo and customer name.
    pub async fn search(&self, term: &str) -> DbResult<Vec<VisitDetail>> {
        let pattern = contains_pattern(term);

        self.exec
            .fetch_all(
                r#"
                SELECT v.visit_id, v.customer_id, v.visit_date, v.memo,
                       c.name AS customer_name
                FROM visit v
                JOIN customer c ON v.customer_id = c.customer_id
                WHERE v.memo LIKE ?1 ESCAPE '\'
                   OR c.name LIKE ?1 ESCAPE '\'
                ORDER BY v.visit_date DESC, v.visit_id DESC
                "#,
                &params![pattern],
            )
            .await
    }

    /// Replaces customer, date and memo of an existing visit.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Visit doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - New customer doesn't exist
    pub async fn update(&self, visit: &Visit) -> DbResult<()> {
        validate_memo(visit.memo.as_deref())?;

        debug!(visit_id = visit.visit_id, "Updating visit");

        let outcome = self
            .exec
            .run(
                r#"
                UPDATE visit SET
                    customer_id = ?2,
                    visit_date = ?3,
                    memo = ?4
                WHERE visit_id = ?1
                "#,
                &params![
                    visit.visit_id,
                    visit.customer_id,
                    visit.visit_date,
                    visit.memo.as_deref(),
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Visit", visit.visit_id));
        }

        Ok(())
    }

    /// Rewrites only the memo of a visit. `None` clears it.
    pub async fn update_memo(&self, visit_id: VisitId, memo: Option<&str>) -> DbResult<()> {
        validate_memo(memo)?;

        let outcome = self
            .exec
            .run(
                "UPDATE visit SET memo = ?2 WHERE visit_id = ?1",
                &params![visit_id, memo],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Visit", visit_id));
        }

        Ok(())
    }

    /// Deletes a visit and its payments. Unknown ids remove nothing.
    pub async fn delete(&self, visit_id: VisitId) -> DbResult<u64> {
        debug!(visit_id, "Deleting visit");

        let outcome = self
            .exec
            .run("DELETE FROM visit WHERE visit_id = ?1", &params![visit_id])
            .await?;

        Ok(outcome.rows_affected)
    }

    /// The `limit` most recent visits (dashboard feed).
    pub async fn get_recent(&self, limit: u32) -> DbResult<Vec<VisitDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT v.visit_id, v.customer_id, v.visit_date, v.memo,
                       c.name AS customer_name
                FROM visit v
                JOIN customer c ON v.customer_id = c.customer_id
                ORDER BY v.visit_date DESC, v.visit_id DESC
                LIMIT ?1
                "#,
                &params![limit],
            )
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
