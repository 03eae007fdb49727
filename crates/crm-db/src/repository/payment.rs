//! # Payment Repository
//!
//! Payments recorded against visits, and the payment-method lookup.
//!
//! ## Joined Shape
//! ```text
//! payment p ── visit v ── customer c
//!     │
//!     └── payment_method pm   (method_code → method_name)
//! ```
//! Every list returns [`PaymentDetail`] ordered by payment time, most recent
//! first, payment id as tie-breaker.

use tracing::debug;

use crm_core::validation::validate_payment;
use crm_core::{
    CustomerId, NewPayment, Payment, PaymentDetail, PaymentId, PaymentMethod, VisitId,
};

use super::contains_pattern;
use crate::error::{DbError, DbResult};
use crate::executor::QueryExecutor;
use crate::params;

/// Repository for payment database operations.
///
/// ## Usage
/// ```rust,ignore
/// let id = db.payments().create(visit_id, &new_payment).await?;
/// let history = db.payments().get_by_customer(customer_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    exec: QueryExecutor,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(exec: QueryExecutor) -> Self {
        PaymentRepository { exec }
    }

    /// Records a payment for an existing visit.
    ///
    /// ## Returns
    /// * `Ok(id)` - Payment recorded
    /// * `Err(DbError::Validation)` - Non-positive amount or malformed code
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown visit or method code
    pub async fn create(&self, visit_id: VisitId, payment: &NewPayment) -> DbResult<PaymentId> {
        validate_payment(payment)?;

        debug!(
            visit_id,
            amount = payment.amount.amount(),
            method = %payment.payment_method_code,
            "Recording payment"
        );

        let outcome = self
            .exec
            .run(
                r#"
                INSERT INTO payment (visit_id, amount, payment_method_code, payment_datetime)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                &params![
                    visit_id,
                    payment.amount,
                    &payment.payment_method_code,
                    payment.payment_datetime,
                ],
            )
            .await?;

        Ok(outcome.last_insert_id)
    }

    /// Every payment with customer and method name, most recent first.
    pub async fn get_all(&self) -> DbResult<Vec<PaymentDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT p.payment_id, p.visit_id, p.amount, p.payment_method_code,
                       p.payment_datetime, v.customer_id, c.name AS customer_name,
                       v.visit_date, pm.method_name
                FROM payment p
                JOIN visit v ON p.visit_id = v.visit_id
                JOIN customer c ON v.customer_id = c.customer_id
                JOIN payment_method pm ON p.payment_method_code = pm.method_code
                ORDER BY p.payment_datetime DESC, p.payment_id DESC
                "#,
                &[],
            )
            .await
    }

    /// Gets a payment by id.
    pub async fn get_by_id(&self, payment_id: PaymentId) -> DbResult<Option<Payment>> {
        self.exec
            .fetch_optional(
                r#"
                SELECT payment_id, visit_id, amount, payment_method_code, payment_datetime
                FROM payment
                WHERE payment_id = ?1
                "#,
                &params![payment_id],
            )
            .await
    }

    /// Payment history of one customer across all their visits.
    pub async fn get_by_customer(&self, customer_id: CustomerId) -> DbResult<Vec<PaymentDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT p.payment_id, p.visit_id, p.amount, p.payment_method_code,
                       p.payment_datetime, v.customer_id, c.name AS customer_name,
                       v.visit_date, pm.method_name
                FROM payment p
                JOIN visit v ON p.visit_id = v.visit_id
                JOIN customer c ON v.customer_id = c.customer_id
                JOIN payment_method pm ON p.payment_method_code = pm.method_code
                WHERE v.customer_id = ?1
                ORDER BY p.payment_datetime DESC, p.payment_id DESC
                "#,
                &params![customer_id],
            )
            .await
    }

    /// Payments made during one visit.
    pub async fn get_by_visit(&self, visit_id: VisitId) -> DbResult<Vec<PaymentDetail>> {
        self.exec
            .fetch_all(
                r#"
                SELECT p.payment_id, p.visit_id, p.amount, p.payment_method_code,
                       p.payment_datetime, v.customer_id, c.name AS customer_name,
                       v.visit_date, pm.method_name
                FROM payment p
                JOIN visit v ON p.visit_id = v.visit_id
                JOIN customer c ON v.customer_id = c.customer_id
                JOIN payment_method pm ON p.payment_method_code = pm.method_code
                WHERE p.visit_id = ?1
                ORDER BY p.payment_datetime DESC, p.payment_id DESC
                "#,
                &params![visit_id],
            )
            .await
    }

    /// Substring search over customer name, method name and method code.
    pub async fn search(&self, term: &str) -> DbResult<Vec<PaymentDetail>> {
        let pattern = contains_pattern(term);

        self.exec
            .fetch_all(
                r#"
                SELECT p.payment_id, p.visit_id, p.amount, p.payment_method_code,
                       p.payment_datetime, v.customer_id, c.name AS customer_name,
                       v.visit_date, pm.method_name
                FROM payment p
                JOIN visit v ON p.visit_id = v.visit_id
                JOIN customer c ON v.customer_id = c.customer_id
                JOIN payment_method pm ON p.payment_method_code = pm.method_code
                WHERE c.name LIKE ?1 ESCAPE '\'
                   OR pm.method_name LIKE ?1 ESCAPE '\'
                   OR p.payment_method_code LIKE ?1 ESCAPE '\'
                ORDER BY p.payment_datetime DESC, p.payment_id DESC
                "#,
                &params![pattern],
            )
            .await
    }

    /// Replaces visit, amount, method and time of an existing payment.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Payment doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown visit or method code
    pub async fn update(&self, payment: &Payment) -> DbResult<()> {
        validate_payment(&NewPayment {
            amount: payment.amount,
            payment_method_code: payment.payment_method_code.clone(),
            payment_datetime: payment.payment_datetime,
        })?;

        debug!(payment_id = payment.payment_id, "Updating payment");

        let outcome = self
            .exec
            .run(
                r#"
                UPDATE payment SET
                    visit_id = ?2,
                    amount = ?3,
                    payment_method_code = ?4,
                    payment_datetime = ?5
                WHERE payment_id = ?1
                "#,
                &params![
                    payment.payment_id,
                    payment.visit_id,
                    payment.amount,
                    &payment.payment_method_code,
                    payment.payment_datetime,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Payment", payment.payment_id));
        }

        Ok(())
    }

    /// Deletes a payment. Unknown ids remove nothing.
    pub async fn delete(&self, payment_id: PaymentId) -> DbResult<u64> {
        debug!(payment_id, "Deleting payment");

        let outcome = self
            .exec
            .run(
                "DELETE FROM payment WHERE payment_id = ?1",
                &params![payment_id],
            )
            .await?;

        Ok(outcome.rows_affected)
    }

    /// All payment methods, ordered by code.
    pub async fn get_payment_methods(&self) -> DbResult<Vec<PaymentMethod>> {
        self.exec
            .fetch_all(
                "SELECT method_code, method_name FROM payment_method ORDER BY method_code",
                &[],
            )
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDateTime;
    use crm_core::{Money, NewCustomer, NewVisit, ValidationError};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn pay(amount: i64, method: &str, ts: &str) -> NewPayment {
        NewPayment {
            amount: Money::new(amount),
            payment_method_code: method.to_string(),
            payment_datetime: at(ts),
        }
    }

    async fn setup() -> (Database, CustomerId, VisitId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let alice = db
            .customers()
            .create(&NewCustomer {
                name: "Alice".to_string(),
                phone: "010-1111-2222".to_string(),
                birth_date: None,
                gender: None,
                memo: None,
            })
            .await
            .unwrap();
        let visit = db
            .visits()
            .create(
                alice,
                &NewVisit {
                    visit_date: at("2026-01-05 10:00:00"),
                    memo: None,
                },
            )
            .await
            .unwrap();
        (db, alice, visit)
    }

    #[tokio::test]
    async fn test_payment_methods_ordered_by_code() {
        let (db, _, _) = setup().await;

        let codes: Vec<String> = db
            .payments()
            .get_payment_methods()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.method_code)
            .collect();
        assert_eq!(codes, vec!["CARD", "CASH", "POINT", "TRANSFER"]);
    }

    #[tokio::test]
    async fn test_create_and_joined_reads() {
        let (db, alice, visit) = setup().await;
        let payments = db.payments();

        let id = payments
            .create(visit, &pay(50_000, "CARD", "2026-01-05 10:30:00"))
            .await
            .unwrap();

        let payment = payments.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(payment.amount, Money::new(50_000));
        assert_eq!(payment.visit_id, visit);

        let history = payments.get_by_customer(alice).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].customer_name, "Alice");
        assert_eq!(history[0].method_name, "Credit/Debit Card");
        assert_eq!(history[0].visit_date, at("2026-01-05 10:00:00"));

        assert_eq!(payments.get_by_visit(visit).await.unwrap(), history);
        assert_eq!(payments.get_all().await.unwrap(), history);
    }

    #[tokio::test]
    async fn test_unknown_method_code_is_foreign_key_violation() {
        let (db, _, visit) = setup().await;

        let err = db
            .payments()
            .create(visit, &pay(10_000, "BITCOIN", "2026-01-05 10:30:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_visit_is_foreign_key_violation() {
        let (db, _, visit) = setup().await;

        let err = db
            .payments()
            .create(visit + 1, &pay(10_000, "CASH", "2026-01-05 10:30:00"))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let (db, _, visit) = setup().await;

        let err = db
            .payments()
            .create(visit, &pay(0, "CASH", "2026-01-05 10:30:00"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_by_name_method_and_code() {
        let (db, _, visit) = setup().await;
        let payments = db.payments();
        payments
            .create(visit, &pay(30_000, "CASH", "2026-01-05 10:30:00"))
            .await
            .unwrap();
        payments
            .create(visit, &pay(20_000, "TRANSFER", "2026-01-05 10:31:00"))
            .await
            .unwrap();

        assert_eq!(payments.search("alice").await.unwrap().len(), 2);
        assert_eq!(payments.search("Bank").await.unwrap().len(), 1);
        assert_eq!(payments.search("CASH").await.unwrap().len(), 1);
        assert!(payments.search("POINT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let (db, _, visit) = setup().await;
        let payments = db.payments();
        let id = payments
            .create(visit, &pay(30_000, "CASH", "2026-01-05 10:30:00"))
            .await
            .unwrap();

        let mut payment = payments.get_by_id(id).await.unwrap().unwrap();
        payment.amount = Money::new(35_000);
        payment.payment_method_code = "POINT".to_string();

        payments.update(&payment).await.unwrap();
        payments.update(&payment).await.unwrap();
        assert_eq!(payments.get_by_id(id).await.unwrap(), Some(payment.clone()));

        payment.payment_id += 1;
        let err = payments.update(&payment).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_and_visit_cascade() {
        let (db, _, visit) = setup().await;
        let payments = db.payments();
        let first = payments
            .create(visit, &pay(30_000, "CASH", "2026-01-05 10:30:00"))
            .await
            .unwrap();
        let second = payments
            .create(visit, &pay(20_000, "CARD", "2026-01-05 10:31:00"))
            .await
            .unwrap();

        assert_eq!(payments.delete(first).await.unwrap(), 1);
        assert_eq!(payments.get_by_id(first).await.unwrap(), None);
        assert_eq!(payments.delete(first).await.unwrap(), 0);

        db.visits().delete(visit).await.unwrap();
        assert_eq!(payments.get_by_id(second).await.unwrap(), None);
    }
}
