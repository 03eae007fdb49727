//! # Customer Repository
//!
//! Registration, lookup, search and birthday queries for customers.
//!
//! ## Deleting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DELETE customer 7                                                     │
//! │       │                                                                 │
//! │       ▼  ON DELETE CASCADE                                              │
//! │  visit rows of customer 7                                              │
//! │       │                                                                 │
//! │       ▼  ON DELETE CASCADE                                              │
//! │  payment rows of those visits                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The cascade is the schema's job; this module issues one statement.

use tracing::debug;

use crm_core::validation::{
    validate_customer, validate_customer_name, validate_memo, validate_month, validate_phone,
};
use crm_core::{Customer, CustomerId, NewCustomer};

use super::contains_pattern;
use crate::error::{DbError, DbResult};
use crate::executor::QueryExecutor;
use crate::params;

/// Repository for customer database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.customers();
/// let id = repo.create(&new_customer).await?;
/// let matches = repo.search("010-1234").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    exec: QueryExecutor,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(exec: QueryExecutor) -> Self {
        CustomerRepository { exec }
    }

    /// Inserts a customer and returns the store-assigned id.
    ///
    /// ## Returns
    /// * `Ok(id)` - Customer registered
    /// * `Err(DbError::Validation)` - Name, phone or memo rejected
    pub async fn create(&self, customer: &NewCustomer) -> DbResult<CustomerId> {
        validate_customer(customer)?;

        debug!(name = %customer.name, "Creating customer");

        let outcome = self
            .exec
            .run(
                r#"
                INSERT INTO customer (name, phone, birth_date, gender, memo)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                &params![
                    &customer.name,
                    &customer.phone,
                    customer.birth_date,
                    customer.gender,
                    customer.memo.as_deref(),
                ],
            )
            .await?;

        debug!(customer_id = outcome.last_insert_id, "Customer created");
        Ok(outcome.last_insert_id)
    }

    /// Lists every customer ordered by name.
    pub async fn get_all(&self) -> DbResult<Vec<Customer>> {
        self.exec
            .fetch_all(
                r#"
                SELECT customer_id, name, phone, birth_date, gender, memo
                FROM customer
                ORDER BY name, customer_id
                "#,
                &[],
            )
            .await
    }

    /// Gets a customer by id.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found
    /// * `Ok(None)` - No such customer
    pub async fn get_by_id(&self, customer_id: CustomerId) -> DbResult<Option<Customer>> {
        self.exec
            .fetch_optional(
                r#"
                SELECT customer_id, name, phone, birth_date, gender, memo
                FROM customer
                WHERE customer_id = ?1
                "#,
                &params![customer_id],
            )
            .await
    }

    /// Substring search over name, phone and birth date (`YYYY-MM-DD`).
    ///
    /// A blank term matches every customer.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Customer>> {
        let pattern = contains_pattern(term);

        debug!(term = %term.trim(), "Searching customers");

        let customers: Vec<Customer> = self
            .exec
            .fetch_all(
                r#"
                SELECT customer_id, name, phone, birth_date, gender, memo
                FROM customer
                WHERE name LIKE ?1 ESCAPE '\'
                   OR phone LIKE ?1 ESCAPE '\'
                   OR birth_date LIKE ?1 ESCAPE '\'
                ORDER BY name, customer_id
                "#,
                &params![pattern],
            )
            .await?;

        debug!(count = customers.len(), "Search returned customers");
        Ok(customers)
    }

    /// Replaces every editable field of an existing customer.
    ///
    /// Writing the same values twice succeeds both times.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        validate_customer_name(&customer.name)?;
        validate_phone(&customer.phone)?;
        validate_memo(customer.memo.as_deref())?;

        debug!(customer_id = customer.customer_id, "Updating customer");

        let outcome = self
            .exec
            .run(
                r#"
                UPDATE customer SET
                    name = ?2,
                    phone = ?3,
                    birth_date = ?4,
                    gender = ?5,
                    memo = ?6
                WHERE customer_id = ?1
                "#,
                &params![
                    customer.customer_id,
                    &customer.name,
                    &customer.phone,
                    customer.birth_date,
                    customer.gender,
                    customer.memo.as_deref(),
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Customer", customer.customer_id));
        }

        Ok(())
    }

    /// Deletes a customer together with its visits and their payments.
    ///
    /// Returns the number of customer rows removed; an unknown id removes
    /// nothing and still succeeds.
    pub async fn delete(&self, customer_id: CustomerId) -> DbResult<u64> {
        debug!(customer_id, "Deleting customer");

        let outcome = self
            .exec
            .run(
                "DELETE FROM customer WHERE customer_id = ?1",
                &params![customer_id],
            )
            .await?;

        Ok(outcome.rows_affected)
    }

    /// Customers born in `month` (1..=12), ordered by day of month then name.
    ///
    /// Customers without a birth date never match.
    pub async fn get_by_birth_month(&self, month: u32) -> DbResult<Vec<Customer>> {
        validate_month(month)?;

        self.exec
            .fetch_all(
                r#"
                SELECT customer_id, name, phone, birth_date, gender, memo
                FROM customer
                WHERE birth_date IS NOT NULL
                  AND CAST(strftime('%m', birth_date) AS INTEGER) = ?1
                ORDER BY CAST(strftime('%d', birth_date) AS INTEGER), name, customer_id
                "#,
                &params![month],
            )
            .await
    }

    /// Number of registered customers.
    pub async fn count(&self) -> DbResult<i64> {
        self.exec
            .fetch_scalar("SELECT COUNT(*) FROM customer", &[])
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
    use chrono::NaiveDate;
    use crm_core::{Gender, ValidationError};

    async fn repo() -> CustomerRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().customers()
    }

    fn new_customer(name: &str, phone: &str, birth: Option<(i32, u32, u32)>) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: phone.to_string(),
            birth_date: birth.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            gender: None,
            memo: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_search_round_trips_fields() {
        let repo = repo().await;
        let input = NewCustomer {
            name: "Alice".to_string(),
            phone: "010-1234-5678".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            gender: Some(Gender::Female),
            memo: Some("prefers mornings".to_string()),
        };

        let id = repo.create(&input).await.unwrap();
        let found = repo.search("Alice").await.unwrap();

        assert_eq!(found, vec![Customer::from_new(id, input)]);
    }

    #[tokio::test]
    async fn test_padded_fields_stored_as_given() {
        let repo = repo().await;
        let input = new_customer(" Alice ", " 010-1234-5678 ", None);

        let id = repo.create(&input).await.unwrap();
        let found = repo.search(" Alice ").await.unwrap();
        assert_eq!(found, vec![Customer::from_new(id, input)]);

        let mut edited = found[0].clone();
        edited.name = "Alice  ".to_string();
        repo.update(&edited).await.unwrap();
        assert_eq!(repo.get_by_id(id).await.unwrap(), Some(edited));
    }

    #[tokio::test]
    async fn test_search_matches_phone_and_birth_date() {
        let repo = repo().await;
        repo.create(&new_customer("Alice", "010-1111-2222", Some((1990, 1, 1))))
            .await
            .unwrap();
        repo.create(&new_customer("Bob", "010-3333-4444", Some((1985, 7, 15))))
            .await
            .unwrap();

        let by_phone = repo.search("3333").await.unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].name, "Bob");

        let by_birth = repo.search("1990-01").await.unwrap();
        assert_eq!(by_birth.len(), 1);
        assert_eq!(by_birth[0].name, "Alice");

        assert_eq!(repo.search("  ").await.unwrap().len(), 2);
        assert!(repo.search("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let repo = repo().await;
        repo.create(&new_customer("Alice", "010-1111-2222", None))
            .await
            .unwrap();

        assert!(repo.search("%").await.unwrap().is_empty());
        assert!(repo.search("_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_name() {
        let repo = repo().await;
        for name in ["Charlie", "Alice", "Bob"] {
            repo.create(&new_customer(name, "010", None)).await.unwrap();
        }

        let names: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let repo = repo().await;
        let id = repo
            .create(&new_customer("Alice", "010-1111-2222", None))
            .await
            .unwrap();

        let mut customer = repo.get_by_id(id).await.unwrap().unwrap();
        customer.phone = "010-9999-0000".to_string();
        customer.gender = Some(Gender::Female);

        repo.update(&customer).await.unwrap();
        repo.update(&customer).await.unwrap();

        assert_eq!(repo.get_by_id(id).await.unwrap(), Some(customer));
    }

    #[tokio::test]
    async fn test_update_unknown_customer_is_not_found() {
        let repo = repo().await;
        let ghost = Customer::from_new(404, new_customer("Ghost", "010", None));

        let err = repo.update(&ghost).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let repo = repo().await;
        let id = repo
            .create(&new_customer("Alice", "010", None))
            .await
            .unwrap();

        assert_eq!(repo.delete(id).await.unwrap(), 1);
        assert_eq!(repo.get_by_id(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_succeeds_with_zero_rows() {
        let repo = repo().await;
        assert_eq!(repo.delete(999).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_birth_month_ordered_by_day() {
        let repo = repo().await;
        repo.create(&new_customer("Late", "010", Some((1980, 3, 28))))
            .await
            .unwrap();
        repo.create(&new_customer("Early", "010", Some((1995, 3, 2))))
            .await
            .unwrap();
        repo.create(&new_customer("April", "010", Some((1990, 4, 1))))
            .await
            .unwrap();
        repo.create(&new_customer("Unknown", "010", None))
            .await
            .unwrap();

        let march: Vec<String> = repo
            .get_by_birth_month(3)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(march, vec!["Early", "Late"]);
    }

    #[tokio::test]
    async fn test_birth_month_out_of_range_is_rejected() {
        let repo = repo().await;
        let err = repo.get_by_birth_month(13).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let repo = repo().await;
        let err = repo
            .create(&new_customer("", "010", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
