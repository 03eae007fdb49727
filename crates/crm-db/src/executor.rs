//! # Query Executor
//!
//! Runs one parameterized statement against one pooled connection.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Statement, One Checkout                        │
//! │                                                                         │
//! │  execute("SELECT ... WHERE customer_id = ?1", [Int(7)], FetchMode::One)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  open_connection(pool) ── fails? ──► log + DbError::ConnectionFailed   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bind SqlParam values positionally (never spliced into the text)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run ── fails? ──► log cause + DbError (constraint / query / ...)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FetchMode::None → Affected { rows_affected, last_insert_id }          │
//! │  FetchMode::One  → One(Option<Record>)                                 │
//! │  FetchMode::All  → All(Vec<Record>)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  connection guard drops → back to the pool (every exit path)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories use the typed companions (`run`, `fetch_optional`,
//! `fetch_all`, `fetch_scalar`), which share the checkout and logging but
//! decode straight into `FromRow` types.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Arguments, Column, FromRow, Row, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, error};

use crm_core::{Gender, Money};

use crate::error::{DbError, DbResult};
use crate::pool::open_connection;

// =============================================================================
// Parameters
// =============================================================================

/// A dynamically typed statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(i64::from(v))
    }
}

impl From<u32> for SqlParam {
    fn from(v: u32) -> Self {
        SqlParam::Int(i64::from(v))
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Real(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl From<NaiveDate> for SqlParam {
    fn from(v: NaiveDate) -> Self {
        SqlParam::Date(v)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(v: NaiveDateTime) -> Self {
        SqlParam::DateTime(v)
    }
}

impl From<Money> for SqlParam {
    fn from(v: Money) -> Self {
        SqlParam::Int(v.amount())
    }
}

impl From<Gender> for SqlParam {
    fn from(v: Gender) -> Self {
        SqlParam::Text(v.code().to_string())
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

/// Builds a `Vec<SqlParam>` from heterogeneous values.
///
/// ```rust,ignore
/// let params = params![customer_id, "%kim%", None::<String>];
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::SqlParam>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::SqlParam::from($value)),+]
    };
}

fn bind_params<'q>(params: &[SqlParam]) -> DbResult<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for (position, param) in params.iter().enumerate() {
        let bound = match param {
            SqlParam::Null => args.add(Option::<i64>::None),
            SqlParam::Int(v) => args.add(*v),
            SqlParam::Real(v) => args.add(*v),
            SqlParam::Text(v) => args.add(v.clone()),
            SqlParam::Date(v) => args.add(*v),
            SqlParam::DateTime(v) => args.add(*v),
        };
        bound.map_err(|e| {
            DbError::QueryFailed(format!("cannot bind parameter {}: {e}", position + 1))
        })?;
    }
    Ok(args)
}

// =============================================================================
// Results
// =============================================================================

/// Which result shape the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Write statement; report rows affected and the generated id.
    None,
    /// First row only.
    One,
    /// Every row.
    All,
}

/// One result row keyed by column name, in select-list order.
pub type Record = Map<String, Value>;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutcome {
    pub rows_affected: u64,
    /// Row id of the last successful insert on the connection.
    pub last_insert_id: i64,
}

/// What `execute` returns, matching the requested [`FetchMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Affected(QueryOutcome),
    One(Option<Record>),
    All(Vec<Record>),
}

impl QueryOutput {
    /// Rows affected for a write, zero otherwise.
    pub fn rows_affected(&self) -> u64 {
        match self {
            QueryOutput::Affected(outcome) => outcome.rows_affected,
            _ => 0,
        }
    }

    /// All returned records (empty for writes).
    pub fn into_records(self) -> Vec<Record> {
        match self {
            QueryOutput::Affected(_) => Vec::new(),
            QueryOutput::One(record) => record.into_iter().collect(),
            QueryOutput::All(records) => records,
        }
    }
}

/// Decodes a row by each value's runtime storage class.
fn row_to_record(row: &SqliteRow) -> DbResult<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(idx)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(idx)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(idx)?),
                _ => Value::from(row.try_get::<String, _>(idx)?),
            }
        };

        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

/// Collapses whitespace so multi-line SQL fits on one log line.
fn compact(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn failed(query: &str, err: sqlx::Error) -> DbError {
    let err = DbError::from(err);
    error!(error = %err, query = %compact(query), "Statement failed");
    err
}

// =============================================================================
// Executor
// =============================================================================

/// Parameterized statement runner shared by every repository.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: SqlitePool,
}

impl QueryExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        QueryExecutor { pool }
    }

    /// Runs `query` with positional `params` and shapes the result per `mode`.
    ///
    /// ## Returns
    /// * `Affected` for [`FetchMode::None`]
    /// * `One(None)` when a single-row fetch matches nothing
    /// * `All(vec![])` when a list fetch matches nothing
    ///
    /// Connection, constraint and syntax failures are logged and returned as
    /// `Err`; they are never folded into an empty result.
    pub async fn execute(
        &self,
        query: &str,
        params: &[SqlParam],
        mode: FetchMode,
    ) -> DbResult<QueryOutput> {
        let args = bind_params(params)?;
        let mut conn = open_connection(&self.pool).await?;

        debug!(query = %compact(query), params = params.len(), ?mode, "Executing statement");

        let output = match mode {
            FetchMode::None => {
                let result = sqlx::query_with(query, args)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| failed(query, e))?;
                QueryOutput::Affected(QueryOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: result.last_insert_rowid(),
                })
            }
            FetchMode::One => {
                let row = sqlx::query_with(query, args)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(|e| failed(query, e))?;
                QueryOutput::One(row.as_ref().map(row_to_record).transpose()?)
            }
            FetchMode::All => {
                let rows = sqlx::query_with(query, args)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| failed(query, e))?;
                QueryOutput::All(rows.iter().map(row_to_record).collect::<DbResult<_>>()?)
            }
        };

        Ok(output)
    }

    /// Runs a write statement.
    pub async fn run(&self, query: &str, params: &[SqlParam]) -> DbResult<QueryOutcome> {
        let args = bind_params(params)?;
        let mut conn = open_connection(&self.pool).await?;

        let result = sqlx::query_with(query, args)
            .execute(&mut *conn)
            .await
            .map_err(|e| failed(query, e))?;

        Ok(QueryOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
        })
    }

    /// Fetches at most one row decoded as `T`.
    pub async fn fetch_optional<T>(&self, query: &str, params: &[SqlParam]) -> DbResult<Option<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let args = bind_params(params)?;
        let mut conn = open_connection(&self.pool).await?;

        sqlx::query_as_with::<_, T, _>(query, args)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| failed(query, e))
    }

    /// Fetches every row decoded as `T`.
    pub async fn fetch_all<T>(&self, query: &str, params: &[SqlParam]) -> DbResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let args = bind_params(params)?;
        let mut conn = open_connection(&self.pool).await?;

        sqlx::query_as_with::<_, T, _>(query, args)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| failed(query, e))
    }

    /// Fetches the first column of the single row an aggregate returns.
    pub async fn fetch_scalar<T>(&self, query: &str, params: &[SqlParam]) -> DbResult<T>
    where
        (T,): for<'r> FromRow<'r, SqliteRow>,
        T: Send + Unpin,
    {
        let args = bind_params(params)?;
        let mut conn = open_connection(&self.pool).await?;

        sqlx::query_scalar_with::<_, T, _>(query, args)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| failed(query, e))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn executor() -> QueryExecutor {
        Database::new(DbConfig::in_memory()).await.unwrap().executor()
    }

    #[test]
    fn test_params_macro() {
        let params = params![7_i64, "kim", None::<String>, Money::new(500)];
        assert_eq!(
            params,
            vec![
                SqlParam::Int(7),
                SqlParam::Text("kim".to_string()),
                SqlParam::Null,
                SqlParam::Int(500),
            ]
        );
        assert!(params![].is_empty());
    }

    #[tokio::test]
    async fn test_insert_reports_generated_id() {
        let exec = executor().await;

        let output = exec
            .execute(
                "INSERT INTO customer (name, phone) VALUES (?1, ?2)",
                &params!["Alice", "010-1111-2222"],
                FetchMode::None,
            )
            .await
            .unwrap();

        match output {
            QueryOutput::Affected(outcome) => {
                assert_eq!(outcome.rows_affected, 1);
                assert_eq!(outcome.last_insert_id, 1);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_one_decodes_storage_classes() {
        let exec = executor().await;

        let output = exec
            .execute(
                "SELECT 42 AS n, 2.5 AS r, 'text' AS t, NULL AS z",
                &[],
                FetchMode::One,
            )
            .await
            .unwrap();

        let QueryOutput::One(Some(record)) = output else {
            panic!("expected one record");
        };
        assert_eq!(record["n"], Value::from(42));
        assert_eq!(record["r"], Value::from(2.5));
        assert_eq!(record["t"], Value::from("text"));
        assert_eq!(record["z"], Value::Null);
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["n", "r", "t", "z"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let exec = executor().await;

        let one = exec
            .execute(
                "SELECT * FROM customer WHERE customer_id = ?1",
                &params![999_i64],
                FetchMode::One,
            )
            .await
            .unwrap();
        assert_eq!(one, QueryOutput::One(None));

        let all = exec
            .execute("SELECT * FROM customer", &[], FetchMode::All)
            .await
            .unwrap();
        assert_eq!(all, QueryOutput::All(vec![]));
    }

    #[tokio::test]
    async fn test_injection_text_is_bound_not_spliced() {
        let exec = executor().await;
        let hostile = "x'); DROP TABLE customer; --";

        exec.run(
            "INSERT INTO customer (name, phone) VALUES (?1, ?2)",
            &params![hostile, "010"],
        )
        .await
        .unwrap();

        let name: String = exec
            .fetch_scalar("SELECT name FROM customer", &[])
            .await
            .unwrap();
        assert_eq!(name, hostile);
    }

    #[tokio::test]
    async fn test_syntax_error_is_reported() {
        let exec = executor().await;

        let err = exec
            .execute("SELEC nonsense", &[], FetchMode::All)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_foreign_key_failure_is_constraint_violation() {
        let exec = executor().await;

        let err = exec
            .run(
                "INSERT INTO visit (customer_id, visit_date) VALUES (?1, ?2)",
                &params![12345_i64, "2026-01-01 10:00:00"],
            )
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_closed_pool_is_connection_failure() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let exec = db.executor();
        db.close().await;

        let err = exec
            .execute("SELECT 1", &[], FetchMode::One)
            .await
            .unwrap_err();
        assert!(err.is_connection_failure());
    }
}
