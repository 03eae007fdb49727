//! # Seed Data Generator
//!
//! Populates the database with demo customers, visits and payments.
//!
//! ## Usage
//! ```bash
//! # 50 customers (default) into ./crm_db.sqlite
//! cargo run -p crm-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p crm-db --bin seed -- --customers 200 --db ./data/crm.db
//!
//! # More detail
//! RUST_LOG=crm_db=debug cargo run -p crm-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Customers with Korean-style phone numbers, birthdays spread over the year
//! - 1 to 4 visits per customer within the last six months
//! - One payment per visit (every fifth customer's first visit is unpaid),
//!   rotating through CASH, CARD, TRANSFER and POINT
//!
//! Values are derived from the customer index, so two runs produce the same
//! data relative to today's date.

use chrono::{Duration, Local, NaiveDate};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crm_core::{Gender, Money, NewCustomer, NewPayment, NewVisit, YearMonth, DEFAULT_TREND_MONTHS};
use crm_db::config::DEFAULT_DB_PATH;
use crm_db::{Database, DbConfig, FetchMode, QueryOutput};

const FAMILY_NAMES: &[&str] = &["Kim", "Lee", "Park", "Choi", "Jung", "Kang", "Cho", "Yoon"];

const GIVEN_NAMES: &[&str] = &[
    "Minjun", "Seoyeon", "Jiho", "Hayoon", "Doyun", "Jiwoo", "Eunwoo", "Sua", "Siwoo", "Jian",
];

const MEMOS: &[&str] = &["Cut", "Cut + wash", "Perm", "Color", "Treatment", "Consultation"];

const METHODS: &[&str] = &["CASH", "CARD", "TRANSFER", "POINT"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut customers: usize = 50;
    let mut db_path = String::from(DEFAULT_DB_PATH);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(n) => customers = n,
                        Err(_) => warn!(
                            value = %args[i + 1],
                            default = customers,
                            "Invalid customer count; using default"
                        ),
                    }
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("CRM Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --customers <N>  Number of customers to generate (default: 50)");
                println!(
                    "  -d, --db <PATH>      Database file path (default: {})",
                    DEFAULT_DB_PATH
                );
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, customers, "Seeding CRM database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.customers().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has customers; skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let today = Local::now().date_naive();
    let start = std::time::Instant::now();
    let (mut inserted, mut visits, mut payments) = (0usize, 0usize, 0usize);

    for idx in 0..customers {
        let customer_id = match db.customers().create(&generate_customer(idx)).await {
            Ok(id) => id,
            Err(e) => {
                warn!(index = idx, error = %e, "Failed to insert customer");
                continue;
            }
        };
        inserted += 1;

        for k in 0..(idx % 4 + 1) {
            let Some(visit) = generate_visit(idx, k, today) else {
                continue;
            };
            let visit_id = db.visits().create(customer_id, &visit).await?;
            visits += 1;

            if k == 0 && idx % 5 == 0 {
                continue;
            }

            db.payments()
                .create(visit_id, &generate_payment(idx, k, &visit))
                .await?;
            payments += 1;
        }

        if (idx + 1) % 25 == 0 {
            info!(generated = idx + 1, "Customers generated");
        }
    }

    info!(
        customers = inserted,
        requested = customers,
        visits,
        payments,
        elapsed = ?start.elapsed(),
        "Seed data written"
    );

    // Summaries
    let overall = db.stats().get_overall_statistics().await?;
    info!(
        total_customers = overall.total_customers,
        total_visits = overall.total_visits,
        total_revenue = %overall.total_revenue,
        avg_revenue_per_visit = overall.avg_revenue_per_visit,
        total_visit_days = overall.total_visit_days,
        "Overall statistics"
    );

    let current = YearMonth::of(today);
    for month in db
        .stats()
        .get_recent_monthly_statistics(current.year(), current.month(), DEFAULT_TREND_MONTHS)
        .await?
    {
        info!(
            period = %format!("{}-{:02}", month.year, month.month),
            visits = month.total_visits,
            revenue = %month.total_revenue,
            "Monthly statistics"
        );
    }

    let by_method = db
        .executor()
        .execute(
            r#"
            SELECT pm.method_name, COUNT(p.payment_id) AS payments, COALESCE(SUM(p.amount), 0) AS revenue
            FROM payment_method pm
            LEFT JOIN payment p ON p.payment_method_code = pm.method_code
            GROUP BY pm.method_code, pm.method_name
            ORDER BY revenue DESC
            "#,
            &[],
            FetchMode::All,
        )
        .await?;
    if let QueryOutput::All(rows) = by_method {
        for row in rows {
            info!(row = %serde_json::Value::Object(row), "Revenue by payment method");
        }
    }

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Default: INFO, with sqlx statement logging turned down.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crm_db=info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn generate_customer(idx: usize) -> NewCustomer {
    let name = format!(
        "{} {}",
        FAMILY_NAMES[idx % FAMILY_NAMES.len()],
        GIVEN_NAMES[(idx / FAMILY_NAMES.len()) % GIVEN_NAMES.len()]
    );

    // Every seventh customer skipped the birthday field on the form.
    let birth_date = if idx % 7 == 6 {
        None
    } else {
        NaiveDate::from_ymd_opt(
            1960 + (idx % 40) as i32,
            (idx % 12) as u32 + 1,
            ((idx * 3) % 28) as u32 + 1,
        )
    };

    NewCustomer {
        name,
        phone: format!("010-{:04}-{:04}", 1000 + idx % 9000, (idx * 37) % 10_000),
        birth_date,
        gender: Some(if idx % 2 == 0 {
            Gender::Female
        } else {
            Gender::Male
        }),
        memo: (idx % 10 == 0).then(|| "Regular".to_string()),
    }
}

fn generate_visit(idx: usize, k: usize, today: NaiveDate) -> Option<NewVisit> {
    let days_ago = ((idx * 7 + k * 11) % 180) as i64;
    let hour = 10 + ((idx + k) % 8) as u32;

    Some(NewVisit {
        visit_date: (today - Duration::days(days_ago)).and_hms_opt(hour, 0, 0)?,
        memo: Some(MEMOS[(idx + k) % MEMOS.len()].to_string()),
    })
}

fn generate_payment(idx: usize, k: usize, visit: &NewVisit) -> NewPayment {
    NewPayment {
        amount: Money::new(10_000 + ((idx * 13 + k * 7) % 20) as i64 * 5_000),
        payment_method_code: METHODS[(idx + k) % METHODS.len()].to_string(),
        payment_datetime: visit.visit_date + Duration::minutes(45),
    }
}
