//! # Domain Types
//!
//! Entities persisted by the CRM and the joined read models list pages show.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Visit      │   │     Payment     │       │
//! │  │  ─────────────  │ 1 │  ─────────────  │ 1 │  ─────────────  │       │
//! │  │  customer_id    │◄──┤  customer_id FK │◄──┤  visit_id FK    │       │
//! │  │  name, phone    │ * │  visit_date     │ * │  amount         │       │
//! │  │  birth_date     │   │  memo           │   │  method_code FK │──┐    │
//! │  │  gender, memo   │   └─────────────────┘   │  datetime       │  │    │
//! │  └─────────────────┘                         └─────────────────┘  │    │
//! │                                              ┌─────────────────┐  │    │
//! │                                              │  PaymentMethod  │◄─┘    │
//! │                                              │  code → name    │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every identity is an integer assigned by the store on insert. `New*`
//! types carry the user-entered fields only; the full entity is what a read
//! returns and what an update replaces.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Store-assigned customer identity.
pub type CustomerId = i64;

/// Store-assigned visit identity.
pub type VisitId = i64;

/// Store-assigned payment identity.
pub type PaymentId = i64;

// =============================================================================
// Gender
// =============================================================================

/// Gender as captured on the registration form (`M` / `F`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Gender {
    #[serde(rename = "M")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "M"))]
    Male,
    #[serde(rename = "F")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "F"))]
    Female,
}

impl Gender {
    /// The single-letter code stored in the `gender` column.
    pub const fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            _ => Err(ValidationError::NotAllowed {
                field: "gender".to_string(),
                allowed: vec!["M".to_string(), "F".to_string()],
            }),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name: String,
    pub phone: String,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub memo: Option<String>,
}

impl Customer {
    /// Builds the stored shape of a freshly inserted customer.
    pub fn from_new(customer_id: CustomerId, new: NewCustomer) -> Self {
        Customer {
            customer_id,
            name: new.name,
            phone: new.phone,
            birth_date: new.birth_date,
            gender: new.gender,
            memo: new.memo,
        }
    }

    /// Month of the birth date (1..=12), if one was recorded.
    pub fn birth_month(&self) -> Option<u32> {
        self.birth_date.map(|d| d.month())
    }
}

/// Registration form fields for a new customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub memo: Option<String>,
}

// =============================================================================
// Visit
// =============================================================================

/// A visit by one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Visit {
    pub visit_id: VisitId,
    pub customer_id: CustomerId,
    #[ts(as = "String")]
    pub visit_date: NaiveDateTime,
    pub memo: Option<String>,
}

/// A visit joined with the visiting customer's name (list pages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VisitDetail {
    pub visit_id: VisitId,
    pub customer_id: CustomerId,
    #[ts(as = "String")]
    pub visit_date: NaiveDateTime,
    pub memo: Option<String>,
    pub customer_name: String,
}

/// Form fields for recording a visit. The customer is passed separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVisit {
    #[ts(as = "String")]
    pub visit_date: NaiveDateTime,
    pub memo: Option<String>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// Static lookup row: method code → display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub method_code: String,
    pub method_name: String,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment made during a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub visit_id: VisitId,
    pub amount: Money,
    pub payment_method_code: String,
    #[ts(as = "String")]
    pub payment_datetime: NaiveDateTime,
}

/// A payment joined with its visit, customer and method name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentDetail {
    pub payment_id: PaymentId,
    pub visit_id: VisitId,
    pub amount: Money,
    pub payment_method_code: String,
    #[ts(as = "String")]
    pub payment_datetime: NaiveDateTime,
    pub customer_id: CustomerId,
    pub customer_name: String,
    #[ts(as = "String")]
    pub visit_date: NaiveDateTime,
    pub method_name: String,
}

/// Form fields for recording a payment. The visit is passed separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    pub amount: Money,
    pub payment_method_code: String,
    #[ts(as = "String")]
    pub payment_datetime: NaiveDateTime,
}

// =============================================================================
// Unit Tests
// =============================================================================
