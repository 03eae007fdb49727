//! # Validation Module
//!
//! Form input validation for customers, visits and payments.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web layer                                                    │
//! │  └── missing_fields(): which required form fields are blank            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (crm-db)                                        │
//! │  └── THIS MODULE: validate_* before the statement is sent              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store (SQLite)                                               │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys (customer, visit, payment_method)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use crm_core::validation::{missing_fields, validate_month};
//!
//! let form = [("name", "Alice"), ("phone", "  ")];
//! assert_eq!(missing_fields(&["name", "phone"], &form), vec!["phone"]);
//!
//! assert!(validate_month(12).is_ok());
//! assert!(validate_month(13).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewCustomer, NewPayment, NewVisit};
use crate::{MAX_MEMO_LEN, MAX_NAME_LEN, MAX_PHONE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Form Helpers
// =============================================================================

/// Returns the names of `required` fields that are absent or blank in `form`.
///
/// Order follows `required`, so messages list fields the way the form does.
pub fn missing_fields<'a>(required: &[&'a str], form: &[(&str, &str)]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| {
            !form
                .iter()
                .any(|(key, value)| key == field && !value.trim().is_empty())
        })
        .collect()
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Only digits, hyphens, spaces and a leading plus
///
/// ## Example
/// ```rust
/// use crm_core::validation::validate_phone;
///
/// assert!(validate_phone("010-1234-5678").is_ok());
/// assert!(validate_phone("+82 10 1234 5678").is_ok());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, hyphens and spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional memo (length only).
pub fn validate_memo(memo: Option<&str>) -> ValidationResult<()> {
    match memo {
        Some(text) if text.chars().count() > MAX_MEMO_LEN => Err(ValidationError::TooLong {
            field: "memo".to_string(),
            max: MAX_MEMO_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a payment-method code such as `CASH` or `CARD`.
///
/// Whether the code exists is left to the store's foreign key.
pub fn validate_method_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "payment_method_code".to_string(),
        });
    }

    if code.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "payment_method_code".to_string(),
            max: 20,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "payment_method_code".to_string(),
            reason: "must contain only uppercase letters, digits and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a calendar month (1..=12).
pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    Ok(())
}

/// Validates a payment amount (must be positive).
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates every user-entered field of a customer.
pub fn validate_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_customer_name(&customer.name)?;
    validate_phone(&customer.phone)?;
    validate_memo(customer.memo.as_deref())
}

/// Validates a visit form.
pub fn validate_visit(visit: &NewVisit) -> ValidationResult<()> {
    validate_memo(visit.memo.as_deref())
}

/// Validates a payment form.
pub fn validate_payment(payment: &NewPayment) -> ValidationResult<()> {
    validate_amount(payment.amount)?;
    validate_method_code(&payment.payment_method_code)
}

// =============================================================================
// Unit Tests
// =============================================================================
