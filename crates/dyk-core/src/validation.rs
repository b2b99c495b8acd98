//! # Validation Module
//!
//! Input validation for checkout requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer                                                   │
//! │  └── Required contact fields, JSON shape (deserialization)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any transaction is opened)               │
//! │  ├── Cart non-empty, bounded                                           │
//! │  ├── Prices ≥ 0, participants/quantities in range                      │
//! │  └── Contact fields, e-mail shape                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── Foreign keys (course_id, equipment_id)                            │
//! │  ├── UNIQUE invoice_number                                             │
//! │  └── CHECK available_quantity >= 0                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::cart::CartLine;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY, MAX_PARTICIPANTS, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a required text field is present.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the shape of an e-mail address.
///
/// This is a plausibility check only (one `@`, a dot in the domain, no
/// whitespace); delivery is what proves an address.
///
/// ## Example
/// ```rust
/// use dyk_core::validation::validate_email;
///
/// assert!(validate_email("anna@example.se").is_ok());
/// assert!(validate_email("anna.example.se").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required("email", email)?;

    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let (local, domain) = email.split_once('@').ok_or_else(|| invalid("missing @"))?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid("expected exactly one @ with a local part"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a gross price in öre: `0..=MAX_PRICE_CENTS`.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a count (participants or equipment quantity).
pub fn validate_count(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    if value < 1 || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Validates a VAT rate in basis points: 0 ≤ bps < 10000.
pub fn validate_vat_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps >= 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "vat_rate".to_string(),
            min: 0,
            max: 9_999,
        });
    }
    Ok(())
}

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates a whole cart before the order transaction starts.
///
/// ## Rules
/// - At least one line, at most [`MAX_CART_LINES`]
/// - Every price in 0..=[`MAX_PRICE_CENTS`]
/// - Participants in 1..=[`MAX_PARTICIPANTS`]
/// - Quantities in 1..=[`MAX_ITEM_QUANTITY`]
/// - Course and equipment references present
pub fn validate_cart(lines: &[CartLine]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if lines.len() > MAX_CART_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        });
    }

    for (idx, line) in lines.iter().enumerate() {
        let field = |name: &str| format!("items[{}].{}", idx, name);

        validate_price_cents(&field("unit_price"), line.unit_price().cents())?;

        match line {
            CartLine::Course(c) => {
                validate_required(&field("course_id"), &c.course_id)?;
                validate_required(&field("time"), &c.time)?;
                validate_count(&field("participants"), c.participants, MAX_PARTICIPANTS)?;
            }
            CartLine::EquipmentRental(e) | CartLine::EquipmentSale(e) => {
                validate_required(&field("equipment_id"), &e.equipment_id)?;
                validate_required(&field("name"), &e.name)?;
                validate_count(&field("quantity"), e.quantity, MAX_ITEM_QUANTITY)?;
            }
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CourseLine, EquipmentLine};
    use crate::money::Money;
    use chrono::NaiveDate;

    fn rental(price: i64, quantity: i64) -> CartLine {
        CartLine::EquipmentRental(EquipmentLine {
            equipment_id: "eq-1".to_string(),
            name: "Torrdräkt".to_string(),
            unit_price: Money::from_cents(price),
            quantity,
        })
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("first_name", "Anna").is_ok());
        assert!(validate_required("first_name", "   ").is_err());
        assert!(validate_required("first_name", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("anna@example.se").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("anna@").is_err());
        assert!(validate_email("@example.se").is_err());
        assert!(validate_email("anna@@example.se").is_err());
        assert!(validate_email("anna @example.se").is_err());
        assert!(validate_email("anna@localhost").is_err());
    }

    #[test]
    fn test_validate_vat_rate_bps() {
        assert!(validate_vat_rate_bps(0).is_ok());
        assert!(validate_vat_rate_bps(2500).is_ok());
        assert!(validate_vat_rate_bps(10_000).is_err());
    }

    #[test]
    fn test_validate_cart_empty() {
        assert!(matches!(validate_cart(&[]), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_validate_cart_lines() {
        assert!(validate_cart(&[rental(10_000, 1)]).is_ok());
        assert!(validate_cart(&[rental(0, 1)]).is_ok());
        assert!(validate_cart(&[rental(-1, 1)]).is_err());
        assert!(validate_cart(&[rental(10_000, 0)]).is_err());
        assert!(validate_cart(&[rental(MAX_PRICE_CENTS, MAX_ITEM_QUANTITY)]).is_ok());
        assert!(matches!(
            validate_cart(&[rental(i64::MAX / 2, 3)]),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let course = CartLine::Course(CourseLine {
            course_id: "c1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            time: "09:00".to_string(),
            participants: 0,
            schedule_id: None,
            unit_price: Money::from_cents(450_000),
        });
        let err = validate_cart(&[course]).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Validation error: items[0].participants must be between 1 and {}",
                MAX_PARTICIPANTS
            )
        );
    }

    #[test]
    fn test_validate_cart_too_large() {
        let lines = vec![rental(100, 1); MAX_CART_LINES + 1];
        assert!(matches!(validate_cart(&lines), Err(CoreError::CartTooLarge { .. })));
    }
}
