//! # Error Types
//!
//! Failures raised while a cart is checked and priced.
//!
//! ```text
//! ValidationError ──#[from]──► CoreError ──► OrderError (dyk-orders) ──► HTTP
//!   bad request field          unknown course,     code + message
//!                              short stock, ...
//! ```
//!
//! Storage failures live in `dyk-db` as `DbError` and join the same
//! `OrderError` one level up.

use thiserror::Error;

/// Cart and pricing failures. Raising one mid-checkout abandons the order's
/// transaction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No course row for the line's `course_id`.
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Equipment not found: {0}")]
    EquipmentNotFound(String),

    /// The guarded decrement found fewer than `requested` units left.
    /// Stock never goes below zero.
    #[error("Insufficient stock for equipment {equipment_id}: requested {requested}")]
    InsufficientStock {
        equipment_id: String,
        requested: i64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A line total or invoice sum does not fit in an `i64` of öre.
    #[error("Amount too large: {0}")]
    AmountOverflow(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// A request field that fails its rule. Checked before any transaction is
/// opened, so nothing is locked or written.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Participants, quantities and VAT rates all have hard bounds.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// E-mail without `@`, a rate string that does not parse.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            equipment_id: "eq-7".to_string(),
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for equipment eq-7: requested 2"
        );
        assert_eq!(
            CoreError::CourseNotFound("c-1".to_string()).to_string(),
            "Course not found: c-1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::MustNotBeNegative {
            field: "items[0].unit_price".to_string(),
        };
        assert_eq!(err.to_string(), "items[0].unit_price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "first_name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
