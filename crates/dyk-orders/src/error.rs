//! # Order Error Type
//!
//! What callers of the order and invoice services see when something fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in an Order                               │
//! │                                                                         │
//! │  process_order(request, settings)                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  validate_cart ──── CoreError::EmptyCart ──────────────┐                │
//! │         │                                              │                │
//! │         ▼                                              ▼                │
//! │  BEGIN ... COMMIT ── DbError / CoreError ── rollback ─ OrderError ────► │
//! │         │                                              ▲                │
//! │         ▼                                              │                │
//! │  tokio::time::timeout ─────── elapsed ─────────────────┘                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  welcome e-mail ─── failure is logged, never returned                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for equipment eq-1: 2 requested, 1 available"
//! }
//! ```

use serde::Serialize;
use std::fmt;

use dyk_core::CoreError;
use dyk_db::DbError;

/// Error returned by the order and invoice services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes, one per way an order can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input rejected (400)
    ValidationError,

    /// Referenced course, equipment, booking or invoice missing (404)
    NotFound,

    /// Not enough units of an article (409)
    InsufficientStock,

    /// Constraint collision, e.g. a duplicate invoice number or a booking
    /// that is already invoiced (409)
    Conflict,

    /// Database, PDF or mail transport failure (503/500, retryable)
    Infrastructure,

    /// The order did not finish within the configured timeout (504)
    Timeout,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Infrastructure => "INFRASTRUCTURE",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }
}

impl OrderError {
    /// Creates a new order error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        OrderError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        OrderError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an infrastructure error.
    pub fn infrastructure(message: impl Into<String>) -> Self {
        OrderError::new(ErrorCode::Infrastructure, message)
    }

    pub fn already_invoiced(booking_id: &str) -> Self {
        OrderError::new(
            ErrorCode::Conflict,
            format!("Booking {} is already invoiced", booking_id),
        )
    }

    pub fn timeout(seconds: u64) -> Self {
        OrderError::new(
            ErrorCode::Timeout,
            format!("Order did not complete within {} seconds", seconds),
        )
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Conflict | ErrorCode::Infrastructure | ErrorCode::Timeout
        )
    }

    /// HTTP status an outer layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self.code {
            ErrorCode::ValidationError => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => 409,
            ErrorCode::Infrastructure => 503,
            ErrorCode::Timeout => 504,
        }
    }
}

/// Converts database errors to order errors.
impl From<DbError> for OrderError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => OrderError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => OrderError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                OrderError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Constraint violation: {}", message);
                OrderError::new(ErrorCode::Conflict, "Order violates a database constraint")
            }
            DbError::Busy(e) => {
                tracing::error!("Database busy: {}", e);
                OrderError::infrastructure("Database is busy")
            }
            DbError::ConnectionFailed(_) => OrderError::infrastructure("Database connection failed"),
            DbError::MigrationFailed(_) => OrderError::infrastructure("Database migration failed"),
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                OrderError::infrastructure("Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                OrderError::infrastructure("Database transaction failed")
            }
            DbError::PoolExhausted => OrderError::infrastructure("Database pool exhausted"),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                OrderError::infrastructure("Database operation failed")
            }
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Converts core errors to order errors.
impl From<CoreError> for OrderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CourseNotFound(id) => OrderError::not_found("Course", &id),
            CoreError::EquipmentNotFound(id) => OrderError::not_found("Equipment", &id),
            CoreError::InsufficientStock { .. } => {
                OrderError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::EmptyCart => OrderError::validation("Cart is empty"),
            CoreError::CartTooLarge { max } => {
                OrderError::validation(format!("Cart cannot have more than {} lines", max))
            }
            CoreError::AmountOverflow(_) => OrderError::validation(err.to_string()),
            CoreError::Validation(e) => OrderError::validation(e.to_string()),
        }
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for OrderError {}

pub type OrderResult<T> = Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dyk_core::ValidationError;

    #[test]
    fn test_serializes_code_and_message() {
        let err = OrderError::not_found("Course", "c-9");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Course not found: c-9");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: OrderError = CoreError::EmptyCart.into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.http_status(), 400);
        assert!(!err.is_retryable());

        let err: OrderError = CoreError::InsufficientStock {
            equipment_id: "eq-1".to_string(),
            requested: 3,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("eq-1"));

        let err: OrderError = CoreError::Validation(ValidationError::Required {
            field: "email".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_db_error_mapping() {
        let err: OrderError = DbError::duplicate("invoice_number", "DYK-2026-0001").into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 409);

        let err: OrderError = DbError::PoolExhausted.into();
        assert_eq!(err.code, ErrorCode::Infrastructure);
        assert_eq!(err.http_status(), 503);

        let err: OrderError = DbError::not_found("Equipment", "eq-404").into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_timeout() {
        let err = OrderError::timeout(30);
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 504);
        assert_eq!(err.to_string(), "[TIMEOUT] Order did not complete within 30 seconds");
    }
}
