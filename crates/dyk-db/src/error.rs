//! Storage errors.
//!
//! Repositories return [`DbError`]; `dyk-orders` folds it into its own
//! `OrderError`, deciding there which failures a client may retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A keyed lookup or keyed UPDATE matched no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate invoice number or customer e-mail.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A booking, item or audit row pointing at a missing parent.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Schema CHECK rejected the row: negative stock, an invoice whose
    /// total is not subtotal + VAT.
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Another writer held the lock past `busy_timeout`.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection came free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Infrastructure trouble that may clear on its own, as opposed to bad
    /// input or missing rows.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::TransactionFailed(_)
        )
    }

    /// Sorts a SQLite error message into a variant. SQLite reports
    /// constraints as `"<KIND> constraint failed[: detail]"`.
    fn from_sqlite_message(msg: &str) -> Self {
        const UNIQUE: &str = "UNIQUE constraint failed: ";

        if let Some(columns) = msg.strip_prefix(UNIQUE) {
            return DbError::UniqueViolation {
                field: columns.to_string(),
                value: "unknown".to_string(),
            };
        }

        let message = msg.to_string();
        if msg.starts_with("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation { message }
        } else if msg.starts_with("CHECK constraint failed") {
            DbError::CheckViolation { message }
        } else if msg.contains("database is locked") || msg.contains("database is busy") {
            DbError::Busy(message)
        } else {
            DbError::QueryFailed(message)
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_pool_errors_are_transient() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted));
        assert!(err.is_transient());

        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_sqlite_messages_classified() {
        match DbError::from_sqlite_message("UNIQUE constraint failed: invoices.invoice_number") {
            DbError::UniqueViolation { field, .. } => assert_eq!(field, "invoices.invoice_number"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            DbError::from_sqlite_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            DbError::from_sqlite_message("CHECK constraint failed: stock_quantity >= 0"),
            DbError::CheckViolation { .. }
        ));

        let busy = DbError::from_sqlite_message("database is locked");
        assert!(matches!(busy, DbError::Busy(_)));
        assert!(busy.is_transient());

        assert!(matches!(
            DbError::from_sqlite_message("no such table: widgets"),
            DbError::QueryFailed(_)
        ));
    }
}
