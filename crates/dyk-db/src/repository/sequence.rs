//! # Invoice Sequence
//!
//! The shared counter behind invoice numbers.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order A (tx)                         Order B (tx)                      │
//! │     │                                    │                              │
//! │     ▼                                    │                              │
//! │  UPDATE invoice_sequence                 │                              │
//! │     SET value = value + 1                │                              │
//! │  RETURNING value   → 42                  ▼                              │
//! │     │                              UPDATE … waits for A's write lock    │
//! │  COMMIT ──────────────────────────────►  │                              │
//! │                                    RETURNING value → 43                 │
//! │                                                                         │
//! │  If A rolls back, its increment is undone and B receives 42:           │
//! │  no gaps, no duplicates.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The increment is a single statement executed by the database; the
//! application never reads the value and writes it back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for the invoice number counter.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Advances the counter on the caller's connection and returns the new
    /// value. Call inside the transaction that persists the invoice.
    pub async fn next(conn: &mut SqliteConnection) -> DbResult<i64> {
        let value: Option<i64> = sqlx::query_scalar(
            "UPDATE invoice_sequence SET value = value + 1 WHERE id = 1 RETURNING value",
        )
        .fetch_optional(&mut *conn)
        .await?;

        let value = value.ok_or_else(|| {
            DbError::Internal("invoice_sequence row is missing".to_string())
        })?;

        debug!(value, "Allocated invoice sequence value");
        Ok(value)
    }

    /// Allocates a value in its own transaction.
    pub async fn allocate(&self) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        let value = Self::next(&mut tx).await?;
        tx.commit().await?;
        Ok(value)
    }

    /// The last value handed out (0 before the first invoice).
    pub async fn current(&self) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar("SELECT value FROM invoice_sequence WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_next_is_monotonic() {
        let db = test_db().await;
        let seq = db.sequence();

        assert_eq!(seq.current().await.unwrap(), 0);
        assert_eq!(seq.allocate().await.unwrap(), 1);
        assert_eq!(seq.allocate().await.unwrap(), 2);
        assert_eq!(seq.current().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rolled_back_allocation_leaves_no_gap() {
        let db = test_db().await;

        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(SequenceRepository::next(&mut tx).await.unwrap(), 1);
            tx.rollback().await.unwrap();
        }

        assert_eq!(db.sequence().allocate().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct_and_gap_free() {
        let db = test_db().await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let seq = db.sequence();
                tokio::spawn(async move { seq.allocate().await })
            })
            .collect();

        let mut values = HashSet::new();
        for handle in handles {
            values.insert(handle.await.unwrap().unwrap());
        }

        let expected: HashSet<i64> = (1..=20).collect();
        assert_eq!(values, expected);
    }
}
