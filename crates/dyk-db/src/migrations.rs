//! Schema migrations, embedded from `migrations/sqlite/` at compile time.
//!
//! Applied in file order by [`Database::new`](crate::Database::new); sqlx
//! records each one with its checksum in `_sqlx_migrations`, so an applied
//! file must never be edited. Schema changes go in a new `NNN_name.sql`.
//!
//! `001_initial_schema.sql` seeds the single `invoice_sequence` row at zero.
//! No later migration may reset it: issued invoice numbers stay unique for
//! the life of the database.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    // A database that never ran a migration has no bookkeeping table yet.
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();

        assert!(embedded >= 1);
        assert_eq!(embedded, applied);
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_zero() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let (_, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(applied, 0);

        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(embedded, applied);
    }

    #[tokio::test]
    async fn test_sequence_row_seeded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let value: i64 = sqlx::query_scalar("SELECT value FROM invoice_sequence WHERE id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();

        assert_eq!(value, 0);
    }
}
