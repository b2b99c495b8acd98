//! # Settings Repository
//!
//! Key/value settings rows grouped by category (`company`, `invoicing`,
//! `checkout`, ...). The order engine only reads them; `upsert` exists for
//! seeding and tests.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;

/// Repository for settings rows.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads one value; `None` if the row does not exist.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Reads every row of a category as a key → value map.
    pub async fn get_category(&self, category: &str) -> DbResult<HashMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings WHERE category = ?1")
                .bind(category)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    /// Inserts or replaces a row.
    pub async fn upsert(&self, key: &str, value: &str, category: &str) -> DbResult<()> {
        debug!(key = %key, category = %category, "Upserting setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, category, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                category = excluded.category,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(category)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::test_db;

    #[tokio::test]
    async fn test_get_and_upsert() {
        let db = test_db().await;
        let repo = db.settings();

        assert_eq!(repo.get("invoice_prefix").await.unwrap(), None);

        repo.upsert("invoice_prefix", "DS", "invoicing").await.unwrap();
        repo.upsert("invoice_terms_days", "10", "invoicing").await.unwrap();
        repo.upsert("company_name", "Dykskolan AB", "company").await.unwrap();
        repo.upsert("invoice_prefix", "DYKS", "invoicing").await.unwrap();

        assert_eq!(repo.get("invoice_prefix").await.unwrap().as_deref(), Some("DYKS"));

        let invoicing = repo.get_category("invoicing").await.unwrap();
        assert_eq!(invoicing.len(), 2);
        assert_eq!(invoicing.get("invoice_terms_days").map(String::as_str), Some("10"));
    }
}
