//! # Equipment Repository
//!
//! Stock levels and the inventory audit trail.
//!
//! ## Stock Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  take_stock(conn, id, qty, Rental|Sale, reference)                      │
//! │                                                                         │
//! │    UPDATE equipment                                                     │
//! │       SET available_quantity = available_quantity - qty                 │
//! │     WHERE id = ? AND available_quantity >= qty                          │
//! │    RETURNING available_quantity                                         │
//! │                                                                         │
//! │    row returned? ──yes──► INSERT inventory_transactions (delta = -qty)  │
//! │         │                                                               │
//! │         no ──► article exists? ──yes──► StockChange::Insufficient       │
//! │                      │                                                  │
//! │                      no ──► DbError::NotFound                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The decrement is relative and guarded in the same statement, so two
//! concurrent orders for the last unit can never both succeed.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use dyk_core::{Equipment, InventoryTransaction, InventoryTransactionType};

/// Result of a guarded stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Stock was taken; `remaining` units are left.
    Applied { remaining: i64 },
    /// Not enough units; nothing was changed.
    Insufficient { available: i64 },
}

/// Repository for equipment database operations.
#[derive(Debug, Clone)]
pub struct EquipmentRepository {
    pool: SqlitePool,
}

impl EquipmentRepository {
    /// Creates a new EquipmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EquipmentRepository { pool }
    }

    /// Gets an article by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT id, name, rent_price_cents, sale_price_cents,
                   available_quantity, is_active, created_at, updated_at
            FROM equipment
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(equipment)
    }

    /// Inserts an article.
    pub async fn insert(&self, equipment: &Equipment) -> DbResult<()> {
        debug!(id = %equipment.id, name = %equipment.name, "Inserting equipment");

        sqlx::query(
            r#"
            INSERT INTO equipment (
                id, name, rent_price_cents, sale_price_cents,
                available_quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&equipment.id)
        .bind(&equipment.name)
        .bind(equipment.rent_price_cents)
        .bind(equipment.sale_price_cents)
        .bind(equipment.available_quantity)
        .bind(equipment.is_active)
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Takes `quantity` units out of stock and records the audit row.
    ///
    /// Runs on the caller's connection so it commits or rolls back with the
    /// surrounding order.
    ///
    /// ## Returns
    /// * `Ok(StockChange::Applied)` - stock decremented, audit row written
    /// * `Ok(StockChange::Insufficient)` - nothing changed
    /// * `Err(DbError::NotFound)` - unknown article
    pub async fn take_stock(
        conn: &mut SqliteConnection,
        equipment_id: &str,
        quantity: i64,
        kind: InventoryTransactionType,
        reference: &str,
    ) -> DbResult<StockChange> {
        debug!(equipment_id = %equipment_id, quantity, ?kind, "Taking stock");

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE equipment
            SET available_quantity = available_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND available_quantity >= ?2
            RETURNING available_quantity
            "#,
        )
        .bind(equipment_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        match remaining {
            Some(remaining) => {
                Self::record(&mut *conn, equipment_id, kind, -quantity, Some(reference)).await?;
                Ok(StockChange::Applied { remaining })
            }
            None => {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT available_quantity FROM equipment WHERE id = ?1")
                        .bind(equipment_id)
                        .fetch_optional(&mut *conn)
                        .await?;

                match available {
                    Some(available) => Ok(StockChange::Insufficient { available }),
                    None => Err(DbError::not_found("Equipment", equipment_id)),
                }
            }
        }
    }

    /// Puts `quantity` units back on the shelf (returned rentals, deliveries).
    pub async fn restock(&self, equipment_id: &str, quantity: i64, reference: &str) -> DbResult<i64> {
        if quantity <= 0 {
            return Err(DbError::QueryFailed(format!(
                "restock quantity must be positive, got {}",
                quantity
            )));
        }

        let mut tx = self.pool.begin().await?;

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE equipment
            SET available_quantity = available_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            RETURNING available_quantity
            "#,
        )
        .bind(equipment_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let remaining = remaining.ok_or_else(|| DbError::not_found("Equipment", equipment_id))?;

        Self::record(
            &mut tx,
            equipment_id,
            InventoryTransactionType::Restock,
            quantity,
            Some(reference),
        )
        .await?;

        tx.commit().await?;

        info!(equipment_id = %equipment_id, quantity, remaining, "Equipment restocked");
        Ok(remaining)
    }

    /// Lists the audit rows for an article, oldest first.
    pub async fn transactions_for(&self, equipment_id: &str) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            SELECT id, equipment_id, transaction_type, quantity_delta, reference, created_at
            FROM inventory_transactions
            WHERE equipment_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn record(
        conn: &mut SqliteConnection,
        equipment_id: &str,
        kind: InventoryTransactionType,
        delta: i64,
        reference: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, equipment_id, transaction_type, quantity_delta, reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(equipment_id)
        .bind(kind)
        .bind(delta)
        .bind(reference)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_equipment, test_db};

    #[tokio::test]
    async fn test_take_stock_applies_and_audits() {
        let db = test_db().await;
        let repo = db.equipment();
        repo.insert(&sample_equipment("eq-suit", 3)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let change = EquipmentRepository::take_stock(
            &mut tx,
            "eq-suit",
            2,
            InventoryTransactionType::Rental,
            "order test",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change, StockChange::Applied { remaining: 1 });
        assert_eq!(repo.get_by_id("eq-suit").await.unwrap().unwrap().available_quantity, 1);

        let audit = repo.transactions_for("eq-suit").await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].quantity_delta, -2);
        assert_eq!(audit[0].transaction_type, InventoryTransactionType::Rental);
    }

    #[tokio::test]
    async fn test_take_stock_refuses_oversell() {
        let db = test_db().await;
        let repo = db.equipment();
        repo.insert(&sample_equipment("eq-suit", 1)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let change = EquipmentRepository::take_stock(
            &mut tx,
            "eq-suit",
            2,
            InventoryTransactionType::Sale,
            "order test",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change, StockChange::Insufficient { available: 1 });
        assert_eq!(repo.get_by_id("eq-suit").await.unwrap().unwrap().available_quantity, 1);
        assert!(repo.transactions_for("eq-suit").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_stock_unknown_article() {
        let db = test_db().await;

        let mut tx = db.begin().await.unwrap();
        let err = EquipmentRepository::take_stock(
            &mut tx,
            "missing",
            1,
            InventoryTransactionType::Rental,
            "order test",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restock() {
        let db = test_db().await;
        let repo = db.equipment();
        repo.insert(&sample_equipment("eq-mask", 0)).await.unwrap();

        assert_eq!(repo.restock("eq-mask", 5, "delivery").await.unwrap(), 5);
        assert!(repo.restock("eq-mask", 0, "noop").await.is_err());
        assert!(matches!(
            repo.restock("missing", 1, "x").await,
            Err(DbError::NotFound { .. })
        ));

        let audit = repo.transactions_for("eq-mask").await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].transaction_type, InventoryTransactionType::Restock);
        assert_eq!(audit[0].quantity_delta, 5);
    }
}
