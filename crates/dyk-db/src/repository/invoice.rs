//! # Invoice Repository
//!
//! Database operations for invoices and invoice items.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE (inside the order transaction)                              │
//! │     └── insert(conn, invoice, items) → status: unpaid                  │
//! │                                                                         │
//! │  2. DELIVER (any number of times)                                      │
//! │     └── mark_sent() → pdf_generated = 1, sent_at = now                 │
//! │                                                                         │
//! │  3. PAY (idempotent)                                                   │
//! │     └── mark_paid() → status: paid, paid_at = now                      │
//! │                                                                         │
//! │  Invoices are never deleted.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use dyk_core::{Invoice, InvoiceItem, InvoiceStatus};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, booking_id, customer_id, buyer_name, buyer_email,
    buyer_address, subtotal_cents, vat_amount_cents, total_amount_cents,
    vat_summary, invoice_date, due_date, status, pdf_generated, sent_at,
    paid_at, created_at
"#;

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets an invoice by its number (the customer's payment reference).
    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE invoice_number = ?1",
            INVOICE_COLUMNS
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets the items of an invoice in line order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, line_number, description, quantity,
                   unit_price_cents, total_cents, vat_rate_bps
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY line_number
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists a customer's invoices, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE customer_id = ?1 ORDER BY invoice_date DESC, invoice_number DESC",
            INVOICE_COLUMNS
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }

    /// Inserts an invoice and its items on the caller's connection.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - invoice number already used
    /// * `DbError::CheckViolation` - total != subtotal + vat
    pub async fn insert(
        conn: &mut SqliteConnection,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            items = items.len(),
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, booking_id, customer_id, buyer_name, buyer_email,
                buyer_address, subtotal_cents, vat_amount_cents, total_amount_cents,
                vat_summary, invoice_date, due_date, status, pdf_generated, sent_at,
                paid_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.booking_id)
        .bind(&invoice.customer_id)
        .bind(&invoice.buyer_name)
        .bind(&invoice.buyer_email)
        .bind(&invoice.buyer_address)
        .bind(invoice.subtotal_cents)
        .bind(invoice.vat_amount_cents)
        .bind(invoice.total_amount_cents)
        .bind(Json(&invoice.vat_summary))
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(invoice.pdf_generated)
        .bind(invoice.sent_at)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: invoice.invoice_number.clone(),
            },
            other => other,
        })?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, line_number, description, quantity,
                    unit_price_cents, total_cents, vat_rate_bps
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(item.line_number)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .bind(item.vat_rate_bps)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Records a delivery. Re-sending is allowed and refreshes `sent_at`.
    pub async fn mark_sent(&self, id: &str) -> DbResult<DateTime<Utc>> {
        let now = Utc::now();
        let result =
            sqlx::query("UPDATE invoices SET pdf_generated = 1, sent_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        info!(invoice_id = %id, "Invoice marked as sent");
        Ok(now)
    }

    /// Marks an invoice paid. Calling it again keeps the status and
    /// refreshes `paid_at`.
    pub async fn mark_paid(&self, id: &str) -> DbResult<DateTime<Utc>> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE invoices SET status = ?2, paid_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(InvoiceStatus::Paid)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        info!(invoice_id = %id, "Invoice marked as paid");
        Ok(now)
    }

    /// Number of invoices billing a booking, whether issued for the booking
    /// alone or by the checkout that created it.
    pub async fn count_for_booking(&self, booking_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_billing(&mut conn, booking_id).await
    }

    /// [`count_for_booking`](Self::count_for_booking) on the caller's connection.
    pub async fn count_billing(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE booking_id = ?1
               OR id = (SELECT invoice_id FROM bookings WHERE id = ?1)
            "#,
        )
        .bind(booking_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_invoice, test_db};

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = test_db().await;
        let (invoice, items) = sample_invoice("inv-1", "DYK-2026-0001");

        {
            let mut tx = db.begin().await.unwrap();
            InvoiceRepository::insert(&mut tx, &invoice, &items).await.unwrap();
            tx.commit().await.unwrap();
        }

        let repo = db.invoices();
        let stored = repo.get_by_number("DYK-2026-0001").await.unwrap().unwrap();
        assert_eq!(stored.id, "inv-1");
        assert_eq!(stored.status, InvoiceStatus::Unpaid);
        assert_eq!(stored.vat_summary, invoice.vat_summary);
        assert_eq!(stored.total_amount(), stored.subtotal() + stored.vat_amount());

        let stored_items = repo.get_items("inv-1").await.unwrap();
        assert_eq!(stored_items.len(), items.len());
        assert_eq!(stored_items[0].line_number, 1);

        assert_eq!(repo.list_for_customer("cust-1").await.unwrap().len(), 0);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = test_db().await;
        let (first, items) = sample_invoice("inv-1", "DYK-2026-0001");
        let (second, _) = sample_invoice("inv-2", "DYK-2026-0001");

        let mut tx = db.begin().await.unwrap();
        InvoiceRepository::insert(&mut tx, &first, &items).await.unwrap();
        let err = InvoiceRepository::insert(&mut tx, &second, &[]).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "DYK-2026-0001"));
    }

    #[tokio::test]
    async fn test_unbalanced_invoice_rejected() {
        let db = test_db().await;
        let (mut invoice, _) = sample_invoice("inv-1", "DYK-2026-0001");
        invoice.total_amount_cents += 1;

        let mut tx = db.begin().await.unwrap();
        let err = InvoiceRepository::insert(&mut tx, &invoice, &[]).await.unwrap_err();

        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let db = test_db().await;
        let (invoice, items) = sample_invoice("inv-1", "DYK-2026-0001");
        {
            let mut tx = db.begin().await.unwrap();
            InvoiceRepository::insert(&mut tx, &invoice, &items).await.unwrap();
            tx.commit().await.unwrap();
        }

        let repo = db.invoices();
        let first = repo.mark_paid("inv-1").await.unwrap();
        let second = repo.mark_paid("inv-1").await.unwrap();
        assert!(second >= first);

        let stored = repo.get_by_id("inv-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.paid_at, Some(second));

        assert!(matches!(repo.mark_paid("missing").await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_sent_can_repeat() {
        let db = test_db().await;
        let (invoice, items) = sample_invoice("inv-1", "DYK-2026-0001");
        {
            let mut tx = db.begin().await.unwrap();
            InvoiceRepository::insert(&mut tx, &invoice, &items).await.unwrap();
            tx.commit().await.unwrap();
        }

        let repo = db.invoices();
        repo.mark_sent("inv-1").await.unwrap();
        let again = repo.mark_sent("inv-1").await.unwrap();

        let stored = repo.get_by_id("inv-1").await.unwrap().unwrap();
        assert!(stored.pdf_generated);
        assert_eq!(stored.sent_at, Some(again));
    }
}
