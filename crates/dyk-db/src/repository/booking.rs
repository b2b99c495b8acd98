//! # Booking Repository
//!
//! Database operations for course bookings.
//!
//! ## Booking Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout ──► insert() { status: confirmed }                            │
//! │                   │                                                     │
//! │                   ├──► update_status(Completed)  course held            │
//! │                   └──► update_status(Cancelled)  customer / school      │
//! │                                                                         │
//! │  Bookings are never deleted; invoices may reference them.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use dyk_core::{Booking, BookingStatus};

const BOOKING_COLUMNS: &str = r#"
    id, course_id, customer_id, contact_name, contact_email, contact_phone,
    booking_date, booking_time, participants, total_price_cents, status,
    schedule_id, invoice_id, created_at, updated_at
"#;

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Gets a booking by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a booking by ID on the caller's connection.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS);
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(booking)
    }

    /// Lists a customer's bookings, most recent course date first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE customer_id = ?1 ORDER BY booking_date DESC, created_at DESC",
            BOOKING_COLUMNS
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }

    /// Inserts a booking on the caller's connection.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - unknown course or customer
    pub async fn insert(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
        debug!(id = %booking.id, course_id = %booking.course_id, "Inserting booking");

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, course_id, customer_id, contact_name, contact_email, contact_phone,
                booking_date, booking_time, participants, total_price_cents, status,
                schedule_id, invoice_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.course_id)
        .bind(&booking.customer_id)
        .bind(&booking.contact_name)
        .bind(&booking.contact_email)
        .bind(&booking.contact_phone)
        .bind(booking.booking_date)
        .bind(&booking.booking_time)
        .bind(booking.participants)
        .bind(booking.total_price_cents)
        .bind(booking.status)
        .bind(&booking.schedule_id)
        .bind(&booking.invoice_id)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Records the invoice billing a booking. Only an unbilled booking can
    /// be linked.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no booking with this ID
    /// * `DbError::UniqueViolation` - the booking already has an invoice
    pub async fn link_invoice(
        conn: &mut SqliteConnection,
        booking_id: &str,
        invoice_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET invoice_id = ?2, updated_at = ?3 WHERE id = ?1 AND invoice_id IS NULL",
        )
        .bind(booking_id)
        .bind(invoice_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return match Self::find(conn, booking_id).await? {
                Some(_) => Err(DbError::duplicate("bookings.invoice_id", booking_id)),
                None => Err(DbError::not_found("Booking", booking_id)),
            };
        }

        debug!(booking_id = %booking_id, invoice_id = %invoice_id, "Booking linked to invoice");
        Ok(())
    }

    /// Changes a booking's status.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no booking with this ID
    pub async fn update_status(&self, id: &str, status: BookingStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE bookings SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", id));
        }

        info!(booking_id = %id, %status, "Booking status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_booking, sample_course, test_db};

    #[tokio::test]
    async fn test_insert_and_update_status() {
        let db = test_db().await;
        db.courses().insert(&sample_course("c-ow", Some(600))).await.unwrap();

        let booking = sample_booking("b-1", "c-ow");
        {
            let mut tx = db.begin().await.unwrap();
            BookingRepository::insert(&mut tx, &booking).await.unwrap();
            tx.commit().await.unwrap();
        }

        let repo = db.bookings();
        let stored = repo.get_by_id("b-1").await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.booking_date, booking.booking_date);
        assert_eq!(stored.total_price().cents(), 450_000);

        repo.update_status("b-1", BookingStatus::Completed).await.unwrap();
        assert_eq!(
            repo.get_by_id("b-1").await.unwrap().unwrap().status,
            BookingStatus::Completed
        );

        assert!(matches!(
            repo.update_status("missing", BookingStatus::Cancelled).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_link_invoice_only_once() {
        let db = test_db().await;
        db.courses().insert(&sample_course("c-ow", Some(600))).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        BookingRepository::insert(&mut tx, &sample_booking("b-1", "c-ow")).await.unwrap();
        assert_eq!(BookingRepository::find(&mut tx, "b-1").await.unwrap().unwrap().invoice_id, None);

        BookingRepository::link_invoice(&mut tx, "b-1", "inv-1").await.unwrap();
        let again = BookingRepository::link_invoice(&mut tx, "b-1", "inv-2").await;
        assert!(matches!(again, Err(DbError::UniqueViolation { .. })));
        let missing = BookingRepository::link_invoice(&mut tx, "b-404", "inv-3").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
        tx.commit().await.unwrap();

        let stored = db.bookings().get_by_id("b-1").await.unwrap().unwrap();
        assert_eq!(stored.invoice_id.as_deref(), Some("inv-1"));
    }

    #[tokio::test]
    async fn test_unknown_course_is_foreign_key_violation() {
        let db = test_db().await;

        let mut tx = db.begin().await.unwrap();
        let err = BookingRepository::insert(&mut tx, &sample_booking("b-1", "nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
