//! # Invoice Service
//!
//! Everything that happens to an invoice after it exists: rendering the PDF,
//! e-mailing it, recording payment. Also builds the one-line invoice for a
//! booking made outside the checkout.
//!
//! ```text
//! render(invoice, items, company) ──► PDF bytes          (pure)
//! deliver(invoice, pdf, to)       ──► Mailer::send ──► mark_sent
//! mark_paid(id)                   ──► status = paid, paid_at = now
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dyk_core::cart::{normalize, price_lines};
use dyk_core::{CartLine, CompanySettings, CourseLine, Invoice, InvoiceItem, OrderSettings};
use dyk_db::{BookingRepository, CourseRepository, Database, InvoiceRepository};

use crate::error::{OrderError, OrderResult};
use crate::mailer::{invoice_email, Mailer};
use crate::orchestrator::{insert_invoice, Buyer};
use crate::render::{InvoiceLayout, LopdfEngine, PdfEngine};

pub struct InvoiceService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    engine: Arc<dyn PdfEngine>,
}

impl InvoiceService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>) -> Self {
        InvoiceService {
            db,
            mailer,
            engine: Arc::new(LopdfEngine::new()),
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Renders the invoice as a PDF. Touches nothing but the engine.
    pub fn render(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
        company: &CompanySettings,
    ) -> OrderResult<Vec<u8>> {
        let layout = InvoiceLayout::build(invoice, items, company);
        let bytes = self
            .engine
            .render(&layout)
            .map_err(|e| OrderError::infrastructure(e.to_string()))?;

        debug!(
            invoice_number = %invoice.invoice_number,
            pages = layout.pages.len(),
            bytes = bytes.len(),
            "Invoice rendered"
        );
        Ok(bytes)
    }

    /// Sends the PDF to `recipient` and records the delivery.
    ///
    /// May be called again for the same invoice; `sent_at` is refreshed.
    pub async fn deliver(
        &self,
        invoice: &Invoice,
        pdf: &[u8],
        recipient: &str,
        company: &CompanySettings,
    ) -> OrderResult<DateTime<Utc>> {
        let email = invoice_email(invoice, pdf.to_vec(), recipient, company);

        self.mailer.send(email).await.map_err(|e| {
            OrderError::infrastructure(format!(
                "Failed to send invoice {}: {}",
                invoice.invoice_number, e
            ))
        })?;

        let sent_at = self.db.invoices().mark_sent(&invoice.id).await?;
        info!(
            invoice_number = %invoice.invoice_number,
            to = %recipient,
            "Invoice delivered"
        );
        Ok(sent_at)
    }

    /// Loads, renders and delivers an invoice to its buyer.
    pub async fn send_invoice(
        &self,
        invoice_id: &str,
        company: &CompanySettings,
    ) -> OrderResult<DateTime<Utc>> {
        let invoices = self.db.invoices();
        let invoice = invoices
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Invoice", invoice_id))?;
        let items = invoices.get_items(invoice_id).await?;

        let pdf = self.render(&invoice, &items, company)?;
        let recipient = invoice.buyer_email.clone();
        self.deliver(&invoice, &pdf, &recipient, company).await
    }

    /// Marks an invoice paid. Repeating it only refreshes `paid_at`.
    pub async fn mark_paid(&self, invoice_id: &str) -> OrderResult<DateTime<Utc>> {
        Ok(self.db.invoices().mark_paid(invoice_id).await?)
    }

    /// Builds a one-line invoice for an existing booking.
    ///
    /// A booking is billed once. One that already has an invoice, including
    /// bookings made through the checkout, is rejected with
    /// `ErrorCode::Conflict` and nothing is written.
    pub async fn create_for_booking(
        &self,
        booking_id: &str,
        settings: &OrderSettings,
    ) -> OrderResult<(Invoice, Vec<InvoiceItem>)> {
        let mut tx = self.db.begin().await?;

        let booking = BookingRepository::find(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Booking", booking_id))?;

        if booking.invoice_id.is_some()
            || InvoiceRepository::count_billing(&mut *tx, booking_id).await? > 0
        {
            warn!(booking_id = %booking_id, "Booking already invoiced");
            return Err(OrderError::already_invoiced(booking_id));
        }

        let course = CourseRepository::find(&mut *tx, &booking.course_id).await?;
        let line = CartLine::Course(CourseLine {
            course_id: booking.course_id.clone(),
            date: booking.booking_date,
            time: booking.booking_time.clone(),
            participants: booking.participants,
            schedule_id: booking.schedule_id.clone(),
            unit_price: booking.total_price(),
        });
        let normalized = normalize(&line, course.as_ref(), settings.default_vat_rate)?;
        let totals = price_lines(&[normalized])?;

        let buyer = Buyer {
            customer_id: booking.customer_id.clone(),
            booking_id: Some(booking.id.clone()),
            name: booking.contact_name.clone(),
            email: booking.contact_email.clone(),
            address: None,
        };
        let (invoice, items) = insert_invoice(
            &mut *tx,
            Uuid::new_v4().to_string(),
            &totals,
            buyer,
            settings,
            Utc::now().date_naive(),
        )
        .await?;
        BookingRepository::link_invoice(&mut *tx, booking_id, &invoice.id).await?;

        tx.commit().await?;

        info!(
            invoice_number = %invoice.invoice_number,
            booking_id = %booking_id,
            "Booking invoice created"
        );
        Ok((invoice, items))
    }
}
