//! Fixtures shared by the repository tests.

use chrono::{NaiveDate, Utc};

use crate::pool::{Database, DbConfig};
use dyk_core::cart::{price_lines, NormalizedLine};
use dyk_core::{
    Booking, BookingStatus, Course, Customer, Equipment, Invoice, InvoiceItem, InvoiceStatus,
    Money, VatRate,
};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub(crate) fn sample_course(id: &str, vat_rate_bps: Option<u32>) -> Course {
    let now = Utc::now();
    Course {
        id: id.to_string(),
        name: "Open Water Diver".to_string(),
        description: Some("Grundkurs i sportdykning".to_string()),
        price_cents: 450_000,
        vat_rate_bps,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_equipment(id: &str, available_quantity: i64) -> Equipment {
    let now = Utc::now();
    Equipment {
        id: id.to_string(),
        name: "Torrdräkt".to_string(),
        rent_price_cents: Some(10_000),
        sale_price_cents: None,
        available_quantity,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_customer(id: &str, email: &str) -> Customer {
    let now = Utc::now();
    Customer {
        id: id.to_string(),
        email: email.to_string(),
        first_name: "Anna".to_string(),
        last_name: "Svensson".to_string(),
        phone: None,
        address: None,
        zip: None,
        city: None,
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        gdpr_consent: true,
        gdpr_consent_at: Some(now),
        created_at: now,
    }
}

pub(crate) fn sample_booking(id: &str, course_id: &str) -> Booking {
    let now = Utc::now();
    Booking {
        id: id.to_string(),
        course_id: course_id.to_string(),
        customer_id: None,
        contact_name: "Anna Svensson".to_string(),
        contact_email: "anna@example.se".to_string(),
        contact_phone: None,
        booking_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default(),
        booking_time: "09:00".to_string(),
        participants: 1,
        total_price_cents: 450_000,
        status: BookingStatus::Confirmed,
        schedule_id: None,
        invoice_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// A two-line invoice (course at 6 %, rental at 25 %) with priced items.
pub(crate) fn sample_invoice(id: &str, number: &str) -> (Invoice, Vec<InvoiceItem>) {
    let totals = price_lines(&[
        NormalizedLine {
            description: "Kurs: Open Water Diver".to_string(),
            quantity: 1,
            gross_total: Money::from_cents(450_000),
            vat_rate: VatRate::REDUCED_EDUCATION,
        },
        NormalizedLine {
            description: "Hyra: Torrdräkt".to_string(),
            quantity: 1,
            gross_total: Money::from_cents(10_000),
            vat_rate: VatRate::STANDARD,
        },
    ])
    .unwrap();

    let today = Utc::now().date_naive();
    let invoice = Invoice {
        id: id.to_string(),
        invoice_number: number.to_string(),
        booking_id: None,
        customer_id: None,
        buyer_name: "Anna Svensson".to_string(),
        buyer_email: "anna@example.se".to_string(),
        buyer_address: None,
        subtotal_cents: totals.subtotal.cents(),
        vat_amount_cents: totals.vat_amount.cents(),
        total_amount_cents: totals.total_amount.cents(),
        vat_summary: totals.vat_summary.clone(),
        invoice_date: today,
        due_date: today,
        status: InvoiceStatus::Unpaid,
        pdf_generated: false,
        sent_at: None,
        paid_at: None,
        created_at: Utc::now(),
    };

    let items = totals
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| InvoiceItem {
            id: format!("{}-item-{}", id, idx + 1),
            invoice_id: id.to_string(),
            line_number: idx as i64 + 1,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price_cents: line.net_unit_price().cents(),
            total_cents: line.net_total().cents(),
            vat_rate_bps: line.vat_rate.bps(),
        })
        .collect();

    (invoice, items)
}
