//! # Domain Types
//!
//! Core domain types shared by the order and invoicing engine.
//!
//! ```text
//! Course ─1:N─► Booking ─0..1─► Invoice ─1:N─► InvoiceItem
//!                  ▲               ▲
//!               Customer ──────────┘  (buyer_email, customer_id)
//!
//! Equipment ─1:N─► InventoryTransaction   (delta < 0 per sale or rental)
//! ```
//!
//! Monetary columns are stored in öre (`*_cents`) and VAT rates in basis
//! points (`*_bps`). Accessors return the strongly typed [`Money`] and
//! [`VatRate`] wrappers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::vat::VatSummary;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate in basis points: 2500 is the standard 25 %, 600 the 6 % that
/// courses carry. Compared and grouped as plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatRate(u32);

impl VatRate {
    /// Standard rate applied to equipment rentals and sales.
    pub const STANDARD: VatRate = VatRate(2500);

    /// Reduced rate for instructional services, used when a course has no
    /// rate of its own.
    pub const REDUCED_EDUCATION: VatRate = VatRate(600);

    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    /// Checks if the VAT rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a fractional rate as stored in settings rows (`"0.25"`).
    ///
    /// Accepts up to four decimals and rejects rates of 100 % or more.
    ///
    /// ## Example
    /// ```rust
    /// use dyk_core::types::VatRate;
    ///
    /// assert_eq!(VatRate::parse_fraction("0.25").unwrap().bps(), 2500);
    /// assert_eq!(VatRate::parse_fraction("0.125").unwrap().bps(), 1250);
    /// assert!(VatRate::parse_fraction("1.5").is_err());
    /// ```
    pub fn parse_fraction(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "vat_rate".to_string(),
            reason: reason.to_string(),
        };

        let raw = raw.trim();
        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty value"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a decimal fraction such as 0.25"));
        }
        if frac.len() > 4 {
            return Err(invalid("at most four decimals are supported"));
        }
        if !whole.is_empty() && whole.trim_start_matches('0') != "" {
            return Err(ValidationError::OutOfRange {
                field: "vat_rate".to_string(),
                min: 0,
                max: 9999,
            });
        }

        let padded = format!("{:0<4}", frac);
        let bps: u32 = padded.parse().map_err(|_| invalid("not a number"))?;
        Ok(VatRate(bps))
    }

    /// The rate as a two-decimal fraction string, e.g. `"0.25"`.
    ///
    /// This is the key under which the rate appears in `vat_summary`.
    /// Rates are rounded half-up to whole percent.
    pub fn summary_key(&self) -> String {
        let percent = (self.0 + 50) / 100;
        format!("{}.{:02}", percent / 100, percent % 100)
    }

    /// Human readable percentage for documents, e.g. `25 %` or `12.5 %`.
    pub fn percent_label(&self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            format!("{} %", whole)
        } else if frac % 10 == 0 {
            format!("{}.{} %", whole, frac / 10)
        } else {
            format!("{}.{:02} %", whole, frac)
        }
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::STANDARD
    }
}

// =============================================================================
// Catalogue
// =============================================================================

/// A course offered by the school.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// List price in öre, VAT included.
    pub price_cents: i64,
    /// Course-specific VAT rate; `None` means the reduced education rate.
    pub vat_rate_bps: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// The VAT rate that applies to bookings of this course.
    pub fn vat_rate(&self) -> VatRate {
        self.vat_rate_bps
            .map(VatRate::from_bps)
            .unwrap_or(VatRate::REDUCED_EDUCATION)
    }
}

/// A rentable or sellable equipment article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub rent_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
    /// Units currently on the shelf.
    pub available_quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer account, created at checkout when registration is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gdpr_consent: bool,
    pub gdpr_consent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Full name as shown on invoices.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Booking
// =============================================================================

/// The status of a course booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested but not yet confirmed by the school.
    Pending,
    /// Confirmed; orders placed through checkout start here.
    Confirmed,
    /// Cancelled by customer or school.
    Cancelled,
    /// Course has been held.
    Completed,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A booking of one course occasion, derived from a course cart line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Booking {
    pub id: String,
    pub course_id: String,
    /// Linked customer account, if the buyer has one.
    pub customer_id: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[ts(as = "String")]
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub participants: i64,
    /// Gross price of the whole booking in öre.
    pub total_price_cents: i64,
    pub status: BookingStatus,
    pub schedule_id: Option<String>,
    /// Invoice that bills this booking. A booking is invoiced at most once.
    pub invoice_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Returns the booking total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Why an equipment quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InventoryTransactionType {
    Rental,
    Sale,
    Restock,
}

/// Audit row for every equipment quantity change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryTransaction {
    pub id: String,
    pub equipment_id: String,
    pub transaction_type: InventoryTransactionType,
    /// Signed change; negative for rentals and sales.
    pub quantity_delta: i64,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

/// The financial record of one order.
///
/// ## Invariants
/// - `total_amount_cents == subtotal_cents + vat_amount_cents`
/// - `vat_summary` nets sum to `subtotal_cents`, vats to `vat_amount_cents`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    /// Originating booking (single-booking invoices only).
    pub booking_id: Option<String>,
    /// Buyer account (checkout orders with an account).
    pub customer_id: Option<String>,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_address: Option<String>,
    pub subtotal_cents: i64,
    pub vat_amount_cents: i64,
    pub total_amount_cents: i64,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub vat_summary: VatSummary,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub pdf_generated: bool,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn vat_amount(&self) -> Money {
        Money::from_cents(self.vat_amount_cents)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Bank payment reference; always the invoice number.
    pub fn payment_reference(&self) -> &str {
        &self.invoice_number
    }
}

/// One invoice row per cart line. All amounts are VAT-exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// Position within the invoice, starting at 1.
    pub line_number: i64,
    pub description: String,
    pub quantity: i64,
    /// Net unit price (display only, rounded).
    pub unit_price_cents: i64,
    /// Net line total; these sum exactly to the invoice subtotal.
    pub total_cents: i64,
    pub vat_rate_bps: u32,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.vat_rate_bps)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vat_rate_parse_fraction() {
        assert_eq!(VatRate::parse_fraction("0.25").unwrap(), VatRate::STANDARD);
        assert_eq!(VatRate::parse_fraction("0.06").unwrap().bps(), 600);
        assert_eq!(VatRate::parse_fraction(".12").unwrap().bps(), 1200);
        assert_eq!(VatRate::parse_fraction("0").unwrap(), VatRate::zero());
        assert_eq!(VatRate::parse_fraction(" 0.1 ").unwrap().bps(), 1000);

        assert!(VatRate::parse_fraction("").is_err());
        assert!(VatRate::parse_fraction("1").is_err());
        assert!(VatRate::parse_fraction("25").is_err());
        assert!(VatRate::parse_fraction("0.123456").is_err());
        assert!(VatRate::parse_fraction("abc").is_err());
        assert!(VatRate::parse_fraction("-0.25").is_err());
    }

    #[test]
    fn test_vat_rate_summary_key() {
        assert_eq!(VatRate::STANDARD.summary_key(), "0.25");
        assert_eq!(VatRate::REDUCED_EDUCATION.summary_key(), "0.06");
        assert_eq!(VatRate::zero().summary_key(), "0.00");
        assert_eq!(VatRate::from_bps(1250).summary_key(), "0.13");
    }

    #[test]
    fn test_vat_rate_percent_label() {
        assert_eq!(VatRate::STANDARD.percent_label(), "25 %");
        assert_eq!(VatRate::from_bps(1250).percent_label(), "12.5 %");
        assert_eq!(VatRate::from_bps(1225).percent_label(), "12.25 %");
    }

    #[test]
    fn test_course_vat_rate_fallback() {
        let now = Utc::now();
        let mut course = Course {
            id: "c1".to_string(),
            name: "Open Water Diver".to_string(),
            description: None,
            price_cents: 450_000,
            vat_rate_bps: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(course.vat_rate(), VatRate::REDUCED_EDUCATION);

        course.vat_rate_bps = Some(2500);
        assert_eq!(course.vat_rate(), VatRate::STANDARD);
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Unpaid);
        assert_eq!(BookingStatus::Confirmed.to_string(), "confirmed");
    }
}
