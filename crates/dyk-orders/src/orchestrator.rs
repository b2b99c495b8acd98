//! # Order Orchestrator
//!
//! Turns a checkout request into bookings, inventory movements and a single
//! invoice, atomically.
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  process_order(request, &settings)                                      │
//! │                                                                         │
//! │  validate cart + contact fields          (no transaction yet)           │
//! │       │                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐   │
//! │  │ 1. registration mode → create_account                            │   │
//! │  │ 2. resolve / create customer                                     │   │
//! │  │ 3. course lines    → bookings (confirmed)                        │   │
//! │  │ 4. equipment lines → guarded stock decrement + audit row         │   │
//! │  │ 5. normalize, decompose, next invoice number, insert invoice     │   │
//! │  COMMIT ────────────────────────────────────────────────────────────┘   │
//! │       │            any error, or the timeout, drops tx → ROLLBACK       │
//! │       ▼                                                                 │
//! │  welcome e-mail (new accounts only, failure logged)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No in-process locks: concurrent orders are kept apart by the database
//! transaction, the atomic sequence and the relative stock decrement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use dyk_core::cart::{normalize, price_lines, InvoiceTotals};
use dyk_core::validation::{validate_cart, validate_email, validate_required};
use dyk_core::{
    Booking, BookingStatus, CartLine, CompanySettings, CoreError, Course, Customer, Invoice,
    InvoiceItem, InvoiceStatus, OrderSettings,
};
use dyk_db::{
    BookingRepository, CourseRepository, CustomerRepository, Database, EquipmentRepository,
    InvoiceRepository, SequenceRepository, StockChange,
};

use crate::config::ServiceConfig;
use crate::error::{OrderError, OrderResult};
use crate::mailer::{welcome_email, Mailer};
use crate::password::{generate_password, hash_password};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Request / Response
// =============================================================================

/// A checkout as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<CartLine>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Existing account placing the order.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Caller's wish; the registration mode has the final say.
    #[serde(default)]
    pub create_account: bool,
}

impl OrderRequest {
    pub fn buyer_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Street, then "zip city", comma separated.
    pub fn buyer_address(&self) -> Option<String> {
        let postal = match (non_blank(&self.zip), non_blank(&self.city)) {
            (Some(zip), Some(city)) => Some(format!("{} {}", zip, city)),
            (zip, city) => zip.or(city).map(str::to_string),
        };
        let parts: Vec<String> = non_blank(&self.address)
            .map(str::to_string)
            .into_iter()
            .chain(postal)
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    fn validate(&self) -> OrderResult<()> {
        validate_cart(&self.items)?;
        validate_required("first_name", &self.first_name).map_err(CoreError::from)?;
        validate_required("last_name", &self.last_name).map_err(CoreError::from)?;
        validate_email(&self.email).map_err(CoreError::from)?;
        if let Some(id) = &self.customer_id {
            validate_required("customer_id", id).map_err(CoreError::from)?;
        }
        Ok(())
    }
}

/// What the confirmation page renders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderConfirmation {
    pub bookings: Vec<Booking>,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub company: CompanySettings,
    /// A new account was registered by this order.
    pub account_created: bool,
}

// =============================================================================
// Service
// =============================================================================

/// Runs checkouts against the database.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
    site_url: String,
}

/// Account registered inside the order transaction, announced after commit.
struct NewAccount {
    email: String,
    first_name: String,
    password: String,
}

impl OrderService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>) -> Self {
        OrderService {
            db,
            mailer,
            timeout: DEFAULT_TIMEOUT,
            site_url: ServiceConfig::default().site_url,
        }
    }

    pub fn from_config(db: Database, mailer: Arc<dyn Mailer>, config: &ServiceConfig) -> Self {
        OrderService {
            db,
            mailer,
            timeout: config.order_timeout(),
            site_url: config.site_url.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Places an order.
    ///
    /// Returns either the committed bookings and invoice, or one error with
    /// nothing persisted.
    pub async fn process_order(
        &self,
        request: OrderRequest,
        settings: &OrderSettings,
    ) -> OrderResult<OrderConfirmation> {
        request.validate()?;

        debug!(
            lines = request.items.len(),
            email = %request.email,
            "Processing order"
        );

        let (confirmation, new_account) =
            match tokio::time::timeout(self.timeout, self.run_transaction(&request, settings)).await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(timeout_secs = self.timeout.as_secs(), "Order timed out, rolled back");
                    return Err(OrderError::timeout(self.timeout.as_secs()));
                }
            };

        info!(
            invoice_number = %confirmation.invoice.invoice_number,
            bookings = confirmation.bookings.len(),
            order_total = confirmation.invoice.total_amount_cents,
            "Order committed"
        );

        if let Some(account) = new_account {
            self.send_welcome(&account, &settings.company).await;
        }

        Ok(confirmation)
    }

    async fn run_transaction(
        &self,
        request: &OrderRequest,
        settings: &OrderSettings,
    ) -> OrderResult<(OrderConfirmation, Option<NewAccount>)> {
        let mut tx = self.db.begin().await?;
        let now = Utc::now();
        let invoice_id = Uuid::new_v4().to_string();

        let create_account = settings
            .registration_mode
            .resolve_create_account(request.create_account);

        let (customer_id, new_account) =
            resolve_customer(&mut *tx, request, create_account).await?;

        // Courses are read once, for the booking and for the invoice line
        let mut courses: HashMap<String, Course> = HashMap::new();
        let mut bookings = Vec::new();

        for line in &request.items {
            if let Some(course_line) = line.as_course() {
                let course = match courses.get(&course_line.course_id) {
                    Some(course) => course.clone(),
                    None => {
                        let course = CourseRepository::find(&mut *tx, &course_line.course_id)
                            .await?
                            .ok_or_else(|| CoreError::CourseNotFound(course_line.course_id.clone()))?;
                        courses.insert(course.id.clone(), course.clone());
                        course
                    }
                };

                let booking = Booking {
                    id: Uuid::new_v4().to_string(),
                    course_id: course.id.clone(),
                    customer_id: customer_id.clone(),
                    contact_name: request.buyer_name(),
                    contact_email: request.email.trim().to_string(),
                    contact_phone: non_blank(&request.phone).map(str::to_string),
                    booking_date: course_line.date,
                    booking_time: course_line.time.clone(),
                    participants: course_line.participants,
                    total_price_cents: course_line.unit_price.cents(),
                    status: BookingStatus::Confirmed,
                    schedule_id: course_line.schedule_id.clone(),
                    invoice_id: Some(invoice_id.clone()),
                    created_at: now,
                    updated_at: now,
                };
                BookingRepository::insert(&mut *tx, &booking).await?;
                bookings.push(booking);
            }

            if let Some((equipment_line, kind)) = line.as_equipment() {
                let change = EquipmentRepository::take_stock(
                    &mut *tx,
                    &equipment_line.equipment_id,
                    equipment_line.quantity,
                    kind,
                    &invoice_id,
                )
                .await?;

                if let StockChange::Insufficient { available } = change {
                    debug!(
                        equipment_id = %equipment_line.equipment_id,
                        requested = equipment_line.quantity,
                        available,
                        "Insufficient stock"
                    );
                    return Err(CoreError::InsufficientStock {
                        equipment_id: equipment_line.equipment_id.clone(),
                        requested: equipment_line.quantity,
                    }
                    .into());
                }
            }
        }

        let normalized = request
            .items
            .iter()
            .map(|line| {
                let course = line.as_course().and_then(|c| courses.get(&c.course_id));
                normalize(line, course, settings.default_vat_rate)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let totals = price_lines(&normalized)?;

        let buyer = Buyer {
            customer_id,
            booking_id: None,
            name: request.buyer_name(),
            email: request.email.trim().to_string(),
            address: request.buyer_address(),
        };
        let (invoice, items) =
            insert_invoice(&mut *tx, invoice_id, &totals, buyer, settings, now.date_naive())
                .await?;

        tx.commit().await?;

        Ok((
            OrderConfirmation {
                bookings,
                invoice,
                items,
                company: settings.company.clone(),
                account_created: new_account.is_some(),
            },
            new_account,
        ))
    }

    async fn send_welcome(&self, account: &NewAccount, company: &CompanySettings) {
        let email = welcome_email(
            &account.email,
            &account.first_name,
            &account.password,
            &self.site_url,
            company,
        );

        match self.mailer.send(email).await {
            Ok(_) => info!(email = %account.email, "Welcome email sent"),
            Err(e) => warn!(email = %account.email, error = %e, "Welcome email failed"),
        }
    }
}

/// Picks the account the order belongs to, registering one if asked.
async fn resolve_customer(
    conn: &mut SqliteConnection,
    request: &OrderRequest,
    create_account: bool,
) -> OrderResult<(Option<String>, Option<NewAccount>)> {
    if let Some(id) = &request.customer_id {
        if !CustomerRepository::exists(&mut *conn, id).await? {
            return Err(OrderError::not_found("Customer", id));
        }
        return Ok((Some(id.clone()), None));
    }

    if !create_account {
        return Ok((None, None));
    }

    if let Some(existing) = CustomerRepository::find_by_email(&mut *conn, &request.email).await? {
        debug!(customer_id = %existing.id, "Reusing existing account");
        return Ok((Some(existing.id), None));
    }

    let password = generate_password();
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        email: request.email.trim().to_string(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        phone: non_blank(&request.phone).map(str::to_string),
        address: non_blank(&request.address).map(str::to_string),
        zip: non_blank(&request.zip).map(str::to_string),
        city: non_blank(&request.city).map(str::to_string),
        password_hash: hash_password(&password)?,
        gdpr_consent: true,
        gdpr_consent_at: Some(now),
        created_at: now,
    };
    CustomerRepository::insert(&mut *conn, &customer).await?;
    info!(customer_id = %customer.id, "Account created at checkout");

    Ok((
        Some(customer.id),
        Some(NewAccount {
            email: customer.email,
            first_name: customer.first_name,
            password,
        }),
    ))
}

// =============================================================================
// Invoice Assembly
// =============================================================================

/// Who the invoice is addressed to.
pub(crate) struct Buyer {
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
}

/// Allocates the next number and writes the invoice with its items on the
/// caller's connection.
pub(crate) async fn insert_invoice(
    conn: &mut SqliteConnection,
    invoice_id: String,
    totals: &InvoiceTotals,
    buyer: Buyer,
    settings: &OrderSettings,
    invoice_date: NaiveDate,
) -> OrderResult<(Invoice, Vec<InvoiceItem>)> {
    let seq = SequenceRepository::next(&mut *conn).await?;
    let invoice_number = settings.invoice_number(invoice_date.year(), seq);

    let invoice = Invoice {
        id: invoice_id,
        invoice_number,
        booking_id: buyer.booking_id,
        customer_id: buyer.customer_id,
        buyer_name: buyer.name,
        buyer_email: buyer.email,
        buyer_address: buyer.address,
        subtotal_cents: totals.subtotal.cents(),
        vat_amount_cents: totals.vat_amount.cents(),
        total_amount_cents: totals.total_amount.cents(),
        vat_summary: totals.vat_summary.clone(),
        invoice_date,
        due_date: settings.due_date(invoice_date),
        status: InvoiceStatus::Unpaid,
        pdf_generated: false,
        sent_at: None,
        paid_at: None,
        created_at: Utc::now(),
    };

    let items: Vec<InvoiceItem> = totals
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            line_number: idx as i64 + 1,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price_cents: line.net_unit_price().cents(),
            total_cents: line.net_total().cents(),
            vat_rate_bps: line.vat_rate.bps(),
        })
        .collect();

    InvoiceRepository::insert(&mut *conn, &invoice, &items).await?;

    debug!(
        invoice_number = %invoice.invoice_number,
        subtotal = invoice.subtotal_cents,
        vat = invoice.vat_amount_cents,
        "Invoice written"
    );

    Ok((invoice, items))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
