//! # dyk-core: Pure Business Logic for the Dive-School Shop
//!
//! This crate holds the money, VAT and cart rules of the order and
//! invoicing engine as pure functions with zero I/O dependencies.
//!
//! ```text
//! HTTP layer ──OrderRequest──► dyk-orders ──► dyk-core (this crate)
//!                                  │            money · vat · cart
//!                                  │            settings · types
//!                                  ▼
//!                               dyk-db (SQLite)
//! ```
//!
//! Nothing here touches the database, the network or the clock; callers pass
//! in dates and settings.
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Course, Booking, Invoice, etc.) and `VatRate`
//! - [`money`] - Öre amounts and half-up VAT extraction
//! - [`vat`] - VAT decomposition and per-rate aggregation
//! - [`cart`] - Cart lines, normalization and pricing
//! - [`settings`] - Order settings snapshot and invoice numbering
//! - [`error`] - Domain error types
//! - [`validation`] - Checkout input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dyk_core::money::Money;
//! use dyk_core::types::VatRate;
//! use dyk_core::vat::decompose;
//!
//! // 4 500,00 kr course at 6 %
//! let parts = decompose(Money::from_cents(450_000), VatRate::from_bps(600));
//! assert_eq!(parts.net.cents(), 424_528);
//! assert_eq!(parts.vat.cents(), 25_472);
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod settings;
pub mod types;
pub mod validation;
pub mod vat;

pub use cart::{CartLine, CourseLine, EquipmentLine, InvoiceTotals, NormalizedLine, PricedLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use settings::{CompanySettings, OrderSettings, RegistrationMode};
pub use types::*;
pub use vat::{VatBreakdown, VatBucket, VatSummary};

/// Maximum lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 50;

/// Maximum participants on one course booking.
pub const MAX_PARTICIPANTS: i64 = 20;

/// Maximum quantity of one equipment line.
pub const MAX_ITEM_QUANTITY: i64 = 99;

/// Maximum gross unit price, in öre (10 000 000 kr). With the line and
/// quantity caps above, every invoice sum stays far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
