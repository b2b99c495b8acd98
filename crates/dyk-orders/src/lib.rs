//! # dyk-orders: Order Orchestration and Invoice Delivery
//!
//! Runs a checkout as one database transaction and handles the invoice it
//! produces afterwards.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP layer (not in this workspace)                                     │
//! │       │ OrderRequest                      ▲ OrderConfirmation / error  │
//! │       ▼                                   │                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 dyk-orders (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │  SettingsResolver ──► OrderSettings snapshot                   │   │
//! │  │  OrderService::process_order  (one transaction)                │   │
//! │  │  InvoiceService: render / deliver / mark_paid                  │   │
//! │  │  render::{layout, pdf}   mailer::{SmtpMailer, MockMailer}       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  dyk-core (money, VAT, cart)         dyk-db (SQLite repositories)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dyk_db::{Database, DbConfig};
//! use dyk_orders::{OrderService, ServiceConfig, SettingsResolver, SmtpMailer};
//!
//! let config = ServiceConfig::from_env()?;
//! let db = Database::new(DbConfig::new(&config.db_path)).await?;
//! let mailer = Arc::new(SmtpMailer::new(config.smtp.clone())?);
//!
//! let settings = SettingsResolver::new(db.settings()).load_order_settings().await?;
//! let orders = OrderService::from_config(db, mailer, &config);
//! let confirmation = orders.process_order(request, &settings).await?;
//! ```

pub mod config;
pub mod error;
pub mod invoice_service;
pub mod mailer;
pub mod orchestrator;
pub mod password;
pub mod render;
pub mod settings;

pub use config::{ConfigError, ServiceConfig, SmtpConfig};
pub use error::{ErrorCode, OrderError, OrderResult};
pub use invoice_service::InvoiceService;
pub use mailer::{Attachment, Delivery, Email, MailError, Mailer, MockMailer, SmtpMailer};
pub use orchestrator::{OrderConfirmation, OrderRequest, OrderService};
pub use render::{InvoiceLayout, LopdfEngine, PdfEngine, RenderError};
pub use settings::SettingsResolver;
