//! # dyk-db: Database Layer for Dykskolan
//!
//! SQLite storage for the order and invoicing engine, through sqlx.
//!
//! ```text
//! OrderService ──► Database::begin() ──► tx
//!                                        ├─ BookingRepository::insert
//!                                        ├─ EquipmentRepository::take_stock
//!                                        ├─ SequenceRepository::next
//!                                        └─ InvoiceRepository::insert
//!                                        commit ──► file at DYK_DB_PATH
//! ```
//!
//! Repositories expose two kinds of function: `&self` methods that run on
//! their own pooled connection, and associated functions taking
//! `&mut SqliteConnection` that join the caller's transaction.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dyk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("dyk.db")).await?;
//! let invoice = db.invoices().get_by_number("DYK-2026-0001").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::booking::BookingRepository;
pub use repository::course::CourseRepository;
pub use repository::customer::CustomerRepository;
pub use repository::equipment::{EquipmentRepository, StockChange};
pub use repository::invoice::InvoiceRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::settings::SettingsRepository;
