//! # Repository Module
//!
//! Database repository implementations for the dive-school shop.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Transactions                        │
//! │                                                                         │
//! │  Standalone reads/writes use the repository's own pool:                │
//! │       db.invoices().get_by_number("DYK-2026-0001")                     │
//! │                                                                         │
//! │  Writes that belong to an order take the caller's connection, so the   │
//! │  caller decides where the transaction begins and ends:                 │
//! │       BookingRepository::insert(&mut tx, &booking)                     │
//! │       EquipmentRepository::take_stock(&mut tx, id, qty, kind, ref)     │
//! │       SequenceRepository::next(&mut tx)                                │
//! │       InvoiceRepository::insert(&mut tx, &invoice, &items)             │
//! │                                                                         │
//! │  `&mut Transaction<Sqlite>` derefs to `&mut SqliteConnection`.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`course::CourseRepository`] - Course catalogue
//! - [`equipment::EquipmentRepository`] - Stock levels and inventory audit
//! - [`customer::CustomerRepository`] - Customer accounts
//! - [`booking::BookingRepository`] - Course bookings
//! - [`invoice::InvoiceRepository`] - Invoices and invoice items
//! - [`sequence::SequenceRepository`] - Invoice number counter
//! - [`settings::SettingsRepository`] - Key/value settings rows

pub mod booking;
pub mod course;
pub mod customer;
pub mod equipment;
pub mod invoice;
pub mod sequence;
pub mod settings;
