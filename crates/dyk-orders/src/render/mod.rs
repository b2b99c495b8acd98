//! Invoice documents: [`layout`] decides what goes where, [`pdf`] writes it.

pub mod layout;
pub mod pdf;

pub use layout::InvoiceLayout;
pub use pdf::{LopdfEngine, PdfEngine, RenderError};
