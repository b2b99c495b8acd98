//! # Order Settings
//!
//! Snapshot of the business settings an order depends on, plus invoice
//! numbering and due-date rules.
//!
//! The snapshot is resolved once per request and passed into the order
//! workflow, so a test (or a caller) fully controls the settings in effect.
//!
//! ## Settings Keys
//! ```text
//! ┌──────────────────────────────┬───────────┬──────────────────────────────┐
//! │ key                          │ default   │ used for                     │
//! ├──────────────────────────────┼───────────┼──────────────────────────────┤
//! │ invoice_prefix               │ "DYK"     │ DYK-2026-0001                │
//! │ invoice_terms_days           │ "30"      │ due_date = date + terms      │
//! │ invoice_vat_rate             │ "0.25"    │ equipment lines              │
//! │ checkout_registration_mode   │ optional  │ account creation at checkout │
//! └──────────────────────────────┴───────────┴──────────────────────────────┘
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::VatRate;

// =============================================================================
// Keys & Defaults
// =============================================================================

pub const KEY_INVOICE_PREFIX: &str = "invoice_prefix";
pub const KEY_INVOICE_TERMS_DAYS: &str = "invoice_terms_days";
pub const KEY_INVOICE_VAT_RATE: &str = "invoice_vat_rate";
pub const KEY_REGISTRATION_MODE: &str = "checkout_registration_mode";

pub const DEFAULT_INVOICE_PREFIX: &str = "DYK";
pub const DEFAULT_TERMS_DAYS: i64 = 30;
pub const DEFAULT_VAT_RATE: &str = "0.25";
pub const DEFAULT_REGISTRATION_MODE: &str = "optional";

/// Company identity keys (category `company`).
pub const KEY_COMPANY_NAME: &str = "company_name";
pub const KEY_COMPANY_ORG_NUMBER: &str = "company_org_number";
pub const KEY_COMPANY_VAT_NUMBER: &str = "company_vat_number";
pub const KEY_COMPANY_ADDRESS: &str = "company_address";
pub const KEY_COMPANY_ZIP: &str = "company_zip";
pub const KEY_COMPANY_CITY: &str = "company_city";
pub const KEY_COMPANY_EMAIL: &str = "company_email";
pub const KEY_COMPANY_PHONE: &str = "company_phone";
pub const KEY_COMPANY_BANKGIRO: &str = "company_bankgiro";
pub const KEY_COMPANY_IBAN: &str = "company_iban";
pub const KEY_COMPANY_F_TAX: &str = "company_f_tax";

/// Built-in default for a settings key, if it has one.
pub fn default_for(key: &str) -> Option<&'static str> {
    match key {
        KEY_INVOICE_PREFIX => Some(DEFAULT_INVOICE_PREFIX),
        KEY_INVOICE_TERMS_DAYS => Some("30"),
        KEY_INVOICE_VAT_RATE => Some(DEFAULT_VAT_RATE),
        KEY_REGISTRATION_MODE => Some(DEFAULT_REGISTRATION_MODE),
        _ => None,
    }
}

// =============================================================================
// Registration Mode
// =============================================================================

/// Whether checkout creates customer accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RegistrationMode {
    /// Never create accounts.
    Disabled,
    /// Create an account when the customer asks for one.
    #[default]
    Optional,
    /// Always create (or reuse) an account.
    Mandatory,
}

impl RegistrationMode {
    /// Applies the mode to the caller's `create_account` hint.
    pub fn resolve_create_account(&self, requested: bool) -> bool {
        match self {
            RegistrationMode::Disabled => false,
            RegistrationMode::Optional => requested,
            RegistrationMode::Mandatory => true,
        }
    }
}

impl FromStr for RegistrationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(RegistrationMode::Disabled),
            "optional" => Ok(RegistrationMode::Optional),
            "mandatory" => Ok(RegistrationMode::Mandatory),
            _ => Err(ValidationError::NotAllowed {
                field: KEY_REGISTRATION_MODE.to_string(),
                allowed: vec![
                    "disabled".to_string(),
                    "optional".to_string(),
                    "mandatory".to_string(),
                ],
            }),
        }
    }
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistrationMode::Disabled => "disabled",
            RegistrationMode::Optional => "optional",
            RegistrationMode::Mandatory => "mandatory",
        })
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Settings in effect for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettings {
    pub invoice_prefix: String,
    pub terms_days: i64,
    /// Rate applied to equipment lines.
    pub default_vat_rate: VatRate,
    pub registration_mode: RegistrationMode,
    pub company: CompanySettings,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            terms_days: DEFAULT_TERMS_DAYS,
            default_vat_rate: VatRate::STANDARD,
            registration_mode: RegistrationMode::Optional,
            company: CompanySettings::default(),
        }
    }
}

impl OrderSettings {
    /// Formats the invoice number for sequence value `seq` in `year`.
    pub fn invoice_number(&self, year: i32, seq: i64) -> String {
        format_invoice_number(&self.invoice_prefix, year, seq)
    }

    /// Due date for an invoice dated `invoice_date`.
    pub fn due_date(&self, invoice_date: NaiveDate) -> NaiveDate {
        due_date(invoice_date, self.terms_days)
    }
}

/// Company identity shown on invoices and the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanySettings {
    pub name: String,
    pub org_number: Option<String>,
    pub vat_number: Option<String>,
    pub address: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bankgiro: Option<String>,
    pub iban: Option<String>,
    /// Registered for F-tax (Godkänd för F-skatt).
    pub f_tax: bool,
}

impl CompanySettings {
    /// "12345 Stad" when both parts are known.
    pub fn postal_line(&self) -> Option<String> {
        match (&self.zip, &self.city) {
            (Some(zip), Some(city)) => Some(format!("{} {}", zip, city)),
            (None, Some(city)) => Some(city.clone()),
            (Some(zip), None) => Some(zip.clone()),
            (None, None) => None,
        }
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// `{prefix}-{year}-{seq:04}`.
///
/// The sequence is global and never reset, so the number after a year
/// boundary continues from the previous year's last value. Values above
/// 9999 are printed in full.
///
/// ## Example
/// ```rust
/// use dyk_core::settings::format_invoice_number;
///
/// assert_eq!(format_invoice_number("DYK", 2026, 7), "DYK-2026-0007");
/// assert_eq!(format_invoice_number("DYK", 2026, 12345), "DYK-2026-12345");
/// ```
pub fn format_invoice_number(prefix: &str, year: i32, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, year, seq)
}

/// `invoice_date + terms_days`. Negative terms are treated as zero.
pub fn due_date(invoice_date: NaiveDate, terms_days: i64) -> NaiveDate {
    invoice_date + Duration::days(terms_days.max(0))
}

/// Parses a settings value holding the payment terms.
pub fn parse_terms_days(raw: &str) -> Result<i64, ValidationError> {
    let days: i64 = raw.trim().parse().map_err(|_| ValidationError::InvalidFormat {
        field: KEY_INVOICE_TERMS_DAYS.to_string(),
        reason: format!("'{}' is not a whole number of days", raw),
    })?;
    if !(0..=365).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: KEY_INVOICE_TERMS_DAYS.to_string(),
            min: 0,
            max: 365,
        });
    }
    Ok(days)
}

/// Interprets the truthy spellings used in settings rows.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_mode_resolution() {
        assert!(!RegistrationMode::Disabled.resolve_create_account(true));
        assert!(RegistrationMode::Optional.resolve_create_account(true));
        assert!(!RegistrationMode::Optional.resolve_create_account(false));
        assert!(RegistrationMode::Mandatory.resolve_create_account(false));
    }

    #[test]
    fn test_registration_mode_parse() {
        assert_eq!("Mandatory".parse::<RegistrationMode>().unwrap(), RegistrationMode::Mandatory);
        assert_eq!(" disabled ".parse::<RegistrationMode>().unwrap(), RegistrationMode::Disabled);
        assert!("sometimes".parse::<RegistrationMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = OrderSettings::default();
        assert_eq!(settings.invoice_prefix, "DYK");
        assert_eq!(settings.terms_days, 30);
        assert_eq!(settings.default_vat_rate.bps(), 2500);
        assert_eq!(settings.registration_mode, RegistrationMode::Optional);

        assert_eq!(default_for(KEY_INVOICE_PREFIX), Some("DYK"));
        assert_eq!(default_for(KEY_COMPANY_NAME), None);
    }

    #[test]
    fn test_invoice_number_and_due_date() {
        let settings = OrderSettings::default();
        assert_eq!(settings.invoice_number(2026, 1), "DYK-2026-0001");

        let date = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
        assert_eq!(settings.due_date(date), NaiveDate::from_ymd_opt(2027, 1, 14).unwrap());
        assert_eq!(due_date(date, -5), date);
    }

    #[test]
    fn test_parse_terms_days() {
        assert_eq!(parse_terms_days("14").unwrap(), 14);
        assert!(parse_terms_days("two weeks").is_err());
        assert!(parse_terms_days("400").is_err());
    }

    #[test]
    fn test_parse_flag_and_postal_line() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));

        let company = CompanySettings {
            zip: Some("111 22".to_string()),
            city: Some("Stockholm".to_string()),
            ..Default::default()
        };
        assert_eq!(company.postal_line().as_deref(), Some("111 22 Stockholm"));
    }
}
