//! # Settings Resolver
//!
//! Read-through view of the settings table with built-in defaults, so a
//! fresh database with no settings rows still takes orders.
//!
//! ```text
//! settings table ──► SettingsResolver::load_order_settings() ──► OrderSettings
//!                                                                     │
//!                      OrderService::process_order(request, &settings)┘
//! ```
//!
//! Values that fail to parse are logged and replaced by their default.

use tracing::{debug, warn};

use dyk_core::settings::{
    default_for, parse_flag, parse_terms_days, DEFAULT_INVOICE_PREFIX, DEFAULT_TERMS_DAYS,
    KEY_COMPANY_ADDRESS, KEY_COMPANY_BANKGIRO, KEY_COMPANY_CITY, KEY_COMPANY_EMAIL,
    KEY_COMPANY_F_TAX, KEY_COMPANY_IBAN, KEY_COMPANY_NAME, KEY_COMPANY_ORG_NUMBER,
    KEY_COMPANY_PHONE, KEY_COMPANY_VAT_NUMBER, KEY_COMPANY_ZIP, KEY_INVOICE_PREFIX,
    KEY_INVOICE_TERMS_DAYS, KEY_INVOICE_VAT_RATE, KEY_REGISTRATION_MODE,
};
use dyk_core::{CompanySettings, OrderSettings, RegistrationMode, VatRate};
use dyk_db::SettingsRepository;

use crate::error::OrderResult;

const COMPANY_CATEGORY: &str = "company";

/// Resolves settings rows into typed snapshots.
#[derive(Debug, Clone)]
pub struct SettingsResolver {
    repo: SettingsRepository,
}

impl SettingsResolver {
    pub fn new(repo: SettingsRepository) -> Self {
        SettingsResolver { repo }
    }

    /// Value of `key`, falling back to its built-in default.
    ///
    /// Blank rows count as missing. Keys without a default resolve to an
    /// empty string.
    pub async fn get(&self, key: &str) -> OrderResult<String> {
        let stored = self
            .repo
            .get(key)
            .await?
            .filter(|value| !value.trim().is_empty());

        Ok(match stored {
            Some(value) => value,
            None => default_for(key).unwrap_or_default().to_string(),
        })
    }

    /// Snapshot of everything an order reads.
    pub async fn load_order_settings(&self) -> OrderResult<OrderSettings> {
        let prefix = self.get(KEY_INVOICE_PREFIX).await?;
        let invoice_prefix = if prefix.trim().is_empty() {
            DEFAULT_INVOICE_PREFIX.to_string()
        } else {
            prefix.trim().to_string()
        };

        let raw_terms = self.get(KEY_INVOICE_TERMS_DAYS).await?;
        let terms_days = parse_terms_days(&raw_terms).unwrap_or_else(|e| {
            warn!(value = %raw_terms, error = %e, "Invalid payment terms, using default");
            DEFAULT_TERMS_DAYS
        });

        let raw_rate = self.get(KEY_INVOICE_VAT_RATE).await?;
        let default_vat_rate = VatRate::parse_fraction(&raw_rate).unwrap_or_else(|e| {
            warn!(value = %raw_rate, error = %e, "Invalid VAT rate, using standard rate");
            VatRate::STANDARD
        });

        let raw_mode = self.get(KEY_REGISTRATION_MODE).await?;
        let registration_mode = raw_mode.parse::<RegistrationMode>().unwrap_or_else(|e| {
            warn!(value = %raw_mode, error = %e, "Invalid registration mode, using default");
            RegistrationMode::default()
        });

        let company = self.load_company().await?;

        debug!(
            prefix = %invoice_prefix,
            terms_days,
            vat_bps = default_vat_rate.bps(),
            mode = %registration_mode,
            "Resolved order settings"
        );

        Ok(OrderSettings {
            invoice_prefix,
            terms_days,
            default_vat_rate,
            registration_mode,
            company,
        })
    }

    /// Company identity (category `company`).
    pub async fn load_company(&self) -> OrderResult<CompanySettings> {
        let mut rows = self.repo.get_category(COMPANY_CATEGORY).await?;
        let mut take = |key: &str| {
            rows.remove(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(CompanySettings {
            name: take(KEY_COMPANY_NAME).unwrap_or_default(),
            org_number: take(KEY_COMPANY_ORG_NUMBER),
            vat_number: take(KEY_COMPANY_VAT_NUMBER),
            address: take(KEY_COMPANY_ADDRESS),
            zip: take(KEY_COMPANY_ZIP),
            city: take(KEY_COMPANY_CITY),
            email: take(KEY_COMPANY_EMAIL),
            phone: take(KEY_COMPANY_PHONE),
            bankgiro: take(KEY_COMPANY_BANKGIRO),
            iban: take(KEY_COMPANY_IBAN),
            f_tax: take(KEY_COMPANY_F_TAX).map(|v| parse_flag(&v)).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyk_db::{Database, DbConfig};

    async fn resolver() -> (Database, SettingsResolver) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let resolver = SettingsResolver::new(db.settings());
        (db, resolver)
    }

    #[tokio::test]
    async fn test_defaults_without_rows() {
        let (_db, resolver) = resolver().await;

        assert_eq!(resolver.get(KEY_INVOICE_PREFIX).await.unwrap(), "DYK");
        assert_eq!(resolver.get(KEY_INVOICE_TERMS_DAYS).await.unwrap(), "30");
        assert_eq!(resolver.get(KEY_INVOICE_VAT_RATE).await.unwrap(), "0.25");
        assert_eq!(resolver.get(KEY_REGISTRATION_MODE).await.unwrap(), "optional");
        assert_eq!(resolver.get("unknown_key").await.unwrap(), "");

        let settings = resolver.load_order_settings().await.unwrap();
        assert_eq!(settings, OrderSettings::default());
    }

    #[tokio::test]
    async fn test_stored_values_win() {
        let (db, resolver) = resolver().await;
        let repo = db.settings();
        repo.upsert(KEY_INVOICE_PREFIX, "DS", "invoicing").await.unwrap();
        repo.upsert(KEY_INVOICE_TERMS_DAYS, "10", "invoicing").await.unwrap();
        repo.upsert(KEY_INVOICE_VAT_RATE, "0.12", "invoicing").await.unwrap();
        repo.upsert(KEY_REGISTRATION_MODE, "mandatory", "checkout").await.unwrap();

        let settings = resolver.load_order_settings().await.unwrap();
        assert_eq!(settings.invoice_prefix, "DS");
        assert_eq!(settings.terms_days, 10);
        assert_eq!(settings.default_vat_rate, VatRate::from_bps(1200));
        assert_eq!(settings.registration_mode, RegistrationMode::Mandatory);
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let (db, resolver) = resolver().await;
        let repo = db.settings();
        repo.upsert(KEY_INVOICE_TERMS_DAYS, "thirty", "invoicing").await.unwrap();
        repo.upsert(KEY_INVOICE_VAT_RATE, "25%", "invoicing").await.unwrap();
        repo.upsert(KEY_REGISTRATION_MODE, "sometimes", "checkout").await.unwrap();
        repo.upsert(KEY_INVOICE_PREFIX, "   ", "invoicing").await.unwrap();

        let settings = resolver.load_order_settings().await.unwrap();
        assert_eq!(settings, OrderSettings::default());
    }

    #[tokio::test]
    async fn test_load_company() {
        let (db, resolver) = resolver().await;
        let repo = db.settings();
        repo.upsert(KEY_COMPANY_NAME, "Dykskolan AB", "company").await.unwrap();
        repo.upsert(KEY_COMPANY_BANKGIRO, "123-4567", "company").await.unwrap();
        repo.upsert(KEY_COMPANY_F_TAX, "yes", "company").await.unwrap();
        repo.upsert(KEY_COMPANY_IBAN, "", "company").await.unwrap();

        let company = resolver.load_company().await.unwrap();
        assert_eq!(company.name, "Dykskolan AB");
        assert_eq!(company.bankgiro.as_deref(), Some("123-4567"));
        assert_eq!(company.iban, None);
        assert!(company.f_tax);
    }
}
