//! # VAT Decomposition
//!
//! Splits VAT-inclusive (gross) amounts into their net and VAT parts and
//! aggregates many lines into a per-rate summary.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decompose(gross, rate)                                                 │
//! │                                                                         │
//! │    net = round_half_up(gross / (1 + rate))                              │
//! │    vat = gross - net          ◄── absorbs the rounding remainder        │
//! │                                                                         │
//! │  ⇒ net + vat == gross for every line, exactly                          │
//! │  ⇒ Σ net + Σ vat == Σ gross for every invoice, exactly                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The summary is keyed by [`VatRate::summary_key`] (`"0.25"`, `"0.06"`), the
//! same string form that is persisted in the `vat_summary` JSON column.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::VatRate;

// =============================================================================
// Decomposition
// =============================================================================

/// Net and VAT portions of one gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub net: Money,
    pub vat: Money,
}

impl VatBreakdown {
    /// The gross amount this breakdown was derived from.
    #[inline]
    pub fn gross(&self) -> Money {
        self.net + self.vat
    }
}

/// Decomposes a VAT-inclusive amount.
///
/// ## Example
/// ```rust
/// use dyk_core::money::Money;
/// use dyk_core::types::VatRate;
/// use dyk_core::vat::decompose;
///
/// let parts = decompose(Money::from_cents(450_000), VatRate::from_bps(600));
/// assert_eq!(parts.net.cents(), 424_528);
/// assert_eq!(parts.vat.cents(), 25_472);
/// ```
pub fn decompose(gross: Money, rate: VatRate) -> VatBreakdown {
    let net = gross.net_of_vat(rate);
    VatBreakdown {
        net,
        vat: gross - net,
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// A decomposed line, ready to be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxedLine {
    pub rate: VatRate,
    pub breakdown: VatBreakdown,
}

/// Aggregated amounts for one VAT rate.
///
/// Serialized as `{"net": 424528, "vat": 25472}` (öre).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatBucket {
    #[ts(type = "number")]
    pub net: Money,
    #[ts(type = "number")]
    pub vat: Money,
}

/// Per-rate aggregation of all lines of one invoice.
///
/// ```text
/// {
///   "0.06": { "net": 424528, "vat": 25472 },
///   "0.25": { "net":   8000, "vat":  2000 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatSummary(#[ts(type = "Record<string, VatBucket>")] BTreeMap<String, VatBucket>);

impl VatSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the summary for a set of decomposed lines.
    pub fn from_lines(lines: &[TaxedLine]) -> Self {
        let mut summary = Self::new();
        for line in lines {
            summary.add(line.rate, line.breakdown);
        }
        summary
    }

    /// Adds one breakdown to the bucket for `rate`.
    pub fn add(&mut self, rate: VatRate, breakdown: VatBreakdown) {
        let bucket = self.0.entry(rate.summary_key()).or_default();
        bucket.net += breakdown.net;
        bucket.vat += breakdown.vat;
    }

    pub fn get(&self, key: &str) -> Option<&VatBucket> {
        self.0.get(key)
    }

    /// Buckets ordered by rate key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VatBucket)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_net(&self) -> Money {
        self.0.values().map(|b| b.net).sum()
    }

    pub fn total_vat(&self) -> Money {
        self.0.values().map(|b| b.vat).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
