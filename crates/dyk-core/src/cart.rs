//! # Cart Lines
//!
//! The checkout cart and the normalizer that turns each line into a uniform
//! invoice row.
//!
//! ## Line Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartLine (tagged by "kind")                                            │
//! │                                                                         │
//! │   course            ──► "Kurs: {course.name}"   qty = participants      │
//! │                         rate = course rate, else 6 %                    │
//! │                                                                         │
//! │   equipment_rental  ──► "Hyra: {name}"          qty = quantity          │
//! │   equipment_sale    ──► "Köp: {name}"           rate = equipment rate   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every line carries a gross price. Pricing decomposes the *line total*, so
//! item nets add up to the invoice subtotal without any leftover öre. The
//! unit price shown on the invoice is derived from the net total afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Course, InventoryTransactionType, VatRate};
use crate::vat::{decompose, TaxedLine, VatBreakdown, VatSummary};

// =============================================================================
// Cart Input
// =============================================================================

/// One line of a checkout cart.
///
/// ```json
/// { "kind": "course", "course_id": "…", "date": "2026-06-01", "time": "09:00",
///   "participants": 2, "unit_price": 900000 }
/// { "kind": "equipment_rental", "equipment_id": "…", "name": "Torrdräkt",
///   "unit_price": 10000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartLine {
    Course(CourseLine),
    EquipmentRental(EquipmentLine),
    EquipmentSale(EquipmentLine),
}

/// A booking of one course occasion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseLine {
    pub course_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub participants: i64,
    #[serde(default)]
    pub schedule_id: Option<String>,
    /// Gross price of the whole booking (all participants).
    pub unit_price: Money,
}

/// A rented or purchased equipment article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentLine {
    pub equipment_id: String,
    /// Display name of the article.
    pub name: String,
    /// Gross price per unit.
    pub unit_price: Money,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl EquipmentLine {
    pub fn gross_total(&self) -> CoreResult<Money> {
        self.unit_price
            .multiply_quantity(self.quantity)
            .ok_or_else(|| CoreError::AmountOverflow(format!("{} × {}", self.name, self.quantity)))
    }
}

impl CartLine {
    /// Gross amount the customer pays for this line.
    pub fn gross_total(&self) -> CoreResult<Money> {
        match self {
            CartLine::Course(c) => Ok(c.unit_price),
            CartLine::EquipmentRental(e) | CartLine::EquipmentSale(e) => e.gross_total(),
        }
    }

    /// The gross price as submitted by the client.
    pub fn unit_price(&self) -> Money {
        match self {
            CartLine::Course(c) => c.unit_price,
            CartLine::EquipmentRental(e) | CartLine::EquipmentSale(e) => e.unit_price,
        }
    }

    pub fn as_course(&self) -> Option<&CourseLine> {
        match self {
            CartLine::Course(c) => Some(c),
            _ => None,
        }
    }

    /// Equipment line plus the inventory movement it causes.
    pub fn as_equipment(&self) -> Option<(&EquipmentLine, InventoryTransactionType)> {
        match self {
            CartLine::EquipmentRental(e) => Some((e, InventoryTransactionType::Rental)),
            CartLine::EquipmentSale(e) => Some((e, InventoryTransactionType::Sale)),
            CartLine::Course(_) => None,
        }
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// A cart line reduced to what the invoice needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub description: String,
    pub quantity: i64,
    pub gross_total: Money,
    pub vat_rate: VatRate,
}

impl NormalizedLine {
    /// Gross price per unit, split evenly. Display only.
    pub fn gross_unit_price(&self) -> Money {
        self.gross_total.split_even(self.quantity)
    }
}

/// Normalizes one cart line.
///
/// `course` must be the catalogue entry for a course line's `course_id`;
/// `None` means the course does not exist and fails the line. It is ignored
/// for equipment lines, which are taxed at `equipment_rate`.
///
/// ## Example
/// ```rust
/// use dyk_core::cart::{normalize, CartLine, EquipmentLine};
/// use dyk_core::money::Money;
/// use dyk_core::types::VatRate;
///
/// let line = CartLine::EquipmentRental(EquipmentLine {
///     equipment_id: "eq-1".into(),
///     name: "Torrdräkt".into(),
///     unit_price: Money::from_cents(10_000),
///     quantity: 1,
/// });
/// let normalized = normalize(&line, None, VatRate::STANDARD).unwrap();
/// assert_eq!(normalized.description, "Hyra: Torrdräkt");
/// ```
pub fn normalize(
    line: &CartLine,
    course: Option<&Course>,
    equipment_rate: VatRate,
) -> CoreResult<NormalizedLine> {
    match line {
        CartLine::Course(c) => {
            let course = course.ok_or_else(|| CoreError::CourseNotFound(c.course_id.clone()))?;
            Ok(NormalizedLine {
                description: format!("Kurs: {}", course.name),
                quantity: c.participants,
                gross_total: c.unit_price,
                vat_rate: course.vat_rate(),
            })
        }
        CartLine::EquipmentRental(e) => equipment_line(e, "Hyra:", equipment_rate),
        CartLine::EquipmentSale(e) => equipment_line(e, "Köp:", equipment_rate),
    }
}

fn equipment_line(line: &EquipmentLine, prefix: &str, rate: VatRate) -> CoreResult<NormalizedLine> {
    let name = line.name.trim();
    // names coming from older carts may already carry the prefix
    let description = if name.starts_with(prefix) {
        name.to_string()
    } else {
        format!("{} {}", prefix, name)
    };

    Ok(NormalizedLine {
        description,
        quantity: line.quantity,
        gross_total: line.gross_total()?,
        vat_rate: rate,
    })
}

// =============================================================================
// Pricing
// =============================================================================

/// One invoice row with its VAT split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub description: String,
    pub quantity: i64,
    pub vat_rate: VatRate,
    pub gross_total: Money,
    pub breakdown: VatBreakdown,
}

impl PricedLine {
    /// Net line total.
    #[inline]
    pub fn net_total(&self) -> Money {
        self.breakdown.net
    }

    /// Net unit price, rounded. Display only.
    pub fn net_unit_price(&self) -> Money {
        self.breakdown.net.split_even(self.quantity)
    }
}

/// Totals of a priced cart.
///
/// ## Invariants
/// - `total_amount == subtotal + vat_amount`
/// - `subtotal == Σ lines.net_total() == vat_summary.total_net()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
    pub vat_summary: VatSummary,
}

/// Decomposes every line and aggregates the invoice totals.
///
/// Fails with [`CoreError::AmountOverflow`] when the gross sum does not fit
/// in an `i64`; the net, VAT and per-rate sums are bounded by it.
pub fn price_lines(lines: &[NormalizedLine]) -> CoreResult<InvoiceTotals> {
    if lines.iter().any(|l| l.gross_total.is_negative()) {
        return Err(CoreError::Validation(ValidationError::MustNotBeNegative {
            field: "gross_total".to_string(),
        }));
    }
    let gross = Money::checked_sum(lines.iter().map(|l| l.gross_total))
        .ok_or_else(|| CoreError::AmountOverflow("invoice total".to_string()))?;

    let priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| PricedLine {
            description: line.description.clone(),
            quantity: line.quantity,
            vat_rate: line.vat_rate,
            gross_total: line.gross_total,
            breakdown: decompose(line.gross_total, line.vat_rate),
        })
        .collect();

    let taxed: Vec<TaxedLine> = priced
        .iter()
        .map(|p| TaxedLine {
            rate: p.vat_rate,
            breakdown: p.breakdown,
        })
        .collect();

    let subtotal: Money = priced.iter().map(|p| p.breakdown.net).sum();
    let vat_amount: Money = priced.iter().map(|p| p.breakdown.vat).sum();

    debug_assert_eq!(subtotal + vat_amount, gross);

    Ok(InvoiceTotals {
        lines: priced,
        subtotal,
        vat_amount,
        total_amount: gross,
        vat_summary: VatSummary::from_lines(&taxed),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn course(vat_rate_bps: Option<u32>) -> Course {
        let now = Utc::now();
        Course {
            id: "course-ow".to_string(),
            name: "Open Water Diver".to_string(),
            description: None,
            price_cents: 450_000,
            vat_rate_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn course_line(price: i64, participants: i64) -> CartLine {
        CartLine::Course(CourseLine {
            course_id: "course-ow".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            time: "09:00".to_string(),
            participants,
            schedule_id: None,
            unit_price: Money::from_cents(price),
        })
    }

    fn rental(price: i64) -> CartLine {
        CartLine::EquipmentRental(EquipmentLine {
            equipment_id: "eq-drysuit".to_string(),
            name: "Torrdräkt".to_string(),
            unit_price: Money::from_cents(price),
            quantity: 1,
        })
    }

    #[test]
    fn test_deserialize_tagged_lines() {
        let json = r#"[
            {"kind": "course", "course_id": "c1", "date": "2026-06-01", "time": "09:00",
             "participants": 2, "unit_price": 900000},
            {"kind": "equipment_sale", "equipment_id": "e1", "name": "Mask", "unit_price": 49900}
        ]"#;
        let lines: Vec<CartLine> = serde_json::from_str(json).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_course().map(|c| c.participants), Some(2));
        let (sale, kind) = lines[1].as_equipment().unwrap();
        assert_eq!(kind, InventoryTransactionType::Sale);
        assert_eq!(sale.quantity, 1);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"kind": "gift_card", "unit_price": 100}"#;
        assert!(serde_json::from_str::<CartLine>(json).is_err());
    }

    #[test]
    fn test_normalize_course() {
        let c = course(Some(600));
        let line = normalize(&course_line(900_000, 2), Some(&c), VatRate::STANDARD).unwrap();

        assert_eq!(line.description, "Kurs: Open Water Diver");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.gross_total.cents(), 900_000);
        assert_eq!(line.gross_unit_price().cents(), 450_000);
        assert_eq!(line.vat_rate.bps(), 600);
    }

    #[test]
    fn test_normalize_course_without_rate_uses_reduced_rate() {
        let c = course(None);
        let line = normalize(&course_line(450_000, 1), Some(&c), VatRate::STANDARD).unwrap();
        assert_eq!(line.vat_rate, VatRate::REDUCED_EDUCATION);
    }

    #[test]
    fn test_normalize_missing_course_fails() {
        let err = normalize(&course_line(450_000, 1), None, VatRate::STANDARD).unwrap_err();
        assert!(matches!(err, CoreError::CourseNotFound(id) if id == "course-ow"));
    }

    #[test]
    fn test_normalize_equipment() {
        let line = normalize(&rental(10_000), None, VatRate::STANDARD).unwrap();
        assert_eq!(line.description, "Hyra: Torrdräkt");
        assert_eq!(line.vat_rate, VatRate::STANDARD);

        let sale = CartLine::EquipmentSale(EquipmentLine {
            equipment_id: "eq-mask".to_string(),
            name: "Köp: Mask".to_string(),
            unit_price: Money::from_cents(49_900),
            quantity: 3,
        });
        let line = normalize(&sale, None, VatRate::STANDARD).unwrap();
        assert_eq!(line.description, "Köp: Mask");
        assert_eq!(line.quantity, 3);
        assert_eq!(line.gross_total.cents(), 149_700);
    }

    #[test]
    fn test_price_course_and_rental() {
        let c = course(Some(600));
        let lines = vec![
            normalize(&course_line(450_000, 1), Some(&c), VatRate::STANDARD).unwrap(),
            normalize(&rental(10_000), None, VatRate::STANDARD).unwrap(),
        ];
        let totals = price_lines(&lines).unwrap();

        assert_eq!(totals.subtotal.cents(), 424_528 + 8_000);
        assert_eq!(totals.vat_amount.cents(), 25_472 + 2_000);
        assert_eq!(totals.total_amount.cents(), 460_000);
        assert_eq!(totals.vat_summary.len(), 2);
        assert_eq!(totals.vat_summary.total_net(), totals.subtotal);
        assert_eq!(totals.lines[1].net_unit_price().cents(), 8_000);
    }

    #[test]
    fn test_item_totals_reconcile_when_unit_price_does_not() {
        // 3 participants at 100.00 kr total, 6 %: net 94.34, unit 31.45 (×3 = 94.35)
        let c = course(Some(600));
        let lines = vec![normalize(&course_line(10_000, 3), Some(&c), VatRate::STANDARD).unwrap()];
        let totals = price_lines(&lines).unwrap();

        assert_eq!(totals.subtotal.cents(), 9_434);
        assert_eq!(totals.lines[0].net_total(), totals.subtotal);
        assert_eq!(totals.lines[0].net_unit_price().cents(), 3_145);
        assert_eq!(totals.total_amount.cents(), 10_000);
    }

    #[test]
    fn test_line_total_overflow_is_an_error() {
        let sale = CartLine::EquipmentSale(EquipmentLine {
            equipment_id: "eq-computer".to_string(),
            name: "Dykdator".to_string(),
            unit_price: Money::from_cents(i64::MAX / 2),
            quantity: 3,
        });

        assert!(matches!(sale.gross_total(), Err(CoreError::AmountOverflow(_))));
        assert!(matches!(
            normalize(&sale, None, VatRate::STANDARD),
            Err(CoreError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_invoice_sum_overflow_is_an_error() {
        let big = NormalizedLine {
            description: "Köp: Kompressor".to_string(),
            quantity: 1,
            gross_total: Money::from_cents(i64::MAX / 2 + 1),
            vat_rate: VatRate::STANDARD,
        };

        assert!(matches!(
            price_lines(&[big.clone(), big]),
            Err(CoreError::AmountOverflow(_))
        ));
    }
}
