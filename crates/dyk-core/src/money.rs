//! # Money
//!
//! Amounts in whole öre. Every total, VAT share and bucket in an invoice is
//! an `i64` count of öre; nothing is ever held as a float.
//!
//! ```text
//! 450000 öre at 6 %  ──net_of_vat──►  424528 net
//!                    ──subtract────►   25472 vat   (net + vat == gross)
//! ```
//!
//! ```rust
//! use dyk_core::money::Money;
//!
//! let course = Money::from_cents(450_000); // 4 500,00 kr
//! let total = course * 2 + Money::from_cents(10_000);
//! assert_eq!(total.cents(), 910_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::VatRate;

/// Signed amount in öre. Negative values are credits and corrections.
///
/// Serializes as the bare integer: `{"net": 424528}` is 4 245,28 kr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Kronor plus öre. A negative amount carries its sign on `major`.
    ///
    /// ```rust
    /// use dyk_core::money::Money;
    ///
    /// let price = Money::from_major_minor(4245, 28);
    /// assert_eq!(price.cents(), 424_528);
    ///
    /// let credit = Money::from_major_minor(-5, 50);
    /// assert_eq!(credit.cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn kronor(&self) -> i64 {
        self.0 / 100
    }

    /// Always 0-99, whatever the sign.
    #[inline]
    pub const fn ore_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Extracts the VAT-exclusive part of a VAT-inclusive amount.
    ///
    /// `net = gross / (1 + rate)`, rounded half away from zero to whole öre.
    ///
    /// ```text
    /// net = gross × 10000 / (10000 + bps)
    ///
    /// half-up:  (2 × gross × 10000 + denom) / (2 × denom)
    /// ```
    ///
    /// ```rust
    /// use dyk_core::money::Money;
    /// use dyk_core::types::VatRate;
    ///
    /// let gross = Money::from_cents(450_000);          // 4 500,00 kr
    /// let net = gross.net_of_vat(VatRate::from_bps(600)); // 6 %
    /// assert_eq!(net.cents(), 424_528);                // 4 245,28 kr
    /// ```
    pub fn net_of_vat(&self, rate: VatRate) -> Money {
        // i128 so that gross × 20000 cannot overflow
        let denom = 10_000_i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000 * 2;
        let net = if scaled >= 0 {
            (scaled + denom) / (2 * denom)
        } else {
            (scaled - denom) / (2 * denom)
        };
        Money::from_cents(net as i64)
    }

    /// Unit price times quantity, `None` on `i64` overflow.
    ///
    /// ```rust
    /// use dyk_core::money::Money;
    ///
    /// let rental = Money::from_cents(15_000);
    /// assert_eq!(rental.multiply_quantity(3), Some(Money::from_cents(45_000)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums amounts, `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Divides evenly by a quantity, rounding half away from zero.
    ///
    /// Used for display-only unit prices (a booking total split over its
    /// participants). Never multiply the result back up to get a total.
    ///
    /// Returns zero for a non-positive quantity.
    pub fn split_even(&self, qty: i64) -> Money {
        if qty <= 0 {
            return Money::zero();
        }
        let doubled = self.0 as i128 * 2;
        let q = qty as i128;
        let per = if doubled >= 0 {
            (doubled + q) / (2 * q)
        } else {
            (doubled - q) / (2 * q)
        };
        Money::from_cents(per as i64)
    }

    /// Formats as a decimal number with two places, e.g. `4245.28`.
    ///
    /// This is the representation used in documents and e-mails; the
    /// `Display` impl adds the currency suffix.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.kronor().abs(), self.ore_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with a `kr` suffix, e.g. `4245.28 kr`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kr", self.to_decimal_string())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
