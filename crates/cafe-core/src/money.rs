//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A 19% tax share computed in floats:                                    │
//! │    5000 × 0.19 = 950.0000000000001                                      │
//! │                                                                         │
//! │  Summed over a day of sales the drift shows up in the closing count.   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    (500000 × 1900 + 5000) / 10000 = 95000                               │
//! │    Every rounding step is explicit and happens once.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cafe_core::money::Money;
//!
//! let latte = Money::from_cents(650_000);
//! let two = latte * 2;
//! assert_eq!(two.cents(), 1_300_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units ("cents").
///
/// Signed so that differences (counted − expected at the register) can be
/// negative.
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► SaleItem.subtotal ──► Sale.total              │
/// │                                                   │                     │
/// │                     Sale.tax ◄── calculate_tax ◄──┤                     │
/// │                                                   │                     │
/// │                     Cashbox.daily_sales ◄─────────┘                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole units, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Minor-unit remainder, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Computes `self × rate`, rounded half away from zero to the minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps ± 5000) / 10000`, widened to i128 so a
    /// large daily total cannot overflow.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    /// use cafe_core::types::TaxRate;
    ///
    /// // 19% of 10.01 = 1.9019 → 1.90
    /// let tax = Money::from_cents(1001).calculate_tax(TaxRate::from_bps(1900));
    /// assert_eq!(tax.cents(), 190);
    ///
    /// // 19% of 0.50 = 0.095 → 0.10
    /// let tax = Money::from_cents(50).calculate_tax(TaxRate::from_bps(1900));
    /// assert_eq!(tax.cents(), 10);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1500);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 3000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering with a `$` sign and two decimals. Receipts use
/// the same format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
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
        iter.fold(Money::zero(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500000)), "$5000.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(2000);
        let b = Money::from_cents(1500);

        assert_eq!((a + b).cents(), 3500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b * 2).cents(), 3000);

        let total: Money = [a, b * 2].into_iter().sum();
        assert_eq!(total.cents(), 5000);
    }

    #[test]
    fn test_tax_share_of_total() {
        // 19% of 5000 is exact
        let tax = Money::from_cents(5000).calculate_tax(TaxRate::from_bps(1900));
        assert_eq!(tax.cents(), 950);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 19% of 150 = 28.5 → 29
        let tax = Money::from_cents(150).calculate_tax(TaxRate::from_bps(1900));
        assert_eq!(tax.cents(), 29);

        // 19% of 149 = 28.31 → 28
        let tax = Money::from_cents(149).calculate_tax(TaxRate::from_bps(1900));
        assert_eq!(tax.cents(), 28);
    }

    #[test]
    fn test_negative_rounding_is_symmetric() {
        let rate = TaxRate::from_bps(1900);
        let pos = Money::from_cents(150).calculate_tax(rate);
        let neg = Money::from_cents(-150).calculate_tax(rate);
        assert_eq!(neg.cents(), -pos.cents());
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_positive());
    }
}
