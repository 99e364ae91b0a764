//! # Money Module
//!
//! Provides the `Money` type for handling taka amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A refund of ৳0.10 + ৳0.20 in floating point is 0.30000000000000004    │
//! │  and "refund amount ≤ sale total" comparisons start to lie.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paisa                                            │
//! │    ৳1,250.50 is stored as 125050 paisa                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use borka_core::money::Money;
//!
//! let abaya = Money::from_taka(2450);      // ৳2450.00
//! let pair = abaya * 2;                     // ৳4900.00
//! let total = pair + Money::from_paisa(50); // ৳4900.50
//! assert_eq!(total.paisa(), 490_050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Paisa per taka.
pub const PAISA_PER_TAKA: i64 = 100;

/// Basis points in 100%.
const FULL_BPS: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paisa (1/100 taka).
///
/// Signed so that reversals (refund credits, point clawbacks expressed in
/// money) can be represented without a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paisa.
    ///
    /// ## Example
    /// ```rust
    /// use borka_core::money::Money;
    ///
    /// let price = Money::from_paisa(245_050);
    /// assert_eq!(price.taka(), 2450);
    /// ```
    #[inline]
    pub const fn from_paisa(paisa: i64) -> Self {
        Money(paisa)
    }

    /// Creates a Money value from whole taka.
    #[inline]
    pub const fn from_taka(taka: i64) -> Self {
        Money(taka * PAISA_PER_TAKA)
    }

    /// Returns the value in paisa.
    #[inline]
    pub const fn paisa(&self) -> i64 {
        self.0
    }

    /// Returns the whole-taka portion (truncated toward zero).
    #[inline]
    pub const fn taka(&self) -> i64 {
        self.0 / PAISA_PER_TAKA
    }

    /// Returns the paisa portion (always 0-99).
    #[inline]
    pub const fn paisa_part(&self) -> i64 {
        (self.0 % PAISA_PER_TAKA).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use borka_core::money::Money;
    ///
    /// let unit_price = Money::from_taka(1800);
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_taka(5400));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `multiply_quantity` that returns `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(paisa) => Some(Money(paisa)),
            None => None,
        }
    }

    /// Addition that returns `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paisa) => Some(Money(paisa)),
            None => None,
        }
    }

    /// Returns `bps` basis points of this amount (1000 = 10%).
    ///
    /// Rounds half away from zero, computed in i128 to avoid overflow.
    ///
    /// ## Example
    /// ```rust
    /// use borka_core::money::Money;
    ///
    /// // 5% VAT on ৳10.10 = 50.5 paisa → 51 paisa
    /// assert_eq!(Money::from_paisa(1010).percentage(500).paisa(), 51);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let raw = self.0 as i128 * bps as i128;
        let rounded = (raw.abs() + FULL_BPS / 2) / FULL_BPS;
        let signed = if raw < 0 { -rounded } else { rounded };
        Money(signed as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use borka_core::money::Money;
    ///
    /// let subtotal = Money::from_taka(3000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000), Money::from_taka(2700));
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.percentage(discount_bps)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `৳1234.50` (debugging and audit notes; the UI localizes).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}৳{}.{:02}", sign, self.taka().abs(), self.paisa_part())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_taka_and_parts() {
        let money = Money::from_paisa(245_075);
        assert_eq!(money.taka(), 2450);
        assert_eq!(money.paisa_part(), 75);
        assert_eq!(Money::from_taka(12).paisa(), 1200);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paisa(245_050).to_string(), "৳2450.50");
        assert_eq!(Money::from_paisa(-550).to_string(), "-৳5.50");
        assert_eq!(Money::zero().to_string(), "৳0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_taka(10);
        let b = Money::from_taka(5);
        assert_eq!((a + b).paisa(), 1500);
        assert_eq!((a - b).paisa(), 500);
        assert_eq!((a * 3).paisa(), 3000);

        let total: Money = vec![a, b, Money::from_paisa(1)].into_iter().sum();
        assert_eq!(total.paisa(), 1501);
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_taka(2450);
        assert_eq!(price.checked_multiply_quantity(3), Some(Money::from_taka(7350)));
        assert_eq!(Money::from_paisa(i64::MAX / 2 + 1).checked_multiply_quantity(2), None);
        assert_eq!(Money::from_paisa(i64::MAX).checked_add(Money::from_paisa(1)), None);
        assert_eq!(price.checked_add(price), Some(Money::from_taka(4900)));
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        assert_eq!(Money::from_paisa(1010).percentage(500).paisa(), 51);
        assert_eq!(Money::from_paisa(-1010).percentage(500).paisa(), -51);
        assert_eq!(Money::from_taka(100).percentage(10_000), Money::from_taka(100));
        assert_eq!(Money::from_taka(100).percentage(0), Money::zero());
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_taka(3000);
        assert_eq!(subtotal.apply_percentage_discount(1000), Money::from_taka(2700));
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_paisa(1).is_positive());
        assert!(Money::from_paisa(-1).is_negative());
        assert_eq!(Money::from_paisa(-7).abs().paisa(), 7);
        assert_eq!(Money::from_paisa(3).min(Money::from_paisa(2)).paisa(), 2);
    }
}
