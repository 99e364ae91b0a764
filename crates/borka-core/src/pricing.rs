//! Sale totals: lines, coupon, tax.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Totals of a sale being recorded.
///
/// ```text
/// subtotal = Σ unit price × quantity
/// taxable  = subtotal - discount
/// tax      = taxable × tax rate (bps, half away from zero)
/// total    = taxable + tax
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// `discount` is clamped to the subtotal.
    pub fn compute<I>(line_totals: I, discount: Money, tax_rate_bps: u32) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal: Money = line_totals.into_iter().sum();
        let discount = discount.max(Money::zero()).min(subtotal);
        let taxable = subtotal - discount;
        let tax = taxable.percentage(tax_rate_bps);

        SaleTotals {
            subtotal,
            discount,
            tax,
            total: taxable + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_without_tax() {
        let totals = SaleTotals::compute(
            [Money::from_taka(2450) * 2, Money::from_taka(350)],
            Money::zero(),
            0,
        );
        assert_eq!(totals.subtotal, Money::from_taka(5250));
        assert_eq!(totals.total, Money::from_taka(5250));
        assert!(totals.tax.is_zero());
    }

    #[test]
    fn test_tax_applies_after_discount() {
        let totals = SaleTotals::compute([Money::from_taka(1000)], Money::from_taka(100), 500);
        assert_eq!(totals.tax, Money::from_taka(45));
        assert_eq!(totals.total, Money::from_taka(945));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let totals = SaleTotals::compute([Money::from_taka(100)], Money::from_taka(500), 0);
        assert_eq!(totals.discount, Money::from_taka(100));
        assert!(totals.total.is_zero());
    }
}
