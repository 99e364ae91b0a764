//! # Discounts
//!
//! Coupon codes applied at the till.
//!
//! ```text
//! subtotal ──► active? ──► in date window? ──► usage left? ──► ≥ min purchase?
//!                                                                   │
//!              percentage: subtotal × value bps ◄───────────────────┤
//!              fixed:      value paisa          ◄───────────────────┘
//!                                   │
//!                                   ▼
//!                      capped by max_discount and by the subtotal
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountKind {
    /// `value` is in basis points (1000 = 10%).
    Percentage,
    /// `value` is in paisa.
    FixedAmount,
}

/// A coupon.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Discount {
    pub id: String,
    pub code: String,
    pub name: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_purchase_paisa: Option<i64>,
    pub max_discount_paisa: Option<i64>,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub is_active: bool,
}

impl Discount {
    fn not_applicable(&self, reason: impl Into<String>) -> CoreError {
        CoreError::DiscountNotApplicable {
            code: self.code.clone(),
            reason: reason.into(),
        }
    }

    /// Discount granted on `subtotal` at `now`.
    pub fn amount_for(&self, subtotal: Money, now: DateTime<Utc>) -> CoreResult<Money> {
        if !self.is_active {
            return Err(self.not_applicable("inactive"));
        }

        if now < self.starts_at || now > self.ends_at {
            return Err(self.not_applicable("outside its valid dates"));
        }

        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return Err(self.not_applicable("usage limit reached"));
            }
        }

        if let Some(min) = self.min_purchase_paisa.map(Money::from_paisa) {
            if subtotal < min {
                return Err(self.not_applicable(format!("minimum purchase is {}", min)));
            }
        }

        let raw = match self.kind {
            DiscountKind::Percentage => subtotal.percentage(self.value.clamp(0, 10_000) as u32),
            DiscountKind::FixedAmount => Money::from_paisa(self.value.max(0)),
        };

        let capped = match self.max_discount_paisa {
            Some(max) => raw.min(Money::from_paisa(max)),
            None => raw,
        };

        Ok(capped.min(subtotal))
    }
}
