//! Loyalty points earned on purchases.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Earning rate of the store's loyalty program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyProgram {
    pub points_per_100_taka: i64,
}

impl Default for LoyaltyProgram {
    fn default() -> Self {
        LoyaltyProgram {
            points_per_100_taka: 1,
        }
    }
}

impl LoyaltyProgram {
    /// Points for a sale total; partial hundreds earn nothing.
    pub fn points_for_purchase(&self, total: Money) -> i64 {
        if !total.is_positive() {
            return 0;
        }
        (total.taka() / 100) * self.points_per_100_taka.max(0)
    }
}
