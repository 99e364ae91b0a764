//! # Domain Types
//!
//! Store records shared by every layer of Borka POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku            │   │  sale_number    │   │  loyalty_points │       │
//! │  │  current_stock  │   │  status         │   │                 │       │
//! │  │  BranchStock[]  │   │  SaleItem[]     │   │ PointsTx ledger │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │ StockMovement   │   │      User       │  (refund records live in    │
//! │  │  in / out       │   │  acting staff   │   the `refund` module)      │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Denormalized Names
//! Records copy display names (branch, customer, product, staff) at the time
//! they are written, so history reads the same after a rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Staff & Branches
// =============================================================================

/// A staff account performing actions (cashier, manager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl User {
    /// Name written into audit records: name, else email, else "Unknown".
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref().filter(|e| !e.trim().is_empty()))
            .unwrap_or("Unknown")
    }
}

/// A store branch (reference data only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product (abaya, hijab, accessory) available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    /// Price in paisa.
    pub price_paisa: i64,
    /// Store-wide stock counter.
    pub current_stock: i64,
    /// Inactive products are hidden from the till; a restock reactivates them.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paisa(self.price_paisa)
    }
}

/// Per-branch stock counter for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BranchStock {
    pub product_id: String,
    pub branch_id: String,
    pub current_stock: i64,
}

// =============================================================================
// Customer & Loyalty Ledger
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Current loyalty balance, never negative.
    pub loyalty_points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Kind of loyalty ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PointsTransactionType {
    /// Points earned on a sale.
    Purchase,
    /// Points clawed back when the sale is undone.
    Refund,
}

/// One entry in a customer's loyalty ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PointsTransaction {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub transaction_type: PointsTransactionType,
    /// Signed: negative for reversals.
    pub points: i64,
    pub description: String,
    /// Sale the points belong to.
    pub reference_id: Option<String>,
    pub branch_id: Option<String>,
    pub branch_name: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SaleStatus {
    /// Paid and handed over.
    #[default]
    Completed,
    /// Fully undone by a completed refund.
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

/// How money changed hands (also used for refund payouts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    /// bKash / Nagad / Rocket wallets.
    MobileBanking,
    StoreCredit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileBanking => "mobile_banking",
            PaymentMethod::StoreCredit => "store_credit",
        }
    }
}

/// A completed or cancelled sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub sale_number: String,
    pub branch_id: String,
    pub branch_name: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub subtotal_paisa: i64,
    pub discount_paisa: i64,
    pub tax_paisa: i64,
    pub total_paisa: i64,
    pub paid_paisa: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub discount_code: Option<String>,
    pub cashier_id: String,
    pub cashier_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paisa(self.total_paisa)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_paisa(self.discount_paisa)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_paisa(self.tax_paisa)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paisa(self.paid_paisa)
    }
}

/// A line item in a sale. Product name and price are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub size: Option<String>,
    pub quantity: i64,
    pub unit_price_paisa: i64,
    pub line_total_paisa: i64,
}

/// Input for recording a sale at the till.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub items: Vec<NewSaleItem>,
    pub payment_method: PaymentMethod,
    /// Amount tendered; defaults to the sale total.
    pub paid_paisa: Option<i64>,
    /// Coupon code to apply.
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    pub size: Option<String>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MovementType {
    In,
    Out,
}

/// An inventory ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub branch_id: String,
    pub branch_name: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    /// Sale or refund number that caused the movement.
    pub reference: String,
    pub user_id: String,
    pub user_name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: Option<&str>, email: Option<&str>) -> User {
        User {
            id: "u1".to_string(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(user(Some("Ayesha"), Some("a@x.com")).display_name(), "Ayesha");
        assert_eq!(user(None, Some("a@x.com")).display_name(), "a@x.com");
        assert_eq!(user(Some("  "), Some("a@x.com")).display_name(), "a@x.com");
        assert_eq!(user(None, None).display_name(), "Unknown");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SaleStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileBanking).unwrap(),
            "\"mobile_banking\""
        );
        assert_eq!(serde_json::to_string(&MovementType::In).unwrap(), "\"in\"");
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
        assert_eq!(SaleStatus::Cancelled.as_str(), "cancelled");
    }
}
