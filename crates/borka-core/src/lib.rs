//! # borka-core: Pure Business Logic for Borka POS
//!
//! Refund rules, money math, coupons, loyalty and reporting for an abaya
//! and modest-wear store, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Borka POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Back-office UI (browser)                       │   │
//! │  │   Refund list ──► Refund dialog ──► Approvals ──► Policy form   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    backoffice-api (axum)                        │   │
//! │  │   /refunds, /sales, /branches/{id}/refund-policy, ...           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ borka-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  refund  │ │  money   │ │ discount │ │  stats   │          │   │
//! │  │   │  rules   │ │  Money   │ │ loyalty  │ │ reports  │          │   │
//! │  │   │  states  │ │ pricing  │ │          │ │          │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    borka-db (Database Layer)                    │   │
//! │  │         SQLite repositories, transactional undo-sale            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Store records (Product, Sale, Customer, StockMovement, ...)
//! - [`refund`] - Refund records, policy, approval state machine
//! - [`money`] - Money in integer paisa
//! - [`pricing`] - Sale totals
//! - [`discount`] - Coupons
//! - [`loyalty`] - Points earning
//! - [`stats`] - Refund reporting
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use borka_core::money::Money;
//! use borka_core::refund::reversed_balance;
//!
//! let price = Money::from_taka(2450);
//! assert_eq!((price * 2).to_string(), "৳4900.00");
//!
//! // A reversal never leaves a negative balance
//! assert_eq!(reversed_balance(30, 49), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod refund;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use discount::{Discount, DiscountKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::LoyaltyProgram;
pub use money::Money;
pub use pricing::SaleTotals;
pub use refund::{
    ApprovalStatus, AuditAction, AuditEntry, PolicyUpdate, Refund, RefundDetails, RefundItem,
    RefundPolicy, RefundRequest, RefundStatus,
};
pub use stats::{RefundStatistics, StatisticsFilter};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Catches typos (1000 instead of 10) at the till and on refund forms.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum lines in one sale or refund request.
pub const MAX_LINES_PER_REQUEST: usize = 100;

/// Largest single amount accepted from a client (৳100 crore).
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_LINES_PER_REQUEST` well inside i64.
pub const MAX_AMOUNT_PAISA: i64 = 100_000_000_000;

/// Default page size for refund listings.
pub const DEFAULT_LIST_LIMIT: i64 = 100;
