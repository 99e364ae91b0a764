//! # Error Types
//!
//! Domain-specific error types for borka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  borka-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  borka-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, carries CoreError           │
//! │                                                                         │
//! │  backoffice-api errors (in app)                                        │
//! │  └── ApiError         - What the UI toast shows                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `Display` text of each variant is the message cashiers see, so it is
//! kept short and human readable ("Refund not found").

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the refund workflow, sales and
/// discounts.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Refund not found")]
    RefundNotFound(String),

    #[error("Sale not found")]
    SaleNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// Mutations need a signed-in staff member.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The branch policy has `allow_refunds = false`.
    #[error("Refunds are not allowed at this branch")]
    RefundsNotAllowed,

    /// The sale is older than the branch refund window.
    #[error("Refund window of {days} days has passed")]
    RefundWindowExpired { days: i64 },

    /// The sale was already undone.
    #[error("Sale {sale_number} is already cancelled")]
    SaleAlreadyCancelled { sale_number: String },

    /// Refund amount is more than the returned lines plus their tax.
    #[error("Refund amount {requested} exceeds the value of the returned items {items_value}")]
    RefundExceedsItems { requested: Money, items_value: Money },

    /// Refund amount is more than what is left to refund on the sale.
    #[error("Refund amount {requested} exceeds refundable amount {available}")]
    RefundExceedsSale { requested: Money, available: Money },

    /// Refund amount is above the branch's maximum refund percentage.
    #[error("Refund amount {requested} exceeds {percentage}% of the sale total")]
    RefundExceedsPolicyLimit { requested: Money, percentage: i64 },

    /// Branch only allows full refunds.
    #[error("Partial refunds are not allowed at this branch")]
    PartialRefundNotAllowed,

    #[error("Refund reason '{reason}' is not allowed at this branch")]
    ReasonNotAllowed { reason: String },

    #[error("{product_name} is not part of sale {sale_number}")]
    ItemNotInSale {
        product_name: String,
        sale_number: String,
    },

    #[error("Cannot refund {requested} of {product_name}: only {available} left to refund")]
    RefundQuantityExceeded {
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// A refund transition was attempted from the wrong state,
    /// e.g. "Cannot approve refund with status: approved".
    #[error("Cannot {action} refund with status: {status}")]
    InvalidRefundState { action: String, status: String },

    #[error("Cannot process unapproved refund")]
    RefundNotApproved,

    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Coupon cannot be used for this purchase.
    #[error("Discount {code} cannot be applied: {reason}")]
    DiscountNotApplicable { code: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds the wrong-state error for a refund transition.
    pub fn invalid_state(action: &str, status: impl ToString) -> Self {
        CoreError::InvalidRefundState {
            action: action.to_string(),
            status: status.to_string(),
        }
    }

    /// Whether this error means a record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::RefundNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::BranchNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Totals sent by the UI disagree with the line items.
    #[error("{field} does not match its items: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: Money,
        actual: Money,
    },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
