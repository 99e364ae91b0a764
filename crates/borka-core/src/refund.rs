//! # Refund Rules
//!
//! Records and pure rules for the refund / undo-sale workflow.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Refund Lifecycle                                 │
//! │                                                                         │
//! │  create ──► status: pending                                             │
//! │             approval: pending_approval ──(approve)──► approved          │
//! │                 │            (or approved up front by the policy)       │
//! │                 │                                        │              │
//! │                 └──(reject)──► rejected          (process)              │
//! │                                                          ▼              │
//! │                                             status: processed           │
//! │                                                          │              │
//! │                                                     (complete)          │
//! │                                                          ▼              │
//! │                                             status: completed           │
//! │                                             sale cancelled, stock in,   │
//! │                                             loyalty points reversed     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two status fields are tracked, as the store's UI expects: `status` is the
//! payout progress and `approval_status` is the manager decision.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Branch, PaymentMethod, PointsTransaction, Sale, SaleItem, SaleStatus, User};
use crate::validation::validate_refund_request;

/// Reasons accepted by a freshly created branch policy.
pub const DEFAULT_REFUND_REASONS: [&str; 4] = ["defective", "wrong_item", "customer_request", "other"];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

// =============================================================================
// Statuses
// =============================================================================

/// Payout progress of a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RefundStatus {
    Pending,
    Processed,
    Completed,
    Rejected,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Processed => "processed",
            RefundStatus::Completed => "completed",
            RefundStatus::Rejected => "rejected",
        }
    }

    /// Parses the query-string form used by the list endpoint.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RefundStatus::Pending),
            "processed" => Some(RefundStatus::Processed),
            "completed" => Some(RefundStatus::Completed),
            "rejected" => Some(RefundStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manager decision on a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ApprovalStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::PendingApproval => "pending_approval",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Refund Records
// =============================================================================

/// A returned line. Stored as part of the refund document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_paisa: i64,
    pub total_price_paisa: i64,
    pub size: Option<String>,
    pub reason: String,
    /// Physical condition on return ("unworn", "damaged", ...).
    pub condition: String,
    pub notes: Option<String>,
}

impl RefundItem {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_paisa(self.total_price_paisa)
    }
}

/// Payout details captured when the refund is processed
/// (mobile-banking transaction id, card reversal reference, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundDetails {
    pub transaction_id: Option<String>,
    pub phone_number: Option<String>,
    pub reference: Option<String>,
    pub status: Option<String>,
    pub remark: Option<String>,
}

/// A refund request against a prior sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Refund {
    pub id: String,
    pub refund_number: String,
    pub sale_id: String,
    pub sale_number: String,
    pub branch_id: String,
    pub branch_name: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<RefundItem>,
    pub subtotal_paisa: i64,
    pub tax_paisa: i64,
    pub discount_paisa: i64,
    pub refund_amount_paisa: i64,
    pub refund_method: PaymentMethod,
    pub original_payment_method: PaymentMethod,
    pub status: RefundStatus,
    pub approval_status: ApprovalStatus,
    pub refund_reason: String,
    pub refund_notes: Option<String>,
    /// Rejection reason or other staff-only notes.
    pub internal_notes: Option<String>,
    pub restock_required: bool,
    pub is_returned: bool,
    pub return_condition: Option<String>,
    pub inspection_notes: Option<String>,
    pub approved_by: Option<String>,
    pub approved_by_name: Option<String>,
    #[ts(as = "Option<String>")]
    pub approval_date: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    pub processed_by_name: Option<String>,
    #[ts(as = "Option<String>")]
    pub processed_date: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub payment_details: RefundDetails,
    #[ts(as = "String")]
    pub request_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub return_date: Option<DateTime<Utc>>,
}

impl Refund {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paisa(self.refund_amount_paisa)
    }

    /// Rejected refunds no longer hold any part of the sale.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status != RefundStatus::Rejected && self.approval_status != ApprovalStatus::Rejected
    }

    /// Only a refund awaiting a decision can be approved.
    pub fn ensure_can_approve(&self) -> CoreResult<()> {
        if self.approval_status != ApprovalStatus::PendingApproval {
            return Err(CoreError::invalid_state("approve", self.approval_status));
        }
        Ok(())
    }

    /// Completed or already rejected refunds cannot be rejected.
    pub fn ensure_can_reject(&self) -> CoreResult<()> {
        match self.status {
            RefundStatus::Completed | RefundStatus::Rejected => {
                Err(CoreError::invalid_state("reject", self.status))
            }
            _ => Ok(()),
        }
    }

    /// Payout needs an approved refund that has not been paid yet.
    pub fn ensure_can_process(&self) -> CoreResult<()> {
        if self.approval_status != ApprovalStatus::Approved {
            return Err(CoreError::RefundNotApproved);
        }
        if self.status != RefundStatus::Pending {
            return Err(CoreError::invalid_state("process", self.status));
        }
        Ok(())
    }

    /// The sale is undone only after the payout was recorded.
    pub fn ensure_can_complete(&self) -> CoreResult<()> {
        if self.status != RefundStatus::Processed {
            return Err(CoreError::invalid_state("complete", self.status));
        }
        Ok(())
    }
}

/// Input for a new refund request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundRequest {
    pub sale_id: String,
    pub items: Vec<RefundItem>,
    pub subtotal_paisa: i64,
    pub tax_paisa: i64,
    pub discount_paisa: i64,
    pub refund_amount_paisa: i64,
    pub refund_method: PaymentMethod,
    pub refund_reason: String,
    pub refund_notes: Option<String>,
    pub restock_required: bool,
}

impl RefundRequest {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paisa(self.refund_amount_paisa)
    }

    /// Returned lines plus tax; the most this request may pay out.
    #[inline]
    pub fn items_value(&self) -> Money {
        Money::from_paisa(self.subtotal_paisa) + Money::from_paisa(self.tax_paisa)
    }
}

// =============================================================================
// Audit Trail
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
    Processed,
    Completed,
    DiscountReversal,
    TaxReversal,
}

/// One step in a refund's history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditEntry {
    pub id: String,
    pub refund_id: String,
    pub refund_number: String,
    pub action: AuditAction,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub performed_by: String,
    pub performed_by_name: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Refund Policy
// =============================================================================

/// Per-branch refund rules.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundPolicy {
    pub id: String,
    pub branch_id: String,
    pub branch_name: String,
    pub allow_refunds: bool,
    pub refund_window_days: i64,
    pub require_approval: bool,
    /// Largest refund as a percentage (0-100) of the sale total.
    pub max_refund_percentage: i64,
    pub require_returned_goods: bool,
    pub allow_partial_refund: bool,
    /// Empty list accepts any reason.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub allowed_reasons: Vec<String>,
    pub require_photo_evidence: bool,
    pub require_manager_approval_above_paisa: i64,
    /// Zero disables auto-approval.
    pub auto_approve_below_paisa: i64,
    pub auto_complete_after_days: i64,
    pub auto_restock_refunded_items: bool,
    pub restock_penalty_paisa: Option<i64>,
    pub notify_manager_on_refund: bool,
    pub notify_customer_on_approval: bool,
    pub notify_customer_on_completion: bool,
    pub updated_by: String,
    pub updated_by_name: String,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl RefundPolicy {
    /// A new policy with the store defaults.
    pub fn with_defaults(id: String, branch: &Branch, actor: &User, now: DateTime<Utc>) -> Self {
        RefundPolicy {
            id,
            branch_id: branch.id.clone(),
            branch_name: branch.name.clone(),
            allow_refunds: true,
            refund_window_days: 30,
            require_approval: true,
            max_refund_percentage: 100,
            require_returned_goods: true,
            allow_partial_refund: true,
            allowed_reasons: DEFAULT_REFUND_REASONS.iter().map(|r| r.to_string()).collect(),
            require_photo_evidence: false,
            require_manager_approval_above_paisa: Money::from_taka(5000).paisa(),
            auto_approve_below_paisa: Money::from_taka(1000).paisa(),
            auto_complete_after_days: 7,
            auto_restock_refunded_items: true,
            restock_penalty_paisa: None,
            notify_manager_on_refund: true,
            notify_customer_on_approval: true,
            notify_customer_on_completion: true,
            updated_by: actor.id.clone(),
            updated_by_name: actor.display_name().to_string(),
            last_updated: now,
        }
    }

    /// Approval status a new refund of `amount` starts in.
    ///
    /// ```text
    /// require_approval = false, amount ≤ manager limit ──► approved
    /// 0 < amount ≤ auto_approve_below                 ──► approved
    /// otherwise                                       ──► pending_approval
    /// ```
    pub fn initial_approval(&self, amount: Money) -> ApprovalStatus {
        let manager_limit = Money::from_paisa(self.require_manager_approval_above_paisa);
        if !self.require_approval && amount <= manager_limit {
            return ApprovalStatus::Approved;
        }

        let auto_limit = Money::from_paisa(self.auto_approve_below_paisa);
        if auto_limit.is_positive() && amount <= auto_limit {
            return ApprovalStatus::Approved;
        }

        ApprovalStatus::PendingApproval
    }
}

/// Approval status for a new refund, with or without a branch policy.
pub fn initial_approval(policy: Option<&RefundPolicy>, amount: Money) -> ApprovalStatus {
    policy
        .map(|p| p.initial_approval(amount))
        .unwrap_or(ApprovalStatus::PendingApproval)
}

/// Partial policy update: only fields that are present change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PolicyUpdate {
    pub allow_refunds: Option<bool>,
    pub refund_window_days: Option<i64>,
    pub require_approval: Option<bool>,
    pub max_refund_percentage: Option<i64>,
    pub require_returned_goods: Option<bool>,
    pub allow_partial_refund: Option<bool>,
    pub allowed_reasons: Option<Vec<String>>,
    pub require_photo_evidence: Option<bool>,
    pub require_manager_approval_above_paisa: Option<i64>,
    pub auto_approve_below_paisa: Option<i64>,
    pub auto_complete_after_days: Option<i64>,
    pub auto_restock_refunded_items: Option<bool>,
    pub restock_penalty_paisa: Option<i64>,
    pub notify_manager_on_refund: Option<bool>,
    pub notify_customer_on_approval: Option<bool>,
    pub notify_customer_on_completion: Option<bool>,
}

impl PolicyUpdate {
    /// Patches `policy` and stamps who changed it.
    pub fn apply(&self, policy: &mut RefundPolicy, actor: &User, now: DateTime<Utc>) {
        macro_rules! patch {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &self.$field {
                        policy.$field = value.clone();
                    }
                )*
            };
        }

        patch!(
            allow_refunds,
            refund_window_days,
            require_approval,
            max_refund_percentage,
            require_returned_goods,
            allow_partial_refund,
            allowed_reasons,
            require_photo_evidence,
            require_manager_approval_above_paisa,
            auto_approve_below_paisa,
            auto_complete_after_days,
            auto_restock_refunded_items,
            notify_manager_on_refund,
            notify_customer_on_approval,
            notify_customer_on_completion,
        );

        if self.restock_penalty_paisa.is_some() {
            policy.restock_penalty_paisa = self.restock_penalty_paisa;
        }

        policy.updated_by = actor.id.clone();
        policy.updated_by_name = actor.display_name().to_string();
        policy.last_updated = now;
    }
}

// =============================================================================
// Request Checks
// =============================================================================

/// Everything known about the sale when a refund is requested.
#[derive(Debug, Clone, Copy)]
pub struct RefundContext<'a> {
    pub policy: Option<&'a RefundPolicy>,
    pub sale: &'a Sale,
    pub sale_items: &'a [SaleItem],
    /// Earlier refunds against the same sale (any status).
    pub prior_refunds: &'a [Refund],
    pub now: DateTime<Utc>,
}

impl RefundContext<'_> {
    /// Sale total minus what active refunds already hold.
    pub fn refundable_amount(&self) -> Money {
        let held: Money = self
            .prior_refunds
            .iter()
            .filter(|r| r.is_active())
            .map(Refund::amount)
            .sum();
        self.sale.total() - held
    }

    fn days_since_sale(&self) -> f64 {
        (self.now - self.sale.created_at).num_milliseconds() as f64 / MILLIS_PER_DAY
    }
}

/// Validates a refund request against the sale and the branch policy.
///
/// ## Order of Checks
/// 1. Input shape (items, quantities, totals)
/// 2. Sale not already cancelled
/// 3. Branch allows refunds, sale inside the refund window
/// 4. Reason allowed
/// 5. Amount within the returned items' value, the refundable remainder
///    and the policy percentage
/// 6. Full refund when partial refunds are disabled
/// 7. Each item was sold on this sale and not refunded already
pub fn check_refund_request(ctx: &RefundContext<'_>, request: &RefundRequest) -> CoreResult<()> {
    validate_refund_request(request)?;

    if ctx.sale.status == SaleStatus::Cancelled {
        return Err(CoreError::SaleAlreadyCancelled {
            sale_number: ctx.sale.sale_number.clone(),
        });
    }

    let amount = request.amount();
    let refundable = ctx.refundable_amount();

    if let Some(policy) = ctx.policy {
        if !policy.allow_refunds {
            return Err(CoreError::RefundsNotAllowed);
        }

        if ctx.days_since_sale() > policy.refund_window_days as f64 {
            return Err(CoreError::RefundWindowExpired {
                days: policy.refund_window_days,
            });
        }

        if !policy.allowed_reasons.is_empty()
            && !policy.allowed_reasons.iter().any(|r| r == &request.refund_reason)
        {
            return Err(CoreError::ReasonNotAllowed {
                reason: request.refund_reason.clone(),
            });
        }
    }

    let items_value = request.items_value();
    if amount > items_value {
        return Err(CoreError::RefundExceedsItems {
            requested: amount,
            items_value,
        });
    }

    if amount > refundable {
        return Err(CoreError::RefundExceedsSale {
            requested: amount,
            available: refundable,
        });
    }

    if let Some(policy) = ctx.policy {
        let pct = policy.max_refund_percentage.clamp(0, 100);
        let limit = ctx.sale.total().percentage((pct * 100) as u32);
        if amount > limit {
            return Err(CoreError::RefundExceedsPolicyLimit {
                requested: amount,
                percentage: pct,
            });
        }

        if !policy.allow_partial_refund && amount != refundable {
            return Err(CoreError::PartialRefundNotAllowed);
        }
    }

    check_item_quantities(ctx, request)
}

fn check_item_quantities(ctx: &RefundContext<'_>, request: &RefundRequest) -> CoreResult<()> {
    let mut sold: HashMap<&str, i64> = HashMap::new();
    for item in ctx.sale_items {
        *sold.entry(item.product_id.as_str()).or_default() += item.quantity;
    }

    let mut refunded: HashMap<&str, i64> = HashMap::new();
    for refund in ctx.prior_refunds.iter().filter(|r| r.is_active()) {
        for item in &refund.items {
            *refunded.entry(item.product_id.as_str()).or_default() += item.quantity;
        }
    }

    let mut requested: HashMap<&str, (i64, &str)> = HashMap::new();
    for item in &request.items {
        let entry = requested
            .entry(item.product_id.as_str())
            .or_insert((0, item.product_name.as_str()));
        entry.0 += item.quantity;
    }

    for (product_id, (qty, product_name)) in requested {
        let sold_qty = sold.get(product_id).copied().unwrap_or(0);
        if sold_qty == 0 {
            return Err(CoreError::ItemNotInSale {
                product_name: product_name.to_string(),
                sale_number: ctx.sale.sale_number.clone(),
            });
        }

        let available = sold_qty - refunded.get(product_id).copied().unwrap_or(0);
        if qty > available {
            return Err(CoreError::RefundQuantityExceeded {
                product_name: product_name.to_string(),
                available: available.max(0),
                requested: qty,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Loyalty Reversal
// =============================================================================

/// Points the sale earned that have not been clawed back yet.
///
/// Purchase entries add, earlier `refund` entries for the same sale are
/// already negative, so a second completion on one sale reverses nothing.
pub fn points_to_reverse(transactions: &[PointsTransaction], sale_id: &str) -> i64 {
    transactions
        .iter()
        .filter(|t| t.reference_id.as_deref() == Some(sale_id))
        .map(|t| t.points)
        .sum::<i64>()
        .max(0)
}

/// Balance after a reversal; never below zero.
#[inline]
pub fn reversed_balance(balance: i64, points: i64) -> i64 {
    (balance - points).max(0)
}

/// Summary written to the final audit entry of a completed refund.
pub fn completion_note(
    refund: &Refund,
    sale: Option<&Sale>,
    points_reversed: i64,
    return_condition: Option<&str>,
) -> String {
    let sale_number = sale.map(|s| s.sale_number.as_str()).unwrap_or("N/A");
    let paid = sale.map(Sale::paid).unwrap_or_default();
    let restocked = if refund.restock_required {
        refund.items.len()
    } else {
        0
    };

    format!(
        "UNDO SALE COMPLETED - All transactions reversed. Original sale #{} marked as cancelled. \
         Payment reversed ({}). Stock restored ({} items). Loyalty points reversed ({}). \
         Return condition: {}",
        sale_number,
        paid,
        restocked,
        points_reversed,
        return_condition.unwrap_or("Not specified"),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
