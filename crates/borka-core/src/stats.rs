//! # Refund Statistics
//!
//! Aggregates for the refunds dashboard, computed over loaded refunds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::refund::{ApprovalStatus, Refund, RefundStatus};

/// Which refunds to aggregate.
#[derive(Debug, Clone, Default)]
pub struct StatisticsFilter {
    pub branch_id: Option<String>,
    /// Applied only together with `end`.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl StatisticsFilter {
    fn matches(&self, refund: &Refund) -> bool {
        if let Some(branch_id) = &self.branch_id {
            if &refund.branch_id != branch_id {
                return false;
            }
        }

        match (self.start, self.end) {
            (Some(start), Some(end)) => refund.request_date >= start && refund.request_date <= end,
            _ => true,
        }
    }
}

/// Counts per status. `approved` counts the approval decision, the other
/// buckets count the payout status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub processed: i64,
    pub completed: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefundStatistics {
    pub total_refunds: i64,
    pub total_refund_amount_paisa: i64,
    pub by_status: StatusCounts,
    pub by_reason: BTreeMap<String, i64>,
    pub by_method: BTreeMap<String, i64>,
    pub pending_approval: i64,
    /// Rounded to the nearest paisa; 0 when there are no refunds.
    pub average_refund_amount_paisa: i64,
}

/// Aggregates the refunds that pass `filter`.
pub fn refund_statistics(refunds: &[Refund], filter: &StatisticsFilter) -> RefundStatistics {
    let mut stats = RefundStatistics::default();

    for refund in refunds.iter().filter(|r| filter.matches(r)) {
        stats.total_refunds += 1;
        stats.total_refund_amount_paisa += refund.refund_amount_paisa;

        match refund.status {
            RefundStatus::Pending => stats.by_status.pending += 1,
            RefundStatus::Processed => stats.by_status.processed += 1,
            RefundStatus::Completed => stats.by_status.completed += 1,
            RefundStatus::Rejected => stats.by_status.rejected += 1,
        }

        match refund.approval_status {
            ApprovalStatus::Approved => stats.by_status.approved += 1,
            ApprovalStatus::PendingApproval => stats.pending_approval += 1,
            ApprovalStatus::Rejected => {}
        }

        *stats.by_reason.entry(refund.refund_reason.clone()).or_default() += 1;
        *stats
            .by_method
            .entry(refund.refund_method.as_str().to_string())
            .or_default() += 1;
    }

    if stats.total_refunds > 0 {
        let n = stats.total_refunds;
        stats.average_refund_amount_paisa = (stats.total_refund_amount_paisa + n / 2) / n;
    }

    stats
}
