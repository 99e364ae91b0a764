//! # Refund Handlers
//!
//! HTTP surface of the refund / undo-sale workflow.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /refunds ──► pending + (pending_approval | approved)             │
//! │        │                                                                │
//! │        ├── POST /refunds/{id}/approve ──► approved                     │
//! │        ├── POST /refunds/{id}/reject  ──► rejected   (until completed) │
//! │        ▼                                                                │
//! │  POST /refunds/{id}/process  ──► processed (payout recorded)           │
//! │        ▼                                                                │
//! │  POST /refunds/{id}/complete ──► completed, sale undone                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations answer with the refund as stored afterwards, so the UI can
//! replace its row without another round trip.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use borka_core::{
    AuditEntry, Refund, RefundDetails, RefundRequest, RefundStatistics, RefundStatus,
    StatisticsFilter,
};
use borka_db::{Completion, CompletedRefund, CreatedRefund};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::list_limit;
use crate::auth::Actor;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

// =============================================================================
// Request Bodies & Queries
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundListQuery {
    pub branch_id: Option<String>,
    /// `pending`, `processed`, `completed` or `rejected`.
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchQuery {
    pub branch_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub branch_id: Option<String>,
    /// RFC 3339; used only together with `endDate`.
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBody {
    pub payment_details: Option<RefundDetails>,
}

fn parse_status(status: Option<&str>) -> ApiResult<Option<RefundStatus>> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => RefundStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("Unknown refund status: {}", s))),
    }
}

async fn load_refund(state: &AppState, id: &str) -> ApiResult<Refund> {
    state
        .db
        .refunds()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Refund not found"))
}

// =============================================================================
// Queries
// =============================================================================

/// `GET /api/refunds?branchId&status&limit`
pub async fn list_refunds(
    State(state): State<AppState>,
    Query(query): Query<RefundListQuery>,
) -> ApiResult<Json<Vec<Refund>>> {
    let status = parse_status(query.status.as_deref())?;
    let limit = list_limit(query.limit);
    debug!(branch_id = ?query.branch_id, ?status, limit, "list_refunds");

    let refunds = state
        .db
        .refunds()
        .list(query.branch_id.as_deref(), status, limit)
        .await?;
    Ok(Json(refunds))
}

pub async fn pending_refunds(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Json<Vec<Refund>>> {
    let refunds = state
        .db
        .refunds()
        .pending_approval(query.branch_id.as_deref())
        .await?;
    Ok(Json(refunds))
}

pub async fn refund_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<RefundStatistics>> {
    let filter = StatisticsFilter {
        branch_id: query.branch_id,
        start: query.start_date,
        end: query.end_date,
    };
    let stats = state.db.refunds().statistics(&filter).await?;
    Ok(Json(stats))
}

pub async fn get_refund(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Refund>> {
    Ok(Json(load_refund(&state, &id).await?))
}

/// Audit trail, newest first.
pub async fn refund_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let entries = state.db.refunds().audit_trail(&id).await?;
    Ok(Json(entries))
}

pub async fn sale_refunds(
    State(state): State<AppState>,
    Path(sale_id): Path<String>,
) -> ApiResult<Json<Vec<Refund>>> {
    Ok(Json(state.db.refunds().by_sale(&sale_id).await?))
}

pub async fn customer_refunds(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<Vec<Refund>>> {
    Ok(Json(state.db.refunds().by_customer(&customer_id).await?))
}

// =============================================================================
// Mutations
// =============================================================================

/// `POST /api/refunds`
pub async fn create_refund(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<RefundRequest>,
) -> ApiResult<(StatusCode, Json<CreatedRefund>)> {
    let created = state.db.refunds().create(&request, &actor).await?;
    info!(
        refund_number = %created.refund_number,
        approval = %created.approval_status,
        by = %actor.display_name(),
        "create_refund"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn approve_refund(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    body: Option<Json<ApproveBody>>,
) -> ApiResult<Json<Refund>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    state
        .db
        .refunds()
        .approve(&id, body.notes.as_deref(), &actor)
        .await?;
    Ok(Json(load_refund(&state, &id).await?))
}

pub async fn reject_refund(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> ApiResult<Json<Refund>> {
    state.db.refunds().reject(&id, &body.reason, &actor).await?;
    Ok(Json(load_refund(&state, &id).await?))
}

pub async fn process_refund(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    body: Option<Json<ProcessBody>>,
) -> ApiResult<Json<Refund>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    state
        .db
        .refunds()
        .process(&id, body.payment_details.as_ref(), &actor)
        .await?;
    Ok(Json(load_refund(&state, &id).await?))
}

/// Undo sale. See `borka_db::repository::refund` for the steps.
///
/// Approve, process and complete accept a missing body.
pub async fn complete_refund(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    completion: Option<Json<Completion>>,
) -> ApiResult<Json<CompletedRefund>> {
    let completion = completion.map(|Json(c)| c).unwrap_or_default();
    let done = state.db.refunds().complete(&id, &completion, &actor).await?;
    Ok(Json(done))
}
