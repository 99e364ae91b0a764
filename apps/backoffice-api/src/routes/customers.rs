//! Customer lookup and loyalty ledger.

use axum::extract::{Path, State};
use axum::Json;
use borka_core::{Customer, PointsTransaction};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    debug!(id = %id, "get_customer");
    let customer = state
        .db
        .customers()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;
    Ok(Json(customer))
}

/// Points ledger, newest first.
pub async fn customer_points(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PointsTransaction>>> {
    let transactions = state.db.customers().points_transactions(&id).await?;
    Ok(Json(transactions))
}
