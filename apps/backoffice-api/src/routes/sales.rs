//! Recording and reading sales.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use borka_core::{NewSale, Sale, SaleItem};
use borka_db::RecordedSale;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::list_limit;
use crate::auth::Actor;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleListQuery {
    pub branch_id: Option<String>,
    pub limit: Option<i64>,
}

/// A sale with its lines.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// `POST /api/sales`
pub async fn record_sale(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(new_sale): Json<NewSale>,
) -> ApiResult<(StatusCode, Json<RecordedSale>)> {
    let recorded = state
        .db
        .sales()
        .record_sale(&new_sale, &actor, &state.sale_settings)
        .await?;

    info!(
        sale_number = %recorded.sale.sale_number,
        total = %recorded.sale.total(),
        cashier = %actor.display_name(),
        "record_sale"
    );
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    let sale = state
        .db
        .sales()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale not found"))?;
    let items = state.db.sales().items(&id).await?;
    Ok(Json(SaleDetail { sale, items }))
}

/// Newest first.
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let limit = list_limit(query.limit);
    debug!(branch_id = ?query.branch_id, limit, "list_sales");
    let sales = state
        .db
        .sales()
        .list(query.branch_id.as_deref(), limit)
        .await?;
    Ok(Json(sales))
}
