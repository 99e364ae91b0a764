//! Product lookup for the back-office item pickers.

use axum::extract::{Path, Query, State};
use axum::Json;
use borka_core::validation::validate_search_query;
use borka_core::Product;
use serde::Deserialize;
use tracing::debug;

use super::list_limit;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Matches name, SKU or category.
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Active products, optionally filtered.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let q = query.q.as_deref().map(validate_search_query).transpose()?;
    let limit = list_limit(query.limit);
    debug!(q = ?q, limit, "list_products");

    let products = state.db.products().list_active(q.as_deref(), limit).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product not found: {}", id)))?;
    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::test_state;

    #[tokio::test]
    async fn test_search_and_get() {
        let state = test_state().await;

        let query = ProductQuery {
            q: Some("  nida ".into()),
            limit: None,
        };
        let Json(found) = list_products(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sku, "ABY-NIDA");

        let query = ProductQuery {
            q: Some("kaftan".into()),
            limit: Some(10),
        };
        let Json(found) = list_products(State(state.clone()), Query(query)).await.unwrap();
        assert!(found.is_empty());

        let Json(product) = get_product(State(state.clone()), Path("nida".into())).await.unwrap();
        assert_eq!(product.current_stock, 5);

        let err = get_product(State(state), Path("ghost".into())).await.unwrap_err();
        assert_eq!(err.message, "Product not found: ghost");
    }
}
