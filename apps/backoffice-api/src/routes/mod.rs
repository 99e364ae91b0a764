//! # Route Handlers
//!
//! One module per area; [`api_routes`] mounts them under `/api`.
//!
//! Handlers are plain async functions taking axum extractors, so tests call
//! them directly with `State`, `Path`, `Query`, `Json` and [`Actor`] values.
//!
//! [`Actor`]: crate::auth::Actor

pub mod customers;
pub mod health;
pub mod policy;
pub mod products;
pub mod refunds;
pub mod sales;

use axum::routing::{get, post};
use axum::Router;
use borka_core::DEFAULT_LIST_LIMIT;

use crate::AppState;

/// Largest page a list endpoint returns.
const MAX_LIST_LIMIT: i64 = 500;

/// Clamps a `?limit=` value.
pub(crate) fn list_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Refunds
        .route("/refunds", get(refunds::list_refunds).post(refunds::create_refund))
        .route("/refunds/pending", get(refunds::pending_refunds))
        .route("/refunds/stats", get(refunds::refund_statistics))
        .route("/refunds/{id}", get(refunds::get_refund))
        .route("/refunds/{id}/audit", get(refunds::refund_audit))
        .route("/refunds/{id}/approve", post(refunds::approve_refund))
        .route("/refunds/{id}/reject", post(refunds::reject_refund))
        .route("/refunds/{id}/process", post(refunds::process_refund))
        .route("/refunds/{id}/complete", post(refunds::complete_refund))
        // Policy
        .route(
            "/branches/{id}/refund-policy",
            get(policy::get_policy).put(policy::update_policy),
        )
        // Sales
        .route("/sales", get(sales::list_sales).post(sales::record_sale))
        .route("/sales/{id}", get(sales::get_sale))
        .route("/sales/{id}/refunds", get(refunds::sale_refunds))
        // Products
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        // Customers
        .route("/customers/{id}", get(customers::get_customer))
        .route("/customers/{id}/points", get(customers::customer_points))
        .route("/customers/{id}/refunds", get(refunds::customer_refunds))
}
