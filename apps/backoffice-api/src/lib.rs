//! # Borka Back-Office API
//!
//! JSON over HTTP for the back-office UI.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Back-Office API Routes                            │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │  Refunds           │  │  Refund Policy     │  │  Sales           │  │
//! │  │                    │  │                    │  │                  │  │
//! │  │ • list / pending   │  │ • get              │  │ • record         │  │
//! │  │ • stats / audit    │  │ • update (PUT)     │  │ • get            │  │
//! │  │ • create, approve  │  │                    │  │ • refunds        │  │
//! │  │ • reject, process  │  └────────────────────┘  └──────────────────┘  │
//! │  │ • complete (undo)  │                                                │
//! │  └────────────────────┘  ┌────────────────────┐  ┌──────────────────┐  │
//! │                          │  Products          │  │  Customers       │  │
//! │                          │ • search, get      │  │ • get, points    │  │
//! │                          └────────────────────┘  │ • refunds        │  │
//! │                                                  └──────────────────┘  │
//! │                                                                         │
//! │  Mutations resolve the acting staff member from `x-user-id`.           │
//! │  Every handler returns `Result<Json<T>, ApiError>`.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: `config/borka.toml` plus `BORKA__*` environment variables,
//! e.g. `BORKA__SERVER__PORT=9000`, `BORKA__STORE__TAX_RATE_BPS=500`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use borka_db::{Database, SaleSettings};
use std::time::Instant;
use tracing::info;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Default `RUST_LOG` filter for the binary.
pub const DEFAULT_LOG_FILTER: &str = "info,borka=debug,sqlx=warn";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    /// Tax rate and loyalty rate applied to new sales.
    pub sale_settings: SaleSettings,
}

impl AppState {
    pub fn new(db: Database, sale_settings: SaleSettings) -> Self {
        AppState { db, sale_settings }
    }
}

/// Builds the full router: `/health` plus everything under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", routes::api_routes())
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// One line per request with status and latency.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request"
    );
    response
}
