//! Liveness and database health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// Latest applied migration, `None` when the database is unreachable.
    pub schema_version: Option<i64>,
}

/// `GET /health`: 200 when the database answers with a current schema,
/// 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let schema = if database {
        state.db.schema_status().await.ok()
    } else {
        None
    };
    let healthy = database && schema.as_ref().is_some_and(|s| s.is_current());
    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            schema_version: schema.and_then(|s| s.latest_version()),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::test_state;

    #[tokio::test]
    async fn test_health_reports_database() {
        let state = test_state().await;
        let (status, Json(body)) = health(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.database);
        assert_eq!(body.schema_version, Some(1));

        state.db.close().await;
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.schema_version, None);
    }
}
