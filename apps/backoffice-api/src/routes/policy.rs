//! Per-branch refund policy.

use axum::extract::{Path, State};
use axum::Json;
use borka_core::{PolicyUpdate, RefundPolicy};
use borka_db::PolicySaved;
use tracing::info;

use crate::auth::Actor;
use crate::error::ApiResult;
use crate::AppState;

/// `GET /api/branches/{id}/refund-policy`: `null` when the branch has none.
pub async fn get_policy(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
) -> ApiResult<Json<Option<RefundPolicy>>> {
    let policy = state.db.policies().get(&branch_id).await?;
    Ok(Json(policy))
}

/// `PUT /api/branches/{id}/refund-policy` with only the fields to change.
pub async fn update_policy(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(branch_id): Path<String>,
    Json(update): Json<PolicyUpdate>,
) -> ApiResult<Json<PolicySaved>> {
    let saved = state.db.policies().update(&branch_id, &update, &actor).await?;
    info!(
        branch_id = %branch_id,
        is_new = saved.is_new,
        by = %actor.display_name(),
        "update_policy"
    );
    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::routes::testing::{actor, test_state};

    #[tokio::test]
    async fn test_policy_roundtrip_over_handlers() {
        let state = test_state().await;
        let branch = || Path("branch-gulshan".to_string());

        let Json(none) = get_policy(State(state.clone()), branch()).await.unwrap();
        assert!(none.is_none());

        let update = PolicyUpdate {
            refund_window_days: Some(7),
            ..PolicyUpdate::default()
        };
        let Json(saved) = update_policy(State(state.clone()), actor(), branch(), Json(update))
            .await
            .unwrap();
        assert!(saved.is_new);

        let Json(policy) = get_policy(State(state.clone()), branch()).await.unwrap();
        let policy = policy.unwrap();
        assert_eq!(policy.refund_window_days, 7);
        assert!(policy.allow_refunds);

        let bad = PolicyUpdate {
            refund_window_days: Some(-3),
            ..PolicyUpdate::default()
        };
        let err = update_policy(State(state), actor(), branch(), Json(bad))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
