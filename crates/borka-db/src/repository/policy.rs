//! # Policy Repository
//!
//! One refund policy per branch. A branch without a row has no policy, in
//! which case every refund waits for a manager and no window applies.

use borka_core::validation::validate_policy_update;
use borka_core::{CoreError, PolicyUpdate, RefundPolicy, User};
use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::info;

use super::{new_id, reference};
use crate::error::DbResult;

/// Result of a policy update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySaved {
    pub policy_id: String,
    /// True when the branch had no policy before.
    pub is_new: bool,
}

pub(crate) async fn fetch_policy<'e>(
    exec: impl SqliteExecutor<'e>,
    branch_id: &str,
) -> DbResult<Option<RefundPolicy>> {
    let policy = sqlx::query_as::<_, RefundPolicy>("SELECT * FROM refund_policies WHERE branch_id = ?1")
        .bind(branch_id)
        .fetch_optional(exec)
        .await?;
    Ok(policy)
}

#[derive(Debug, Clone)]
pub struct PolicyRepository {
    pool: SqlitePool,
}

impl PolicyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PolicyRepository { pool }
    }

    pub async fn get(&self, branch_id: &str) -> DbResult<Option<RefundPolicy>> {
        fetch_policy(&self.pool, branch_id).await
    }

    /// Patches the branch policy, creating it from the defaults first when
    /// the branch has none.
    pub async fn update(
        &self,
        branch_id: &str,
        update: &PolicyUpdate,
        actor: &User,
    ) -> DbResult<PolicySaved> {
        validate_policy_update(update)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing = fetch_policy(&mut *tx, branch_id).await?;
        let is_new = existing.is_none();

        let mut policy = match existing {
            Some(policy) => policy,
            None => {
                let branch = reference::fetch_branch(&mut *tx, branch_id)
                    .await?
                    .ok_or_else(|| CoreError::BranchNotFound(branch_id.to_string()))?;
                RefundPolicy::with_defaults(new_id(), &branch, actor, now)
            }
        };
        update.apply(&mut policy, actor, now);

        sqlx::query(
            r#"
            INSERT INTO refund_policies (
                id, branch_id, branch_name, allow_refunds, refund_window_days,
                require_approval, max_refund_percentage, require_returned_goods,
                allow_partial_refund, allowed_reasons, require_photo_evidence,
                require_manager_approval_above_paisa, auto_approve_below_paisa,
                auto_complete_after_days, auto_restock_refunded_items, restock_penalty_paisa,
                notify_manager_on_refund, notify_customer_on_approval,
                notify_customer_on_completion, updated_by, updated_by_name, last_updated
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            ON CONFLICT (branch_id) DO UPDATE SET
                allow_refunds = excluded.allow_refunds,
                refund_window_days = excluded.refund_window_days,
                require_approval = excluded.require_approval,
                max_refund_percentage = excluded.max_refund_percentage,
                require_returned_goods = excluded.require_returned_goods,
                allow_partial_refund = excluded.allow_partial_refund,
                allowed_reasons = excluded.allowed_reasons,
                require_photo_evidence = excluded.require_photo_evidence,
                require_manager_approval_above_paisa = excluded.require_manager_approval_above_paisa,
                auto_approve_below_paisa = excluded.auto_approve_below_paisa,
                auto_complete_after_days = excluded.auto_complete_after_days,
                auto_restock_refunded_items = excluded.auto_restock_refunded_items,
                restock_penalty_paisa = excluded.restock_penalty_paisa,
                notify_manager_on_refund = excluded.notify_manager_on_refund,
                notify_customer_on_approval = excluded.notify_customer_on_approval,
                notify_customer_on_completion = excluded.notify_customer_on_completion,
                updated_by = excluded.updated_by,
                updated_by_name = excluded.updated_by_name,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&policy.id)
        .bind(&policy.branch_id)
        .bind(&policy.branch_name)
        .bind(policy.allow_refunds)
        .bind(policy.refund_window_days)
        .bind(policy.require_approval)
        .bind(policy.max_refund_percentage)
        .bind(policy.require_returned_goods)
        .bind(policy.allow_partial_refund)
        .bind(Json(&policy.allowed_reasons))
        .bind(policy.require_photo_evidence)
        .bind(policy.require_manager_approval_above_paisa)
        .bind(policy.auto_approve_below_paisa)
        .bind(policy.auto_complete_after_days)
        .bind(policy.auto_restock_refunded_items)
        .bind(policy.restock_penalty_paisa)
        .bind(policy.notify_manager_on_refund)
        .bind(policy.notify_customer_on_approval)
        .bind(policy.notify_customer_on_completion)
        .bind(&policy.updated_by)
        .bind(&policy.updated_by_name)
        .bind(policy.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(branch_id, policy_id = %policy.id, is_new, "Refund policy saved");

        Ok(PolicySaved {
            policy_id: policy.id,
            is_new,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{gulshan, manager, seed, test_db};
    use crate::DbError;

    #[tokio::test]
    async fn test_first_update_creates_from_defaults() {
        let db = test_db().await;
        seed(&db, &[]).await;
        let branch = gulshan();
        assert!(db.policies().get(&branch.id).await.unwrap().is_none());

        let update = PolicyUpdate {
            refund_window_days: Some(14),
            ..PolicyUpdate::default()
        };
        let saved = db.policies().update(&branch.id, &update, &manager()).await.unwrap();
        assert!(saved.is_new);

        let policy = db.policies().get(&branch.id).await.unwrap().unwrap();
        assert_eq!(policy.id, saved.policy_id);
        assert_eq!(policy.refund_window_days, 14);
        assert_eq!(policy.branch_name, "Gulshan");
        assert_eq!(policy.max_refund_percentage, 100);
        assert_eq!(policy.allowed_reasons.len(), 4);
        assert_eq!(policy.auto_approve_below_paisa, 100_000);
        assert_eq!(policy.updated_by_name, "Rumana Akter");
    }

    #[tokio::test]
    async fn test_second_update_patches_in_place() {
        let db = test_db().await;
        seed(&db, &[]).await;
        let branch = gulshan();

        let first = db
            .policies()
            .update(&branch.id, &PolicyUpdate::default(), &manager())
            .await
            .unwrap();

        let update = PolicyUpdate {
            allow_partial_refund: Some(false),
            allowed_reasons: Some(vec![]),
            ..PolicyUpdate::default()
        };
        let second = db.policies().update(&branch.id, &update, &manager()).await.unwrap();
        assert!(!second.is_new);
        assert_eq!(second.policy_id, first.policy_id);

        let policy = db.policies().get(&branch.id).await.unwrap().unwrap();
        assert!(!policy.allow_partial_refund);
        assert!(policy.allowed_reasons.is_empty());
        assert_eq!(policy.refund_window_days, 30);
    }

    #[tokio::test]
    async fn test_invalid_update_and_unknown_branch() {
        let db = test_db().await;
        seed(&db, &[]).await;

        let bad = PolicyUpdate {
            max_refund_percentage: Some(150),
            ..PolicyUpdate::default()
        };
        let err = db.policies().update(&gulshan().id, &bad, &manager()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let err = db
            .policies()
            .update("branch-nowhere", &PolicyUpdate::default(), &manager())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
