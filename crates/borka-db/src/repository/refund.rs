//! # Refund Repository
//!
//! The refund / undo-sale workflow over SQLite.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Refund Workflow (one tx per step)                    │
//! │                                                                         │
//! │  create ──► check_refund_request ──► initial approval ──► audit        │
//! │                                                                         │
//! │  approve / reject ──► transition check ──► audit                       │
//! │                                                                         │
//! │  process ──► payout recorded (method, details) ──► audit               │
//! │                                                                         │
//! │  complete (UNDO SALE)                                                  │
//! │    1. refund completed, goods marked returned                          │
//! │    2. original sale cancelled                                          │
//! │    3. restock each line (store + branch), `in` movement                │
//! │    4. reverse the sale's loyalty points, balance floored at 0          │
//! │    5. discount_reversal audit (sale had a discount)                    │
//! │    6. tax_reversal audit (sale had tax)                                │
//! │    7. completed audit with the undo summary                            │
//! │                                                                         │
//! │  Any error ──► transaction dropped ──► no partial undo                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use borka_core::refund::{check_refund_request, completion_note, initial_approval, points_to_reverse, reversed_balance, RefundContext};
use borka_core::stats::refund_statistics;
use borka_core::validation::{validate_notes, validate_required_text};
use borka_core::{
    ApprovalStatus, AuditAction, AuditEntry, CoreError, MovementType, PointsTransaction,
    PointsTransactionType, Refund, RefundDetails, RefundRequest, RefundStatistics, RefundStatus,
    StatisticsFilter, User,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, info, warn};

use super::{customer, new_id, policy, product, sale, short_suffix};
use crate::error::DbResult;

// =============================================================================
// Workflow Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRefund {
    pub refund_id: String,
    pub refund_number: String,
    pub approval_status: ApprovalStatus,
}

/// What the staff member records when the goods come back.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub return_condition: Option<String>,
    pub inspection_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedRefund {
    pub refund_id: String,
    pub message: String,
    /// Lines put back on the shelf.
    pub restocked_items: i64,
    pub points_reversed: i64,
}

// =============================================================================
// Row Helpers
// =============================================================================

async fn fetch_refund<'e>(exec: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Refund>> {
    let refund = sqlx::query_as::<_, Refund>("SELECT * FROM refunds WHERE id = ?1")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(refund)
}

async fn require_refund(conn: &mut SqliteConnection, id: &str) -> DbResult<Refund> {
    let refund = fetch_refund(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::RefundNotFound(id.to_string()))?;
    Ok(refund)
}

async fn fetch_refunds_for_sale<'e>(
    exec: impl SqliteExecutor<'e>,
    sale_id: &str,
) -> DbResult<Vec<Refund>> {
    let refunds = sqlx::query_as::<_, Refund>(
        "SELECT * FROM refunds WHERE sale_id = ?1 ORDER BY request_date DESC, rowid DESC",
    )
    .bind(sale_id)
    .fetch_all(exec)
    .await?;
    Ok(refunds)
}

async fn insert_refund(conn: &mut SqliteConnection, refund: &Refund) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO refunds (
            id, refund_number, sale_id, sale_number, branch_id, branch_name,
            customer_id, customer_name, customer_phone, items,
            subtotal_paisa, tax_paisa, discount_paisa, refund_amount_paisa,
            refund_method, original_payment_method, status, approval_status,
            refund_reason, refund_notes, restock_required, is_returned,
            payment_details, request_date
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22,
            ?23, ?24
        )
        "#,
    )
    .bind(&refund.id)
    .bind(&refund.refund_number)
    .bind(&refund.sale_id)
    .bind(&refund.sale_number)
    .bind(&refund.branch_id)
    .bind(&refund.branch_name)
    .bind(&refund.customer_id)
    .bind(&refund.customer_name)
    .bind(&refund.customer_phone)
    .bind(Json(&refund.items))
    .bind(refund.subtotal_paisa)
    .bind(refund.tax_paisa)
    .bind(refund.discount_paisa)
    .bind(refund.refund_amount_paisa)
    .bind(refund.refund_method)
    .bind(refund.original_payment_method)
    .bind(refund.status)
    .bind(refund.approval_status)
    .bind(&refund.refund_reason)
    .bind(&refund.refund_notes)
    .bind(refund.restock_required)
    .bind(refund.is_returned)
    .bind(Json(&refund.payment_details))
    .bind(refund.request_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Appends one audit entry for `refund`.
async fn write_audit(
    conn: &mut SqliteConnection,
    refund: &Refund,
    action: AuditAction,
    previous_status: Option<&str>,
    new_status: &str,
    actor: &User,
    notes: Option<String>,
) -> DbResult<()> {
    let entry = AuditEntry {
        id: new_id(),
        refund_id: refund.id.clone(),
        refund_number: refund.refund_number.clone(),
        action,
        previous_status: previous_status.map(str::to_string),
        new_status: new_status.to_string(),
        performed_by: actor.id.clone(),
        performed_by_name: actor.display_name().to_string(),
        notes,
        timestamp: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO refund_audit (
            id, refund_id, refund_number, action, previous_status, new_status,
            performed_by, performed_by_name, notes, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.refund_id)
    .bind(&entry.refund_number)
    .bind(entry.action)
    .bind(&entry.previous_status)
    .bind(&entry.new_status)
    .bind(&entry.performed_by)
    .bind(&entry.performed_by_name)
    .bind(&entry.notes)
    .bind(entry.timestamp)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn refund_number() -> String {
    format!("REF-{}-{}", Utc::now().timestamp_millis(), short_suffix())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the refund workflow.
///
/// ## Usage
/// ```rust,ignore
/// let created = db.refunds().create(&request, &actor).await?;
/// db.refunds().approve(&created.refund_id, None, &manager).await?;
/// db.refunds().process(&created.refund_id, None, &manager).await?;
/// let done = db.refunds().complete(&created.refund_id, &Completion::default(), &manager).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

impl RefundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Refunds newest first, optionally for one branch and / or status.
    pub async fn list(
        &self,
        branch_id: Option<&str>,
        status: Option<RefundStatus>,
        limit: i64,
    ) -> DbResult<Vec<Refund>> {
        debug!(?branch_id, ?status, limit, "Listing refunds");

        let refunds = sqlx::query_as::<_, Refund>(
            r#"
            SELECT * FROM refunds
            WHERE (?1 IS NULL OR branch_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY request_date DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(branch_id)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(refunds)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Refund>> {
        fetch_refund(&self.pool, id).await
    }

    pub async fn by_sale(&self, sale_id: &str) -> DbResult<Vec<Refund>> {
        fetch_refunds_for_sale(&self.pool, sale_id).await
    }

    pub async fn by_customer(&self, customer_id: &str) -> DbResult<Vec<Refund>> {
        let refunds = sqlx::query_as::<_, Refund>(
            "SELECT * FROM refunds WHERE customer_id = ?1 ORDER BY request_date DESC, rowid DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(refunds)
    }

    /// Refunds waiting for a manager decision, newest first.
    pub async fn pending_approval(&self, branch_id: Option<&str>) -> DbResult<Vec<Refund>> {
        let refunds = sqlx::query_as::<_, Refund>(
            r#"
            SELECT * FROM refunds
            WHERE approval_status = ?1
              AND (?2 IS NULL OR branch_id = ?2)
            ORDER BY request_date DESC, rowid DESC
            "#,
        )
        .bind(ApprovalStatus::PendingApproval)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(refunds)
    }

    /// History of one refund, newest first.
    pub async fn audit_trail(&self, refund_id: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM refund_audit WHERE refund_id = ?1 ORDER BY timestamp DESC, rowid DESC",
        )
        .bind(refund_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Dashboard aggregates.
    pub async fn statistics(&self, filter: &StatisticsFilter) -> DbResult<RefundStatistics> {
        let refunds = sqlx::query_as::<_, Refund>(
            "SELECT * FROM refunds WHERE (?1 IS NULL OR branch_id = ?1)",
        )
        .bind(filter.branch_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(refund_statistics(&refunds, filter))
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Files a refund request against a sale.
    pub async fn create(&self, request: &RefundRequest, actor: &User) -> DbResult<CreatedRefund> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sale = sale::fetch_sale(&mut *tx, &request.sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(request.sale_id.clone()))?;
        let sale_items = sale::fetch_items(&mut *tx, &sale.id).await?;
        let policy = policy::fetch_policy(&mut *tx, &sale.branch_id).await?;
        let prior_refunds = fetch_refunds_for_sale(&mut *tx, &sale.id).await?;

        let ctx = RefundContext {
            policy: policy.as_ref(),
            sale: &sale,
            sale_items: &sale_items,
            prior_refunds: &prior_refunds,
            now,
        };
        if let Err(err) = check_refund_request(&ctx, request) {
            warn!(sale_number = %sale.sale_number, error = %err, "Refund request rejected");
            return Err(err.into());
        }

        let approval_status = initial_approval(policy.as_ref(), request.amount());

        let customer_phone = match &sale.customer_id {
            Some(id) => customer::fetch_customer(&mut *tx, id)
                .await?
                .and_then(|c| c.phone),
            None => None,
        };

        let refund = Refund {
            id: new_id(),
            refund_number: refund_number(),
            sale_id: sale.id.clone(),
            sale_number: sale.sale_number.clone(),
            branch_id: sale.branch_id.clone(),
            branch_name: sale.branch_name.clone(),
            customer_id: sale.customer_id.clone(),
            customer_name: sale.customer_name.clone(),
            customer_phone,
            items: request.items.clone(),
            subtotal_paisa: request.subtotal_paisa,
            tax_paisa: request.tax_paisa,
            discount_paisa: request.discount_paisa,
            refund_amount_paisa: request.refund_amount_paisa,
            refund_method: request.refund_method,
            original_payment_method: sale.payment_method,
            status: RefundStatus::Pending,
            approval_status,
            refund_reason: request.refund_reason.trim().to_string(),
            refund_notes: request.refund_notes.clone(),
            internal_notes: None,
            restock_required: request.restock_required,
            is_returned: false,
            return_condition: None,
            inspection_notes: None,
            approved_by: None,
            approved_by_name: None,
            approval_date: None,
            processed_by: None,
            processed_by_name: None,
            processed_date: None,
            payment_details: RefundDetails::default(),
            request_date: now,
            completed_date: None,
            return_date: None,
        };

        insert_refund(&mut tx, &refund).await?;
        write_audit(
            &mut tx,
            &refund,
            AuditAction::Created,
            None,
            RefundStatus::Pending.as_str(),
            actor,
            Some(format!("Refund request created by {}", actor.display_name())),
        )
        .await?;

        tx.commit().await?;

        info!(
            refund_number = %refund.refund_number,
            sale_number = %refund.sale_number,
            amount = %refund.amount(),
            approval = %approval_status,
            "Refund requested"
        );

        Ok(CreatedRefund {
            refund_id: refund.id,
            refund_number: refund.refund_number,
            approval_status,
        })
    }

    /// Manager approval.
    pub async fn approve(&self, id: &str, notes: Option<&str>, actor: &User) -> DbResult<()> {
        validate_notes("approval notes", notes)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let refund = require_refund(&mut tx, id).await?;
        refund.ensure_can_approve()?;

        sqlx::query(
            r#"
            UPDATE refunds SET
                approval_status = ?2,
                approved_by = ?3,
                approved_by_name = ?4,
                approval_date = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(ApprovalStatus::Approved)
        .bind(&actor.id)
        .bind(actor.display_name())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            &refund,
            AuditAction::Approved,
            Some(refund.approval_status.as_str()),
            ApprovalStatus::Approved.as_str(),
            actor,
            notes.map(str::to_string),
        )
        .await?;

        tx.commit().await?;

        info!(refund_number = %refund.refund_number, by = %actor.display_name(), "Refund approved");
        Ok(())
    }

    /// Rejects a refund that has not completed yet.
    pub async fn reject(&self, id: &str, reason: &str, actor: &User) -> DbResult<()> {
        validate_required_text("rejection reason", reason, 1000)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let refund = require_refund(&mut tx, id).await?;
        refund.ensure_can_reject()?;

        sqlx::query(
            r#"
            UPDATE refunds SET
                status = ?2,
                approval_status = ?3,
                processed_by = ?4,
                processed_by_name = ?5,
                processed_date = ?6,
                internal_notes = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(RefundStatus::Rejected)
        .bind(ApprovalStatus::Rejected)
        .bind(&actor.id)
        .bind(actor.display_name())
        .bind(now)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            &refund,
            AuditAction::Rejected,
            Some(refund.approval_status.as_str()),
            ApprovalStatus::Rejected.as_str(),
            actor,
            Some(reason.to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(refund_number = %refund.refund_number, by = %actor.display_name(), "Refund rejected");
        Ok(())
    }

    /// Records the payout of an approved refund.
    pub async fn process(
        &self,
        id: &str,
        details: Option<&RefundDetails>,
        actor: &User,
    ) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let refund = require_refund(&mut tx, id).await?;
        refund.ensure_can_process()?;

        let details = details.cloned().unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE refunds SET
                status = ?2,
                processed_by = ?3,
                processed_by_name = ?4,
                processed_date = ?5,
                payment_details = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(RefundStatus::Processed)
        .bind(&actor.id)
        .bind(actor.display_name())
        .bind(now)
        .bind(Json(&details))
        .execute(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            &refund,
            AuditAction::Processed,
            Some(refund.status.as_str()),
            RefundStatus::Processed.as_str(),
            actor,
            Some(format!(
                "Refund processed with method: {}",
                refund.refund_method.as_str()
            )),
        )
        .await?;

        tx.commit().await?;

        info!(
            refund_number = %refund.refund_number,
            method = refund.refund_method.as_str(),
            amount = %refund.amount(),
            "Refund processed"
        );
        Ok(())
    }

    /// Completes a processed refund and undoes the sale. See the module docs.
    pub async fn complete(
        &self,
        id: &str,
        completion: &Completion,
        actor: &User,
    ) -> DbResult<CompletedRefund> {
        validate_notes("inspection notes", completion.inspection_notes.as_deref())?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let refund = require_refund(&mut tx, id).await?;
        refund.ensure_can_complete()?;

        // 1. Refund completed, goods back in the shop
        sqlx::query(
            r#"
            UPDATE refunds SET
                status = ?2,
                completed_date = ?3,
                is_returned = 1,
                return_date = ?3,
                return_condition = ?4,
                inspection_notes = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(RefundStatus::Completed)
        .bind(now)
        .bind(&completion.return_condition)
        .bind(&completion.inspection_notes)
        .execute(&mut *tx)
        .await?;

        // 2. Original sale cancelled
        let original_sale = sale::fetch_sale(&mut *tx, &refund.sale_id).await?;
        if let Some(sale) = &original_sale {
            sale::cancel_sale(&mut tx, &sale.id).await?;
        }
        let sale_number = original_sale
            .as_ref()
            .map(|s| s.sale_number.as_str())
            .unwrap_or("N/A");

        // 3. Restock
        let mut restocked_items = 0;
        if refund.restock_required {
            for item in &refund.items {
                let Some(found) = product::fetch_product(&mut *tx, &item.product_id).await? else {
                    warn!(product_id = %item.product_id, "Refunded product no longer exists, not restocked");
                    continue;
                };

                let stock =
                    product::adjust_stock(&mut tx, &item.product_id, &refund.branch_id, item.quantity)
                        .await?;
                let mut movement = product::movement(
                    &found,
                    (&refund.branch_id, &refund.branch_name),
                    MovementType::In,
                    item.quantity,
                    "Undo Sale Return",
                    &refund.refund_number,
                    (&actor.id, actor.display_name()),
                    stock,
                );
                movement.notes = Some(format!(
                    "Sale UNDO: Restocking from sale #{} - Refund #{}",
                    sale_number, refund.refund_number
                ));
                product::insert_movement(&mut tx, &movement).await?;
                restocked_items += 1;
            }
        }

        // 4. Loyalty points
        let mut points_reversed = 0;
        if let Some(sale) = &original_sale {
            if let Some(customer_id) = &sale.customer_id {
                if let Some(cust) = customer::fetch_customer(&mut *tx, customer_id).await? {
                    let ledger = customer::fetch_points_for_sale(&mut *tx, customer_id, &sale.id).await?;
                    let points = points_to_reverse(&ledger, &sale.id);

                    if points > 0 {
                        let entry = PointsTransaction {
                            id: new_id(),
                            customer_id: cust.id.clone(),
                            customer_name: sale
                                .customer_name
                                .clone()
                                .unwrap_or_else(|| "Walk-in".to_string()),
                            transaction_type: PointsTransactionType::Refund,
                            points: -points,
                            description: format!(
                                "Points reversal for sale #{} - Refund #{}",
                                sale.sale_number, refund.refund_number
                            ),
                            reference_id: Some(sale.id.clone()),
                            branch_id: Some(refund.branch_id.clone()),
                            branch_name: Some(refund.branch_name.clone()),
                            created_by: actor.id.clone(),
                            notes: Some(format!("Loyalty points reversed: -{} points", points)),
                            created_at: now,
                        };
                        customer::insert_points_transaction(&mut tx, &entry).await?;
                        customer::set_points_balance(
                            &mut tx,
                            &cust.id,
                            reversed_balance(cust.loyalty_points, points),
                        )
                        .await?;
                        points_reversed = points;
                    }
                }
            }
        }

        // All completion entries, reversals included, record the status left behind
        let previous = refund.status.as_str();
        let completed = RefundStatus::Completed.as_str();

        // 5 + 6. Discount and tax reversals
        if let Some(sale) = &original_sale {
            if sale.discount().is_positive() {
                write_audit(
                    &mut tx,
                    &refund,
                    AuditAction::DiscountReversal,
                    Some(previous),
                    completed,
                    actor,
                    Some(format!(
                        "Discount reversal: {} (included in refund of {})",
                        sale.discount(),
                        refund.amount()
                    )),
                )
                .await?;
            }
            if sale.tax().is_positive() {
                write_audit(
                    &mut tx,
                    &refund,
                    AuditAction::TaxReversal,
                    Some(previous),
                    completed,
                    actor,
                    Some(format!(
                        "Tax reversal: {} (included in refund of {})",
                        sale.tax(),
                        refund.amount()
                    )),
                )
                .await?;
            }
        }

        // 7. Summary
        let message = completion_note(
            &refund,
            original_sale.as_ref(),
            points_reversed,
            completion.return_condition.as_deref(),
        );
        write_audit(
            &mut tx,
            &refund,
            AuditAction::Completed,
            Some(previous),
            completed,
            actor,
            Some(message.clone()),
        )
        .await?;

        tx.commit().await?;

        info!(
            refund_number = %refund.refund_number,
            sale_number,
            restocked_items,
            points_reversed,
            "Sale undone"
        );

        Ok(CompletedRefund {
            refund_id: refund.id,
            message,
            restocked_items,
            points_reversed,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{abaya, customer, gulshan, manager, seed, test_db};
    use crate::repository::SaleSettings;
    use crate::{Database, DbError};
    use borka_core::{
        Money, NewSale, NewSaleItem, PaymentMethod, PolicyUpdate, RefundItem, SaleStatus,
    };

    /// Sells two Nida abayas (৳2450 each) and one hijab to Nusrat.
    async fn sold(db: &Database, customer_points: i64) -> borka_core::Sale {
        seed(db, &[abaya("nida", 2450, 5), abaya("hijab", 350, 10)]).await;
        db.customers().insert(&customer(customer_points)).await.unwrap();

        let sale = NewSale {
            branch_id: gulshan().id,
            customer_id: Some("cust-nusrat".into()),
            items: vec![
                NewSaleItem {
                    product_id: "nida".into(),
                    quantity: 2,
                    size: Some("56".into()),
                },
                NewSaleItem {
                    product_id: "hijab".into(),
                    quantity: 1,
                    size: None,
                },
            ],
            payment_method: PaymentMethod::MobileBanking,
            paid_paisa: None,
            discount_code: None,
        };
        db.sales()
            .record_sale(&sale, &manager(), &SaleSettings::default())
            .await
            .unwrap()
            .sale
    }

    fn line(product: &str, qty: i64, unit_taka: i64) -> RefundItem {
        RefundItem {
            product_id: product.into(),
            product_name: format!("Abaya {}", product),
            quantity: qty,
            unit_price_paisa: unit_taka * 100,
            total_price_paisa: unit_taka * 100 * qty,
            size: None,
            reason: "defective".into(),
            condition: "unworn".into(),
            notes: None,
        }
    }

    fn request(sale_id: &str, items: Vec<RefundItem>, restock: bool) -> RefundRequest {
        let subtotal: i64 = items.iter().map(|i| i.total_price_paisa).sum();
        RefundRequest {
            sale_id: sale_id.into(),
            items,
            subtotal_paisa: subtotal,
            tax_paisa: 0,
            discount_paisa: 0,
            refund_amount_paisa: subtotal,
            refund_method: PaymentMethod::Cash,
            refund_reason: "defective".into(),
            refund_notes: Some("Seam torn at the sleeve".into()),
            restock_required: restock,
        }
    }

    #[tokio::test]
    async fn test_create_without_policy_waits_for_approval() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;

        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap();
        assert_eq!(created.approval_status, ApprovalStatus::PendingApproval);
        assert!(created.refund_number.starts_with("REF-"));

        let refund = db.refunds().get(&created.refund_id).await.unwrap().unwrap();
        assert_eq!(refund.status, RefundStatus::Pending);
        assert_eq!(refund.sale_number, sale.sale_number);
        assert_eq!(refund.customer_phone.as_deref(), Some("01711000000"));
        assert_eq!(refund.original_payment_method, PaymentMethod::MobileBanking);
        assert_eq!(refund.items.len(), 1);
        assert!(!refund.is_returned);

        let trail = db.refunds().audit_trail(&refund.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Created);
        assert_eq!(
            trail[0].notes.as_deref(),
            Some("Refund request created by Rumana Akter")
        );

        assert_eq!(db.refunds().pending_approval(None).await.unwrap().len(), 1);
        assert_eq!(db.refunds().by_sale(&sale.id).await.unwrap().len(), 1);
        assert_eq!(db.refunds().by_customer("cust-nusrat").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_small_refund_auto_approved_under_policy() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;
        db.policies()
            .update(&gulshan().id, &PolicyUpdate::default(), &manager())
            .await
            .unwrap();

        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("hijab", 1, 350)], false), &manager())
            .await
            .unwrap();
        assert_eq!(created.approval_status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn test_unknown_sale_and_refund() {
        let db = test_db().await;
        seed(&db, &[]).await;

        let err = db
            .refunds()
            .create(&request("sale-ghost", vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Sale not found");

        let err = db.refunds().approve("ref-ghost", None, &manager()).await.unwrap_err();
        assert_eq!(err.to_string(), "Refund not found");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_policy_window_blocks_request() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;
        let update = PolicyUpdate {
            refund_window_days: Some(0),
            ..PolicyUpdate::default()
        };
        db.policies().update(&gulshan().id, &update, &manager()).await.unwrap();

        // Age the sale by two days
        let two_days_ago = Utc::now() - chrono::Duration::days(2);
        sqlx::query("UPDATE sales SET created_at = ?2 WHERE id = ?1")
            .bind(&sale.id)
            .bind(two_days_ago)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Refund window of 0 days has passed");
        assert!(db.refunds().by_sale(&sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_refund_capped_by_first() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;

        db.refunds()
            .create(&request(&sale.id, vec![line("nida", 2, 2450)], true), &manager())
            .await
            .unwrap();

        let err = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::RefundExceedsSale { .. })));
        assert_eq!(
            err.to_string(),
            "Refund amount ৳2450.00 exceeds refundable amount ৳350.00"
        );
    }

    #[tokio::test]
    async fn test_transition_guards() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;
        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap();
        let id = created.refund_id.as_str();

        let err = db.refunds().process(id, None, &manager()).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot process unapproved refund");

        let err = db
            .refunds()
            .complete(id, &Completion::default(), &manager())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot complete refund with status: pending");

        db.refunds().approve(id, Some("Checked"), &manager()).await.unwrap();
        let err = db.refunds().approve(id, None, &manager()).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot approve refund with status: approved");

        db.refunds().reject(id, "Worn item", &manager()).await.unwrap();
        let refund = db.refunds().get(id).await.unwrap().unwrap();
        assert_eq!(refund.status, RefundStatus::Rejected);
        assert_eq!(refund.approval_status, ApprovalStatus::Rejected);
        assert_eq!(refund.internal_notes.as_deref(), Some("Worn item"));

        let err = db.refunds().reject(id, "again", &manager()).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot reject refund with status: rejected");

        // The rejected refund no longer holds the quantity
        db.refunds()
            .create(&request(&sale.id, vec![line("nida", 2, 2450)], true), &manager())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_complete_undoes_sale() {
        let db = test_db().await;
        let sale = sold(&db, 10).await;
        // 5250 taka earned 52 points, balance 62
        assert_eq!(
            db.customers().get("cust-nusrat").await.unwrap().unwrap().loyalty_points,
            62
        );

        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 2, 2450)], true), &manager())
            .await
            .unwrap();
        let id = created.refund_id.as_str();
        db.refunds().approve(id, None, &manager()).await.unwrap();

        let details = RefundDetails {
            transaction_id: Some("BK12345".into()),
            phone_number: Some("01711000000".into()),
            ..RefundDetails::default()
        };
        db.refunds().process(id, Some(&details), &manager()).await.unwrap();

        let completion = Completion {
            return_condition: Some("unworn".into()),
            inspection_notes: Some("Tags attached".into()),
        };
        let done = db.refunds().complete(id, &completion, &manager()).await.unwrap();
        assert_eq!(done.restocked_items, 1);
        assert_eq!(done.points_reversed, 52);
        assert!(done.message.contains("Return condition: unworn"));

        let refund = db.refunds().get(id).await.unwrap().unwrap();
        assert_eq!(refund.status, RefundStatus::Completed);
        assert!(refund.is_returned);
        assert_eq!(refund.payment_details.transaction_id.as_deref(), Some("BK12345"));

        let sale = db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Cancelled);

        // Sold 2 of 5, 2 came back
        let nida = db.products().get_by_id("nida").await.unwrap().unwrap();
        assert_eq!(nida.current_stock, 5);
        assert_eq!(db.products().branch_stock("nida", &gulshan().id).await.unwrap(), 5);
        let movements = db.products().movements("nida").await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!((movements[0].previous_stock, movements[0].new_stock), (3, 5));
        assert_eq!(movements[0].reference, refund.refund_number);

        // Hijab was not on the refund
        let hijab = db.products().get_by_id("hijab").await.unwrap().unwrap();
        assert_eq!(hijab.current_stock, 9);

        let cust = db.customers().get("cust-nusrat").await.unwrap().unwrap();
        assert_eq!(cust.loyalty_points, 10);
        let ledger = db.customers().points_transactions("cust-nusrat").await.unwrap();
        assert_eq!(ledger[0].transaction_type, PointsTransactionType::Refund);
        assert_eq!(ledger[0].points, -52);

        let actions: Vec<AuditAction> = db
            .refunds()
            .audit_trail(id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Completed,
                AuditAction::Processed,
                AuditAction::Approved,
                AuditAction::Created
            ]
        );

        let err = db
            .refunds()
            .complete(id, &Completion::default(), &manager())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidRefundState { .. })));
    }

    #[tokio::test]
    async fn test_complete_without_restock_and_floor_points() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;

        // Customer spent most of the points already
        sqlx::query("UPDATE customers SET loyalty_points = 20 WHERE id = 'cust-nusrat'")
            .execute(db.pool())
            .await
            .unwrap();

        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], false), &manager())
            .await
            .unwrap();
        let id = created.refund_id.as_str();
        db.refunds().approve(id, None, &manager()).await.unwrap();
        db.refunds().process(id, None, &manager()).await.unwrap();
        let done = db
            .refunds()
            .complete(id, &Completion::default(), &manager())
            .await
            .unwrap();

        assert_eq!(done.restocked_items, 0);
        assert_eq!(done.points_reversed, 52);
        assert!(done.message.contains("Return condition: Not specified"));

        let nida = db.products().get_by_id("nida").await.unwrap().unwrap();
        assert_eq!(nida.current_stock, 3);
        let cust = db.customers().get("cust-nusrat").await.unwrap().unwrap();
        assert_eq!(cust.loyalty_points, 0);
    }

    #[tokio::test]
    async fn test_second_completion_on_sale_keeps_other_points() {
        let db = test_db().await;
        let sale = sold(&db, 100).await;
        // 5250 taka earned 52 points
        assert_eq!(
            db.customers().get("cust-nusrat").await.unwrap().unwrap().loyalty_points,
            152
        );

        let mut reversed = Vec::new();
        for _ in 0..2 {
            let created = db
                .refunds()
                .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
                .await
                .unwrap();
            let id = created.refund_id.as_str();
            db.refunds().approve(id, None, &manager()).await.unwrap();
            db.refunds().process(id, None, &manager()).await.unwrap();
            let done = db
                .refunds()
                .complete(id, &Completion::default(), &manager())
                .await
                .unwrap();
            reversed.push(done.points_reversed);
        }

        assert_eq!(reversed, vec![52, 0]);
        let cust = db.customers().get("cust-nusrat").await.unwrap().unwrap();
        assert_eq!(cust.loyalty_points, 100);

        let refunds: Vec<i64> = db
            .customers()
            .points_transactions("cust-nusrat")
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.transaction_type == PointsTransactionType::Refund)
            .map(|t| t.points)
            .collect();
        assert_eq!(refunds, vec![-52]);

        let nida = db.products().get_by_id("nida").await.unwrap().unwrap();
        assert_eq!(nida.current_stock, 5);
    }

    #[tokio::test]
    async fn test_discount_and_tax_reversal_entries() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;
        sqlx::query("UPDATE sales SET discount_paisa = 10000, tax_paisa = 5000 WHERE id = ?1")
            .bind(&sale.id)
            .execute(db.pool())
            .await
            .unwrap();

        let created = db
            .refunds()
            .create(&request(&sale.id, vec![line("hijab", 1, 350)], true), &manager())
            .await
            .unwrap();
        let id = created.refund_id.as_str();
        db.refunds().approve(id, None, &manager()).await.unwrap();
        db.refunds().process(id, None, &manager()).await.unwrap();
        db.refunds()
            .complete(id, &Completion::default(), &manager())
            .await
            .unwrap();

        let trail = db.refunds().audit_trail(id).await.unwrap();
        let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
        assert_eq!(
            &actions[..3],
            &[
                AuditAction::Completed,
                AuditAction::TaxReversal,
                AuditAction::DiscountReversal
            ]
        );
        assert_eq!(
            trail[2].notes.as_deref(),
            Some("Discount reversal: ৳100.00 (included in refund of ৳350.00)")
        );
        // Reversal entries record the status the refund actually left
        for entry in &trail[..3] {
            assert_eq!(entry.previous_status.as_deref(), Some("processed"));
            assert_eq!(entry.new_status, "completed");
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_statistics() {
        let db = test_db().await;
        let sale = sold(&db, 0).await;

        let first = db
            .refunds()
            .create(&request(&sale.id, vec![line("nida", 1, 2450)], true), &manager())
            .await
            .unwrap();
        db.refunds()
            .create(&request(&sale.id, vec![line("hijab", 1, 350)], true), &manager())
            .await
            .unwrap();
        db.refunds().reject(&first.refund_id, "Worn", &manager()).await.unwrap();

        let all = db.refunds().list(None, None, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        let rejected = db
            .refunds()
            .list(Some(&gulshan().id), Some(RefundStatus::Rejected), 100)
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(db.refunds().list(None, None, 1).await.unwrap().len(), 1);

        let stats = db.refunds().statistics(&StatisticsFilter::default()).await.unwrap();
        assert_eq!(stats.total_refunds, 2);
        assert_eq!(stats.total_refund_amount_paisa, Money::from_taka(2800).paisa());
        assert_eq!(stats.by_status.rejected, 1);
        assert_eq!(stats.pending_approval, 1);
        assert_eq!(stats.by_method["cash"], 2);
    }
}
