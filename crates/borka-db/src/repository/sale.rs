//! # Sale Repository
//!
//! Recording sales at the till and reading them back for refunds.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  record_sale (one transaction)                          │
//! │                                                                         │
//! │  1. VALIDATE   lines, branch, customer, products active                │
//! │  2. STOCK      branch + store-wide counters cover each product         │
//! │  3. PRICE      subtotal ─► coupon ─► tax ─► total  (SaleTotals)        │
//! │  4. WRITE      sales row, sale_items (name + price frozen)             │
//! │  5. INVENTORY  both counters down, `out` movement per line             │
//! │  6. COUPON     usage_count + 1                                         │
//! │  7. LOYALTY    purchase points + balance, when a customer is attached  │
//! │                                                                         │
//! │  Any error ──► transaction dropped ──► nothing was written             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use borka_core::validation::{sum_amounts, validate_amount_paisa, validate_new_sale};
use borka_core::{
    CoreError, LoyaltyProgram, Money, MovementType, NewSale, PointsTransaction,
    PointsTransactionType, Product, Sale, SaleItem, SaleStatus, SaleTotals, User,
    ValidationError,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use super::{customer, discount, new_id, product, reference, short_suffix};
use crate::error::DbResult;

/// Store-wide settings used when pricing a sale.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaleSettings {
    pub tax_rate_bps: u32,
    pub loyalty: LoyaltyProgram,
}

/// A recorded sale with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub points_awarded: i64,
}

pub(crate) async fn fetch_sale<'e>(exec: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(sale)
}

pub(crate) async fn fetch_items<'e>(
    exec: impl SqliteExecutor<'e>,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY rowid",
    )
    .bind(sale_id)
    .fetch_all(exec)
    .await?;
    Ok(items)
}

pub(crate) async fn cancel_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(sale_id)
        .bind(SaleStatus::Cancelled)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        fetch_sale(&self.pool, id).await
    }

    /// Gets all items for a sale.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        fetch_items(&self.pool, sale_id).await
    }

    /// Recent sales, newest first.
    pub async fn list(&self, branch_id: Option<&str>, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE (?1 IS NULL OR branch_id = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Records a completed sale. See the module docs for the steps.
    pub async fn record_sale(
        &self,
        new_sale: &NewSale,
        actor: &User,
        settings: &SaleSettings,
    ) -> DbResult<RecordedSale> {
        validate_new_sale(new_sale)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let branch = reference::fetch_branch(&mut *tx, &new_sale.branch_id)
            .await?
            .ok_or_else(|| CoreError::BranchNotFound(new_sale.branch_id.clone()))?;

        let customer = match &new_sale.customer_id {
            Some(id) => Some(
                customer::fetch_customer(&mut *tx, id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?,
            ),
            None => None,
        };

        // Resolve products and check stock per product across all lines
        let mut products: HashMap<String, Product> = HashMap::new();
        let mut wanted: HashMap<String, i64> = HashMap::new();
        for line in &new_sale.items {
            if !products.contains_key(&line.product_id) {
                let product = product::fetch_product(&mut *tx, &line.product_id)
                    .await?
                    .filter(|p| p.is_active)
                    .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
                products.insert(line.product_id.clone(), product);
            }
            *wanted.entry(line.product_id.clone()).or_default() += line.quantity;
        }

        for (product_id, qty) in &wanted {
            let product = &products[product_id];
            let at_branch = product::fetch_branch_stock(&mut *tx, product_id, &branch.id).await?;
            let available = at_branch.min(product.current_stock);
            if *qty > available {
                return Err(CoreError::InsufficientStock {
                    sku: product.sku.clone(),
                    available: available.max(0),
                    requested: *qty,
                }
                .into());
            }
        }

        let sale_id = new_id();
        let items = new_sale
            .items
            .iter()
            .map(|line| {
                let product = &products[&line.product_id];
                let line_total = product
                    .price()
                    .checked_multiply_quantity(line.quantity)
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: format!("line total of {}", product.sku),
                        min: 0,
                        max: i64::MAX,
                    })?;
                Ok(SaleItem {
                    id: new_id(),
                    sale_id: sale_id.clone(),
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                    unit_price_paisa: product.price_paisa,
                    line_total_paisa: line_total.paisa(),
                })
            })
            .collect::<Result<Vec<SaleItem>, ValidationError>>()?;

        let line_totals: Vec<Money> = items
            .iter()
            .map(|i| Money::from_paisa(i.line_total_paisa))
            .collect();
        let subtotal = sum_amounts("subtotal", line_totals.iter().copied())?;
        validate_amount_paisa("subtotal", subtotal.paisa())?;

        let coupon = match &new_sale.discount_code {
            Some(code) => {
                let coupon = discount::fetch_by_code(&mut *tx, code).await?.ok_or_else(|| {
                    CoreError::DiscountNotApplicable {
                        code: code.clone(),
                        reason: "unknown code".to_string(),
                    }
                })?;
                let amount = coupon.amount_for(subtotal, now)?;
                Some((coupon, amount))
            }
            None => None,
        };

        let discount_amount = coupon.as_ref().map(|(_, a)| *a).unwrap_or_default();
        let totals = SaleTotals::compute(line_totals, discount_amount, settings.tax_rate_bps);

        let paid = new_sale
            .paid_paisa
            .map(Money::from_paisa)
            .unwrap_or(totals.total);
        if paid < totals.total {
            return Err(ValidationError::OutOfRange {
                field: "paid amount".to_string(),
                min: totals.total.paisa(),
                max: i64::MAX,
            }
            .into());
        }

        let sale = Sale {
            id: sale_id.clone(),
            sale_number: format!("SALE-{}-{}", now.format("%Y%m%d"), short_suffix()),
            branch_id: branch.id.clone(),
            branch_name: branch.name.clone(),
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            customer_name: customer.as_ref().map(|c| c.name.clone()),
            subtotal_paisa: totals.subtotal.paisa(),
            discount_paisa: totals.discount.paisa(),
            tax_paisa: totals.tax.paisa(),
            total_paisa: totals.total.paisa(),
            paid_paisa: paid.paisa(),
            payment_method: new_sale.payment_method,
            status: SaleStatus::Completed,
            discount_code: coupon.as_ref().map(|(c, _)| c.code.clone()),
            cashier_id: actor.id.clone(),
            cashier_name: actor.display_name().to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");
        insert_sale(&mut tx, &sale).await?;

        for item in &items {
            insert_item(&mut tx, item).await?;

            let stock = product::adjust_stock(&mut tx, &item.product_id, &branch.id, -item.quantity).await?;
            let movement = product::movement(
                &products[&item.product_id],
                (&branch.id, &branch.name),
                MovementType::Out,
                item.quantity,
                "Sale",
                &sale.sale_number,
                (&actor.id, actor.display_name()),
                stock,
            );
            product::insert_movement(&mut tx, &movement).await?;
        }

        if let Some((coupon, _)) = &coupon {
            discount::increment_usage(&mut tx, &coupon.id).await?;
        }

        let mut points_awarded = 0;
        if let Some(customer) = &customer {
            points_awarded = settings.loyalty.points_for_purchase(totals.total);
            if points_awarded > 0 {
                let entry = PointsTransaction {
                    id: new_id(),
                    customer_id: customer.id.clone(),
                    customer_name: customer.name.clone(),
                    transaction_type: PointsTransactionType::Purchase,
                    points: points_awarded,
                    description: format!("Points earned on sale #{}", sale.sale_number),
                    reference_id: Some(sale.id.clone()),
                    branch_id: Some(branch.id.clone()),
                    branch_name: Some(branch.name.clone()),
                    created_by: actor.id.clone(),
                    notes: None,
                    created_at: now,
                };
                customer::insert_points_transaction(&mut tx, &entry).await?;
                customer::set_points_balance(
                    &mut tx,
                    &customer.id,
                    customer.loyalty_points + points_awarded,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_number = %sale.sale_number,
            total = %totals.total,
            lines = items.len(),
            points_awarded,
            "Sale recorded"
        );

        Ok(RecordedSale {
            sale,
            items,
            points_awarded,
        })
    }
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_number, branch_id, branch_name, customer_id, customer_name,
            subtotal_paisa, discount_paisa, tax_paisa, total_paisa, paid_paisa,
            payment_method, status, discount_code, cashier_id, cashier_name,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15, ?16,
            ?17, ?18
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.sale_number)
    .bind(&sale.branch_id)
    .bind(&sale.branch_name)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(sale.subtotal_paisa)
    .bind(sale.discount_paisa)
    .bind(sale.tax_paisa)
    .bind(sale.total_paisa)
    .bind(sale.paid_paisa)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(&sale.discount_code)
    .bind(&sale.cashier_id)
    .bind(&sale.cashier_name)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Snapshot pattern: product name and price are copied to the line so the
/// sale reads the same after the product changes.
async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name, size,
            quantity, unit_price_paisa, line_total_paisa
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.size)
    .bind(item.quantity)
    .bind(item.unit_price_paisa)
    .bind(item.line_total_paisa)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{abaya, customer, gulshan, manager, seed, test_db};
    use crate::DbError;
    use borka_core::{Discount, DiscountKind, NewSaleItem, PaymentMethod};
    use chrono::Duration;

    fn new_sale(lines: &[(&str, i64)], customer_id: Option<&str>) -> NewSale {
        NewSale {
            branch_id: gulshan().id,
            customer_id: customer_id.map(str::to_string),
            items: lines
                .iter()
                .map(|(id, qty)| NewSaleItem {
                    product_id: id.to_string(),
                    quantity: *qty,
                    size: Some("56".into()),
                })
                .collect(),
            payment_method: PaymentMethod::Cash,
            paid_paisa: None,
            discount_code: None,
        }
    }

    #[tokio::test]
    async fn test_record_sale_updates_stock_and_points() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2450, 5), abaya("hijab", 350, 10)]).await;
        db.customers().insert(&customer(3)).await.unwrap();

        let recorded = db
            .sales()
            .record_sale(
                &new_sale(&[("nida", 2), ("hijab", 1)], Some("cust-nusrat")),
                &manager(),
                &SaleSettings::default(),
            )
            .await
            .unwrap();

        assert_eq!(recorded.sale.total(), Money::from_taka(5250));
        assert_eq!(recorded.sale.paid(), Money::from_taka(5250));
        assert_eq!(recorded.items.len(), 2);
        assert_eq!(recorded.points_awarded, 52);
        assert!(recorded.sale.sale_number.starts_with("SALE-"));

        let nida = db.products().get_by_id("nida").await.unwrap().unwrap();
        assert_eq!(nida.current_stock, 3);
        assert_eq!(db.products().branch_stock("nida", &gulshan().id).await.unwrap(), 3);

        let movements = db.products().movements("nida").await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!((movements[0].previous_stock, movements[0].new_stock), (5, 3));

        let cust = db.customers().get("cust-nusrat").await.unwrap().unwrap();
        assert_eq!(cust.loyalty_points, 55);

        let stored = db.sales().items(&recorded.sale.id).await.unwrap();
        assert_eq!(stored[0].product_name, "Abaya nida");
        assert_eq!(db.sales().list(None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2450, 1)]).await;

        let err = db
            .sales()
            .record_sale(&new_sale(&[("nida", 1), ("nida", 1)], None), &manager(), &SaleSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            })
        ));

        assert!(db.sales().list(None, 10).await.unwrap().is_empty());
        let nida = db.products().get_by_id("nida").await.unwrap().unwrap();
        assert_eq!(nida.current_stock, 1);
    }

    #[tokio::test]
    async fn test_overflowing_line_total_rejected() {
        let db = test_db().await;
        let mut gown = abaya("gown", 0, 5);
        gown.price_paisa = i64::MAX / 2 + 1;
        seed(&db, &[gown]).await;

        let err = db
            .sales()
            .record_sale(&new_sale(&[("gown", 2)], None), &manager(), &SaleSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(db.sales().list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coupon_and_tax() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2000, 5)]).await;
        let now = Utc::now();
        db.discounts()
            .insert(&Discount {
                id: "d1".into(),
                code: "EID10".into(),
                name: "Eid".into(),
                kind: DiscountKind::Percentage,
                value: 1000,
                min_purchase_paisa: None,
                max_discount_paisa: None,
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(1),
                usage_limit: None,
                usage_count: 0,
                is_active: true,
            })
            .await
            .unwrap();

        let mut sale = new_sale(&[("nida", 1)], None);
        sale.discount_code = Some("eid10".into());
        let settings = SaleSettings {
            tax_rate_bps: 500,
            ..SaleSettings::default()
        };
        let recorded = db.sales().record_sale(&sale, &manager(), &settings).await.unwrap();

        assert_eq!(recorded.sale.discount(), Money::from_taka(200));
        assert_eq!(recorded.sale.tax(), Money::from_taka(90));
        assert_eq!(recorded.sale.total(), Money::from_taka(1890));
        assert_eq!(recorded.sale.discount_code.as_deref(), Some("EID10"));
        assert_eq!(recorded.points_awarded, 0);

        let coupon = db.discounts().get_by_code("EID10").await.unwrap().unwrap();
        assert_eq!(coupon.usage_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_references() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2000, 5)]).await;

        let err = db
            .sales()
            .record_sale(&new_sale(&[("ghost", 1)], None), &manager(), &SaleSettings::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = db
            .sales()
            .record_sale(&new_sale(&[("nida", 1)], Some("nobody")), &manager(), &SaleSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::CustomerNotFound(_))));

        let mut underpaid = new_sale(&[("nida", 1)], None);
        underpaid.paid_paisa = Some(100);
        let err = db
            .sales()
            .record_sale(&underpaid, &manager(), &SaleSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }
}
