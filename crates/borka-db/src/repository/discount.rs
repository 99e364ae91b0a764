//! Coupon storage. Pricing rules live in `borka_core::discount`.

use borka_core::Discount;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

pub(crate) async fn fetch_by_code<'e>(
    exec: impl SqliteExecutor<'e>,
    code: &str,
) -> DbResult<Option<Discount>> {
    let discount = sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE code = ?1")
        .bind(code.trim().to_uppercase())
        .fetch_optional(exec)
        .await?;
    Ok(discount)
}

pub(crate) async fn increment_usage(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("UPDATE discounts SET usage_count = usage_count + 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Codes are stored upper-case; lookup ignores case.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        fetch_by_code(&self.pool, code).await
    }

    pub async fn insert(&self, discount: &Discount) -> DbResult<()> {
        debug!(code = %discount.code, "Inserting discount");

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, name, kind, value,
                min_purchase_paisa, max_discount_paisa,
                starts_at, ends_at, usage_limit, usage_count, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&discount.id)
        .bind(discount.code.trim().to_uppercase())
        .bind(&discount.name)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(discount.min_purchase_paisa)
        .bind(discount.max_discount_paisa)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.usage_limit)
        .bind(discount.usage_count)
        .bind(discount.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
