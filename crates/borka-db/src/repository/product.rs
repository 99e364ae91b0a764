//! # Product Repository
//!
//! Database operations for products and their stock counters.
//!
//! ## Two Stock Counters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where Stock Lives                                    │
//! │                                                                         │
//! │  products.current_stock          store-wide counter                    │
//! │  branch_stock.current_stock      one row per (product, branch)         │
//! │                                                                         │
//! │  Sale  ──► both decremented, `out` movement                            │
//! │  Undo  ──► both incremented, `in` movement, product re-activated       │
//! │                                                                         │
//! │  Every change writes a stock_movements row with the real previous      │
//! │  and new store-wide values.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use borka_core::{MovementType, Product, StockMovement};
use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, sku, name, category, price_paisa, current_stock, is_active, created_at, updated_at";

// =============================================================================
// Row Helpers
// =============================================================================

pub(crate) async fn fetch_product<'e>(
    exec: impl SqliteExecutor<'e>,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(product)
}

/// Branch counter; a missing row means nothing stocked there.
pub(crate) async fn fetch_branch_stock<'e>(
    exec: impl SqliteExecutor<'e>,
    product_id: &str,
    branch_id: &str,
) -> DbResult<i64> {
    let stock: Option<i64> = sqlx::query_scalar(
        "SELECT current_stock FROM branch_stock WHERE product_id = ?1 AND branch_id = ?2",
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_optional(exec)
    .await?;
    Ok(stock.unwrap_or(0))
}

/// Moves both stock counters by `delta` and returns the store-wide
/// `(previous, new)` values.
///
/// A positive delta re-activates the product.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    delta: i64,
) -> DbResult<(i64, i64)> {
    let now = Utc::now();

    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products SET
            current_stock = current_stock + ?2,
            is_active = CASE WHEN ?2 > 0 THEN 1 ELSE is_active END,
            updated_at = ?3
        WHERE id = ?1
        RETURNING current_stock
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let new_stock = new_stock.ok_or_else(|| DbError::not_found("Product", product_id))?;

    sqlx::query(
        r#"
        INSERT INTO branch_stock (product_id, branch_id, current_stock)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (product_id, branch_id)
        DO UPDATE SET current_stock = current_stock + excluded.current_stock
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    debug!(product_id, branch_id, delta, new_stock, "Stock adjusted");

    Ok((new_stock - delta, new_stock))
}

pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, product_name, branch_id, branch_name,
            movement_type, quantity, reason, reference,
            user_id, user_name, previous_stock, new_stock, notes, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14, ?15
        )
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(&movement.product_name)
    .bind(&movement.branch_id)
    .bind(&movement.branch_name)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.reference)
    .bind(&movement.user_id)
    .bind(&movement.user_name)
    .bind(movement.previous_stock)
    .bind(movement.new_stock)
    .bind(&movement.notes)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// // Till search
/// let results = repo.list_active(Some("nida"), 20).await?;
///
/// // Get by ID
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Active products, optionally filtered by name / SKU / category.
    ///
    /// ## Arguments
    /// * `query` - Substring to match (case-insensitive for ASCII)
    /// * `limit` - Maximum results to return
    pub async fn list_active(&self, query: Option<&str>, limit: i64) -> DbResult<Vec<Product>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));

        debug!(?pattern, limit, "Listing active products");

        let sql = format!(
            r#"
            SELECT {} FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR name LIKE ?1 OR sku LIKE ?1 OR category LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#,
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a product by SKU (exact match).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE sku = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category, price_paisa,
                current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_paisa)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Stock of a product at one branch.
    pub async fn branch_stock(&self, product_id: &str, branch_id: &str) -> DbResult<i64> {
        fetch_branch_stock(&self.pool, product_id, branch_id).await
    }

    /// Sets the branch counter (stock count / receiving).
    pub async fn set_branch_stock(
        &self,
        product_id: &str,
        branch_id: &str,
        stock: i64,
    ) -> DbResult<()> {
        debug!(product_id, branch_id, stock, "Setting branch stock");

        sqlx::query(
            r#"
            INSERT INTO branch_stock (product_id, branch_id, current_stock)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (product_id, branch_id)
            DO UPDATE SET current_stock = excluded.current_stock
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Movement history of a product, newest first.
    pub async fn movements(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Builds a movement row for a stock change.
#[allow(clippy::too_many_arguments)]
pub(crate) fn movement(
    product: &Product,
    branch: (&str, &str),
    movement_type: MovementType,
    quantity: i64,
    reason: &str,
    reference: &str,
    user: (&str, &str),
    stock: (i64, i64),
) -> StockMovement {
    StockMovement {
        id: super::new_id(),
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        branch_id: branch.0.to_string(),
        branch_name: branch.1.to_string(),
        movement_type,
        quantity,
        reason: reason.to_string(),
        reference: reference.to_string(),
        user_id: user.0.to_string(),
        user_name: user.1.to_string(),
        previous_stock: stock.0,
        new_stock: stock.1,
        notes: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{abaya, gulshan, seed, test_db};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2450, 5), abaya("jersey", 1800, 0)]).await;

        let found = db.products().get_by_sku("ABY-NIDA").await.unwrap().unwrap();
        assert_eq!(found.id, "nida");
        assert_eq!(found.price().taka(), 2450);
        assert!(db.products().get_by_id("missing").await.unwrap().is_none());

        let hits = db.products().list_active(Some("jersey"), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(db.products().list_active(None, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_moves_both_counters() {
        let db = test_db().await;
        seed(&db, &[abaya("nida", 2450, 5)]).await;
        let branch = gulshan();

        let mut conn = db.pool().acquire().await.unwrap();
        let (prev, new) = adjust_stock(&mut conn, "nida", &branch.id, -2).await.unwrap();
        assert_eq!((prev, new), (5, 3));
        let (prev, new) = adjust_stock(&mut conn, "nida", &branch.id, 4).await.unwrap();
        assert_eq!((prev, new), (3, 7));
        drop(conn);

        assert_eq!(db.products().branch_stock("nida", &branch.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_restock_reactivates_product() {
        let db = test_db().await;
        let mut retired = abaya("old", 1000, 0);
        retired.is_active = false;
        seed(&db, &[retired]).await;
        assert!(db.products().list_active(None, 10).await.unwrap().is_empty());

        let mut conn = db.pool().acquire().await.unwrap();
        adjust_stock(&mut conn, "old", &gulshan().id, 1).await.unwrap();
        drop(conn);

        assert_eq!(db.products().list_active(None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_unknown_product() {
        let db = test_db().await;
        seed(&db, &[]).await;
        let mut conn = db.pool().acquire().await.unwrap();
        let err = adjust_stock(&mut conn, "ghost", &gulshan().id, 1).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
