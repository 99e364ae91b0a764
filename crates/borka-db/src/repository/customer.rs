//! # Customer Repository
//!
//! Customers and their loyalty ledger.
//!
//! The balance on `customers.loyalty_points` is the running total; every
//! change also writes a `points_transactions` row so reversals can find the
//! points a sale earned.

use borka_core::{Customer, PointsTransaction};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

pub(crate) async fn fetch_customer<'e>(
    exec: impl SqliteExecutor<'e>,
    id: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, name, phone, loyalty_points, created_at FROM customers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(customer)
}

pub(crate) async fn fetch_points_for_sale<'e>(
    exec: impl SqliteExecutor<'e>,
    customer_id: &str,
    sale_id: &str,
) -> DbResult<Vec<PointsTransaction>> {
    let transactions = sqlx::query_as::<_, PointsTransaction>(
        "SELECT * FROM points_transactions WHERE customer_id = ?1 AND reference_id = ?2",
    )
    .bind(customer_id)
    .bind(sale_id)
    .fetch_all(exec)
    .await?;
    Ok(transactions)
}

pub(crate) async fn insert_points_transaction(
    conn: &mut SqliteConnection,
    tx: &PointsTransaction,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO points_transactions (
            id, customer_id, customer_name, transaction_type, points,
            description, reference_id, branch_id, branch_name,
            created_by, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&tx.id)
    .bind(&tx.customer_id)
    .bind(&tx.customer_name)
    .bind(tx.transaction_type)
    .bind(tx.points)
    .bind(&tx.description)
    .bind(&tx.reference_id)
    .bind(&tx.branch_id)
    .bind(&tx.branch_name)
    .bind(&tx.created_by)
    .bind(&tx.notes)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn set_points_balance(
    conn: &mut SqliteConnection,
    customer_id: &str,
    balance: i64,
) -> DbResult<()> {
    sqlx::query("UPDATE customers SET loyalty_points = ?2 WHERE id = ?1")
        .bind(customer_id)
        .bind(balance)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        fetch_customer(&self.pool, id).await
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, loyalty_points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.loyalty_points)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loyalty ledger, newest first.
    pub async fn points_transactions(&self, customer_id: &str) -> DbResult<Vec<PointsTransaction>> {
        let transactions = sqlx::query_as::<_, PointsTransaction>(
            r#"
            SELECT * FROM points_transactions
            WHERE customer_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{customer, test_db};
    use borka_core::PointsTransactionType;
    use chrono::Utc;

    #[tokio::test]
    async fn test_customer_ledger() {
        let db = test_db().await;
        db.customers().insert(&customer(10)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let entry = PointsTransaction {
            id: "pt-1".into(),
            customer_id: "cust-nusrat".into(),
            customer_name: "Nusrat Jahan".into(),
            transaction_type: PointsTransactionType::Purchase,
            points: 24,
            description: "Points earned".into(),
            reference_id: Some("sale-1".into()),
            branch_id: None,
            branch_name: None,
            created_by: "user-manager".into(),
            notes: None,
            created_at: Utc::now(),
        };
        insert_points_transaction(&mut conn, &entry).await.unwrap();
        set_points_balance(&mut conn, "cust-nusrat", 34).await.unwrap();

        let for_sale = fetch_points_for_sale(&mut *conn, "cust-nusrat", "sale-1").await.unwrap();
        assert_eq!(for_sale.len(), 1);
        drop(conn);

        let stored = db.customers().get("cust-nusrat").await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 34);

        let ledger = db.customers().points_transactions("cust-nusrat").await.unwrap();
        assert_eq!(ledger[0].points, 24);
        assert_eq!(ledger[0].transaction_type, PointsTransactionType::Purchase);
    }
}
