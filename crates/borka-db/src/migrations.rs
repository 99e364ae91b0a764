//! # Schema
//!
//! The SQL under `crates/borka-db/migrations/` is embedded at compile time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0001_initial_schema.sql                                                │
//! │                                                                         │
//! │  reference   users, branches                                             │
//! │  catalogue   products, branch_stock, stock_movements                    │
//! │  loyalty     customers, points_transactions                             │
//! │  selling     discounts, sales, sale_items                               │
//! │  undo sale   refunds, refund_audit, refund_policies                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! After migrating, the refund workflow tables are checked by name. A
//! database created by another build that lacks them is refused at startup
//! instead of failing on the first refund.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Tables the refund workflow writes to in one transaction.
pub const REFUND_TABLES: &[&str] = &[
    "sales",
    "sale_items",
    "products",
    "branch_stock",
    "stock_movements",
    "customers",
    "points_transactions",
    "refunds",
    "refund_audit",
    "refund_policies",
];

/// What the database holds compared with the embedded migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Migrations compiled into this binary.
    pub embedded: usize,
    /// Successfully applied versions, ascending.
    pub applied: Vec<i64>,
    /// Refund workflow tables not found in `sqlite_master`.
    pub missing_tables: Vec<String>,
}

impl SchemaStatus {
    pub fn latest_version(&self) -> Option<i64> {
        self.applied.last().copied()
    }

    /// Every embedded migration applied and every refund table present.
    pub fn is_current(&self) -> bool {
        self.applied.len() == self.embedded && self.missing_tables.is_empty()
    }
}

/// Applies pending migrations, then refuses a schema without the refund tables.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<SchemaStatus> {
    MIGRATOR.run(pool).await?;

    let status = schema_status(pool).await?;
    if !status.missing_tables.is_empty() {
        return Err(DbError::MigrationFailed(format!(
            "refund tables missing after migration: {}",
            status.missing_tables.join(", ")
        )));
    }

    info!(
        version = status.latest_version(),
        applied = status.applied.len(),
        "Schema ready"
    );
    Ok(status)
}

/// Reads applied versions and checks the refund tables.
pub async fn schema_status(pool: &SqlitePool) -> DbResult<SchemaStatus> {
    let applied: Vec<(i64, String)> = sqlx::query_as(
        "SELECT version, description FROM _sqlx_migrations WHERE success = 1 ORDER BY version",
    )
    .fetch_all(pool)
    .await?;
    for (version, description) in &applied {
        debug!(version, %description, "Applied migration");
    }

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;
    let missing_tables = REFUND_TABLES
        .iter()
        .filter(|t| !tables.iter().any(|name| name == *t))
        .map(|t| t.to_string())
        .collect();

    Ok(SchemaStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied.into_iter().map(|(v, _)| v).collect(),
        missing_tables,
    })
}
