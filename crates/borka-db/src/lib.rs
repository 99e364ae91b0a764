//! # borka-db: Database Layer for Borka POS
//!
//! SQLite storage for the shop: reference data, inventory, sales, loyalty,
//! coupons and the refund / undo-sale workflow.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Borka POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /api/refunds/:id/complete)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     borka-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (refund.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ RefundRepo    │    │ 0001_initial │  │   │
//! │  │   │ Connection    │◄───│ SaleRepo      │    │ _schema.sql  │  │   │
//! │  │   │ Management    │    │ PolicyRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/borka/borka.db (or sqlite::memory: in tests)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded schema and the refund table check
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (refund, sale, policy, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use borka_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("borka.db")).await?;
//!
//! let created = db.refunds().create(&request, &cashier).await?;
//! db.refunds().approve(&created.refund_id, None, &manager).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::SchemaStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    BranchRepository, Completion, CompletedRefund, CreatedRefund, CustomerRepository,
    DiscountRepository, PolicyRepository, PolicySaved, ProductRepository, RecordedSale,
    RefundRepository, SaleRepository, SaleSettings, UserRepository,
};
