//! # Repository Module
//!
//! Database repository implementations for Borka POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.refunds().complete(id, completion, &actor)                 │
//! │       ▼                                                                 │
//! │  RefundRepository                                                      │
//! │  ├── pool.begin()          ← one transaction per mutation              │
//! │  ├── borka-core rules      ← pure checks, no SQL                       │
//! │  ├── row helpers (&mut tx) ← shared with other repositories            │
//! │  └── tx.commit()           ← or drop = rollback on any error           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row helpers take any `SqliteExecutor`, so the same query runs against the
//! pool for reads and against `&mut *tx` inside a workflow.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`], [`BranchRepository`] - Reference data
//! - [`ProductRepository`] - Products and per-branch stock
//! - [`CustomerRepository`] - Customers and their loyalty ledger
//! - [`DiscountRepository`] - Coupons
//! - [`SaleRepository`] - Recording and reading sales
//! - [`RefundRepository`] - The refund / undo-sale workflow
//! - [`PolicyRepository`] - Per-branch refund policy

pub mod customer;
pub mod discount;
pub mod policy;
pub mod product;
pub mod reference;
pub mod refund;
pub mod sale;

pub use customer::CustomerRepository;
pub use discount::DiscountRepository;
pub use policy::{PolicyRepository, PolicySaved};
pub use product::ProductRepository;
pub use reference::{BranchRepository, UserRepository};
pub use refund::{Completion, CompletedRefund, CreatedRefund, RefundRepository};
pub use sale::{RecordedSale, SaleRepository, SaleSettings};

use uuid::Uuid;

/// New row ID.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Short uppercase suffix for human-facing numbers (sale / refund numbers).
pub(crate) fn short_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}
