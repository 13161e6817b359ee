//! Reconciliation coordination for the factory ledger.
//!
//! This crate provides the single write path for ledger mutations:
//! - ReconciliationCoordinator, which runs every cross-stream mutation
//! - AggregateLocks, the per-aggregate lock registry behind it
//! - EntryIndex, resolving entry ids back to their aggregates

pub mod coordinator;
pub mod error;
pub mod index;
pub mod locks;

pub use coordinator::{
    LeaveReceipt, ProductionReceipt, ReconciliationCoordinator, ReturnReceipt, SaleReceipt,
    StockReceipt,
};
pub use error::{CoordinatorError, Result};
pub use index::{EntryIndex, ProductionRef, SaleRef};
pub use locks::{AggregateLocks, LockSet};
