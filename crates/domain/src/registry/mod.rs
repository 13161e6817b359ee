//! Reference data registries.
//!
//! Products, customers, and workers are plain rows rather than
//! event-sourced aggregates; the event log tracks the ledger facts that
//! reference them. Each registry enforces its unique field and reports
//! collisions as conflicts.

pub mod customer;
pub mod product;
pub mod worker;

use common::AggregateId;
use thiserror::Error;

pub use customer::{Customer, CustomerDirectory};
pub use product::{NewProduct, Product, ProductCatalog, ProductUpdate};
pub use worker::{Worker, WorkerRoster};

/// Errors that can occur on registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced row does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        kind: &'static str,
        id: AggregateId,
    },

    /// A unique field collided with an existing row.
    #[error("Duplicate {field}: {value}")]
    Duplicate {
        field: &'static str,
        value: String,
    },
}
