//! Domain layer for the factory ledger.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait for event-sourced entities
//! - DomainEvent trait for domain events
//! - CommandHandler for loading aggregates and persisting their events
//! - The stock, balance, and leave aggregates
//! - Reference-data registries (products, customers, workers)

pub mod aggregate;
pub mod balance;
pub mod command;
pub mod error;
pub mod leave;
pub mod registry;
pub mod stock;
pub mod values;

pub use aggregate::{Aggregate, DomainEvent};
pub use balance::{BalanceError, BalanceEvent, CustomerBalance, ReturnLine};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use leave::{LeaveAccount, LeaveError, LeaveEvent, LeaveSpan};
pub use registry::{
    Customer, CustomerDirectory, NewProduct, Product, ProductCatalog, ProductUpdate,
    RegistryError, Worker, WorkerRoster,
};
pub use stock::{SaleLine, StockError, StockEvent, StockRecord};
pub use values::{EntryId, Material, Money, Quantity};
