//! Read models and query facade for the factory ledger.
//!
//! This crate provides the query side of the ledger:
//! - [`Projection`] trait for folding events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - Six read model views (stock levels, customer balances, sales ledger,
//!   production log, returns ledger, leave board)
//! - [`QueryFacade`] bundling the views with the reference-data registries

pub mod error;
pub mod facade;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use facade::{CustomerAccountRow, LeaveDayBoard, QueryFacade, StorageRow};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{
    BalanceRow, CustomerBalancesView, LeaveBoardView, LeaveRow, ProductionLogView,
    ProductionRow, ReturnRow, ReturnsLedgerView, SaleRow, SalesLedgerView, StockLevel,
    StockLevelsView,
};
