//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::balance::BalanceError;
use crate::leave::LeaveError;
use crate::registry::RegistryError;
use crate::stock::StockError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// An error occurred in the stock record aggregate.
    #[error("Stock error: {0}")]
    Stock(#[from] StockError),

    /// An error occurred in the customer balance aggregate.
    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    /// An error occurred in the leave account aggregate.
    #[error("Leave error: {0}")]
    Leave(#[from] LeaveError),

    /// An error occurred in a reference-data registry.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
