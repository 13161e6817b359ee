//! Coordinator error types.

use common::AggregateId;
use domain::{BalanceError, DomainError, EntryId, LeaveError, RegistryError, StockError};
use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can occur while coordinating a ledger mutation.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Another mutation holds a lock on one of the involved aggregates
    /// and did not release it within the wait window.
    #[error("Aggregate {aggregate_id} is busy, retry later")]
    Busy { aggregate_id: AggregateId },

    /// The referenced ledger entry does not exist.
    #[error("Entry not found: {0}")]
    UnknownEntry(EntryId),

    /// The customer still has recorded sales or returns and cannot be removed.
    #[error("Customer {0} has recorded sales or returns")]
    CustomerInUse(AggregateId),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StockError> for CoordinatorError {
    fn from(e: StockError) -> Self {
        CoordinatorError::Domain(DomainError::Stock(e))
    }
}

impl From<BalanceError> for CoordinatorError {
    fn from(e: BalanceError) -> Self {
        CoordinatorError::Domain(DomainError::Balance(e))
    }
}

impl From<LeaveError> for CoordinatorError {
    fn from(e: LeaveError) -> Self {
        CoordinatorError::Domain(DomainError::Leave(e))
    }
}

impl From<RegistryError> for CoordinatorError {
    fn from(e: RegistryError) -> Self {
        CoordinatorError::Domain(DomainError::Registry(e))
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
