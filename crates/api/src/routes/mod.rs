//! HTTP route handlers.

use std::sync::Arc;

use common::AggregateId;
use coordinator::ReconciliationCoordinator;
use domain::EntryId;
use event_store::EventStore;
use projections::{ProjectionProcessor, QueryFacade};

use crate::error::ApiError;

pub mod customers;
pub mod health;
pub mod leave;
pub mod metrics;
pub mod production;
pub mod products;
pub mod returns;
pub mod sales;
pub mod storage;
pub mod workers;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub coordinator: ReconciliationCoordinator<S>,
    pub facade: QueryFacade,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

/// Runs projection catch-up so list handlers read the latest events.
pub(crate) async fn refresh_views<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
) -> Result<(), ApiError> {
    state
        .projection_processor
        .run_catch_up()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub(crate) fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(AggregateId::from(uuid))
}

pub(crate) fn parse_entry_id(id: &str) -> Result<EntryId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(EntryId::from_uuid(uuid))
}
