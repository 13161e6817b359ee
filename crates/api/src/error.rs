//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coordinator::CoordinatorError;
use domain::{BalanceError, DomainError, LeaveError, RegistryError, StockError};
use event_store::EventStoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Coordinator or domain error.
    Coordinator(CoordinatorError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Coordinator(err) => coordinator_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn coordinator_error_to_response(err: CoordinatorError) -> (StatusCode, String) {
    match &err {
        // Safe for the caller to retry once the holder releases the lock.
        CoordinatorError::Busy { .. } => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        CoordinatorError::UnknownEntry(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CoordinatorError::CustomerInUse(_) => (StatusCode::CONFLICT, err.to_string()),
        CoordinatorError::Domain(domain_err) => domain_error_to_response(domain_err, &err),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn domain_error_to_response(domain_err: &DomainError, err: &CoordinatorError) -> (StatusCode, String) {
    let status = match domain_err {
        DomainError::Stock(stock_err) => match stock_err {
            StockError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            StockError::EntryNotFound { .. } | StockError::NotOpen => StatusCode::NOT_FOUND,
            StockError::InsufficientStock { .. }
            | StockError::ConflictingReversal { .. }
            | StockError::AlreadyOpen => StatusCode::CONFLICT,
        },
        DomainError::Balance(balance_err) => match balance_err {
            BalanceError::InvalidAmount { .. } | BalanceError::InvalidWeight { .. } => {
                StatusCode::BAD_REQUEST
            }
            BalanceError::EntryNotFound { .. } => StatusCode::NOT_FOUND,
        },
        DomainError::Leave(leave_err) => match leave_err {
            LeaveError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            LeaveError::EntryNotFound { .. } => StatusCode::NOT_FOUND,
        },
        DomainError::Registry(registry_err) => match registry_err {
            RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::Duplicate { .. } => StatusCode::CONFLICT,
        },
        DomainError::AggregateNotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError::Coordinator(err)
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Coordinator(CoordinatorError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use domain::{EntryId, Quantity};

    fn status_of(err: CoordinatorError) -> StatusCode {
        ApiError::Coordinator(err).into_response().status()
    }

    #[test]
    fn busy_maps_to_service_unavailable() {
        let err = CoordinatorError::Busy {
            aggregate_id: AggregateId::new(),
        };
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let err = CoordinatorError::from(StockError::InsufficientStock {
            available: Quantity::from_units(1),
            requested: Quantity::from_units(2),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_entry_maps_to_not_found() {
        let err = CoordinatorError::UnknownEntry(EntryId::new());
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_phone_maps_to_conflict() {
        let err = CoordinatorError::from(RegistryError::Duplicate {
            field: "phone_number",
            value: "0888-1".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }
}
