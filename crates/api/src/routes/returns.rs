//! Returned-wax endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use coordinator::ReturnReceipt;
use domain::{Material, Quantity};
use event_store::EventStore;
use projections::ReturnRow;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, parse_entry_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReturnRequest {
    pub customer_id: String,
    pub material: Material,
    pub weight: f64,
    pub return_date: NaiveDate,
    pub note: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub return_id: String,
    pub customer_id: String,
    pub material: Material,
    pub weight: f64,
    pub total_value: f64,
    pub return_date: NaiveDate,
    pub note: Option<String>,
}

impl From<ReturnRow> for ReturnResponse {
    fn from(row: ReturnRow) -> Self {
        Self {
            return_id: row.entry_id.to_string(),
            customer_id: row.customer_id.to_string(),
            material: row.material,
            weight: row.weight.as_units_f64(),
            total_value: row.amount.as_major_units(),
            return_date: row.return_date,
            note: row.note,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReceiptResponse {
    pub return_id: String,
    pub customer_id: String,
    pub material: Material,
    pub weight: f64,
    pub total_value: f64,
    pub return_date: NaiveDate,
    pub customer_balance: f64,
}

impl From<ReturnReceipt> for ReturnReceiptResponse {
    fn from(receipt: ReturnReceipt) -> Self {
        Self {
            return_id: receipt.entry_id.to_string(),
            customer_id: receipt.customer_id.to_string(),
            material: receipt.material,
            weight: receipt.weight.as_units_f64(),
            total_value: receipt.amount.as_major_units(),
            return_date: receipt.return_date,
            customer_balance: receipt.customer_balance.as_major_units(),
        }
    }
}

// -- Handlers --

/// GET /returned-wax — list live wax return entries.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ReturnResponse>>, ApiError> {
    refresh_views(&state).await?;

    let rows = state.facade.returns().await;
    Ok(Json(rows.into_iter().map(ReturnResponse::from).collect()))
}

/// POST /returned-wax — record a wax return. The credited value is the
/// material's rate times the weight.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddReturnRequest>,
) -> Result<(StatusCode, Json<ReturnReceiptResponse>), ApiError> {
    let customer_id = parse_aggregate_id(&req.customer_id)?;
    let weight = Quantity::from_units_f64(req.weight);

    let receipt = state
        .coordinator
        .record_return(customer_id, req.material, weight, req.return_date, req.note)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// DELETE /returned-wax/{id} — reverse and delete a wax return.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let entry_id = parse_entry_id(&id)?;
    state.coordinator.delete_return(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
