//! Production entry endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use coordinator::ProductionReceipt;
use domain::Quantity;
use event_store::EventStore;
use projections::ProductionRow;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, parse_entry_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductionRequest {
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProductionRequest {
    pub production_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionResponse {
    pub production_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
}

impl From<ProductionRow> for ProductionResponse {
    fn from(row: ProductionRow) -> Self {
        Self {
            production_id: row.entry_id.to_string(),
            product_id: row.product_id.to_string(),
            quantity: row.quantity.as_units_f64(),
            date: row.date,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionReceiptResponse {
    pub production_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
    pub stock_on_hand: f64,
}

impl From<ProductionReceipt> for ProductionReceiptResponse {
    fn from(receipt: ProductionReceipt) -> Self {
        Self {
            production_id: receipt.entry_id.to_string(),
            product_id: receipt.product_id.to_string(),
            quantity: receipt.quantity.as_units_f64(),
            date: receipt.date,
            stock_on_hand: receipt.stock_on_hand.as_units_f64(),
        }
    }
}

// -- Handlers --

/// GET /production/getAll — list live production entries.
#[tracing::instrument(skip(state))]
pub async fn get_all<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductionResponse>>, ApiError> {
    refresh_views(&state).await?;

    let rows = state.facade.productions().await;
    Ok(Json(rows.into_iter().map(ProductionResponse::from).collect()))
}

/// POST /production/add — log a production run.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddProductionRequest>,
) -> Result<(StatusCode, Json<ProductionReceiptResponse>), ApiError> {
    let product_id = parse_aggregate_id(&req.product_id)?;
    let quantity = Quantity::from_units_f64(req.quantity);

    let receipt = state
        .coordinator
        .log_production(product_id, quantity, req.date)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// PUT /production/edit — reverse the old entry and re-log it with the
/// new values, as one atomic unit.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<EditProductionRequest>,
) -> Result<Json<ProductionReceiptResponse>, ApiError> {
    let entry_id = parse_entry_id(&req.production_id)?;
    let product_id = parse_aggregate_id(&req.product_id)?;
    let quantity = Quantity::from_units_f64(req.quantity);

    let receipt = state
        .coordinator
        .edit_production(entry_id, product_id, quantity, req.date)
        .await?;

    Ok(Json(receipt.into()))
}

/// DELETE /production/{id}/delete — reverse and delete a production entry.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let entry_id = parse_entry_id(&id)?;
    state.coordinator.delete_production(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
