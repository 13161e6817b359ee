//! Sale entry endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use coordinator::SaleReceipt;
use domain::{Money, Quantity};
use event_store::EventStore;
use projections::SaleRow;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, parse_entry_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSaleRequest {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
    /// Defaults to `quantity * product.price` when omitted.
    pub cost: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSaleRequest {
    pub sale_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub date: NaiveDate,
    pub cost: Option<f64>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub cost: f64,
    pub date: NaiveDate,
}

impl From<SaleRow> for SaleResponse {
    fn from(row: SaleRow) -> Self {
        Self {
            sale_id: row.entry_id.to_string(),
            customer_id: row.customer_id.to_string(),
            product_id: row.product_id.to_string(),
            quantity: row.quantity.as_units_f64(),
            cost: row.cost.as_major_units(),
            date: row.date,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceiptResponse {
    pub sale_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub cost: f64,
    pub date: NaiveDate,
    pub stock_on_hand: f64,
    pub customer_balance: f64,
}

impl From<SaleReceipt> for SaleReceiptResponse {
    fn from(receipt: SaleReceipt) -> Self {
        Self {
            sale_id: receipt.entry_id.to_string(),
            customer_id: receipt.customer_id.to_string(),
            product_id: receipt.product_id.to_string(),
            quantity: receipt.quantity.as_units_f64(),
            cost: receipt.cost.as_major_units(),
            date: receipt.date,
            stock_on_hand: receipt.stock_on_hand.as_units_f64(),
            customer_balance: receipt.customer_balance.as_major_units(),
        }
    }
}

// -- Handlers --

/// GET /sale/getAll — list live sale entries.
#[tracing::instrument(skip(state))]
pub async fn get_all<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<SaleResponse>>, ApiError> {
    refresh_views(&state).await?;

    let rows = state.facade.sales().await;
    Ok(Json(rows.into_iter().map(SaleResponse::from).collect()))
}

/// POST /sale/add — record a sale. Decrements stock and charges the
/// customer as one unit; neither happens if either would fail.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddSaleRequest>,
) -> Result<(StatusCode, Json<SaleReceiptResponse>), ApiError> {
    let customer_id = parse_aggregate_id(&req.customer_id)?;
    let product_id = parse_aggregate_id(&req.product_id)?;
    let quantity = Quantity::from_units_f64(req.quantity);
    let cost = req.cost.map(Money::from_major_units);

    let receipt = state
        .coordinator
        .record_sale(customer_id, product_id, quantity, req.date, cost)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// PUT /sale/edit — reverse the old sale and re-record it with the new
/// values, as one atomic unit. Fails untouched if the new quantity is
/// not covered by current stock plus what the old sale frees up.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<EditSaleRequest>,
) -> Result<Json<SaleReceiptResponse>, ApiError> {
    let entry_id = parse_entry_id(&req.sale_id)?;
    let customer_id = parse_aggregate_id(&req.customer_id)?;
    let product_id = parse_aggregate_id(&req.product_id)?;
    let quantity = Quantity::from_units_f64(req.quantity);
    let cost = req.cost.map(Money::from_major_units);

    let receipt = state
        .coordinator
        .edit_sale(entry_id, customer_id, product_id, quantity, req.date, cost)
        .await?;

    Ok(Json(receipt.into()))
}

/// DELETE /sale/{id}/delete — reverse and delete a sale entry.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let entry_id = parse_entry_id(&id)?;
    state.coordinator.delete_sale(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
