//! Storage (stock record) endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use coordinator::StockReceipt;
use domain::{Material, Quantity};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStorageRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EditStorageQuery {
    pub quantity: f64,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResponse {
    pub product_id: String,
    pub product_code: String,
    pub material: Material,
    pub by_weight: bool,
    pub price: f64,
    pub quantity: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub product_id: String,
    pub quantity: f64,
}

impl From<StockReceipt> for StockResponse {
    fn from(receipt: StockReceipt) -> Self {
        Self {
            product_id: receipt.product_id.to_string(),
            quantity: receipt.quantity.as_units_f64(),
        }
    }
}

// -- Handlers --

/// GET /storage/getAll — list open stock records joined with products.
#[tracing::instrument(skip(state))]
pub async fn get_all<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<StorageResponse>>, ApiError> {
    refresh_views(&state).await?;

    let rows = state.facade.storage().await;
    let responses = rows
        .into_iter()
        .map(|row| StorageResponse {
            product_id: row.product.id.to_string(),
            product_code: row.product.product_code,
            material: row.product.material,
            by_weight: row.product.by_weight,
            price: row.product.price.as_major_units(),
            quantity: row.quantity.as_units_f64(),
        })
        .collect();
    Ok(Json(responses))
}

/// POST /storage/add — open a stock record for a product.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddStorageRequest>,
) -> Result<(StatusCode, Json<StockResponse>), ApiError> {
    let product_id = parse_aggregate_id(&req.product_id)?;
    let receipt = state.coordinator.open_stock(product_id).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// PUT /storage/{id}/edit?quantity=N — set a stock record's on-hand
/// quantity directly (manual correction).
#[tracing::instrument(skip(state))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<EditStorageQuery>,
) -> Result<Json<StockResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    let quantity = Quantity::from_units_f64(query.quantity);

    let receipt = state.coordinator.adjust_stock(product_id, quantity).await?;
    Ok(Json(receipt.into()))
}

/// DELETE /storage/{id}/delete — close a product's stock record.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    state.coordinator.close_stock(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
