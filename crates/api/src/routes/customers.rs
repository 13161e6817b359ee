//! Customer directory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use event_store::EventStore;
use projections::CustomerAccountRow;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCustomerRequest {
    pub name: String,
    pub phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCustomerRequest {
    pub id: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub debt: f64,
    pub credit: f64,
    /// `debt - credit`; negative means the store owes the customer.
    pub balance: f64,
}

impl From<CustomerAccountRow> for CustomerResponse {
    fn from(row: CustomerAccountRow) -> Self {
        Self {
            id: row.customer.id.to_string(),
            name: row.customer.name,
            phone_number: row.customer.phone_number,
            debt: row.balance.debt.as_major_units(),
            credit: row.balance.credit.as_major_units(),
            balance: row.balance.balance.as_major_units(),
        }
    }
}

// -- Handlers --

/// GET /customer/all — list customers with their balances.
#[tracing::instrument(skip(state))]
pub async fn all<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CustomerResponse>>, ApiError> {
    refresh_views(&state).await?;

    let rows = state.facade.customer_accounts().await;
    Ok(Json(rows.into_iter().map(CustomerResponse::from).collect()))
}

/// POST /customer/add — register a new customer.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let customer = state
        .coordinator
        .customers()
        .insert(req.name, req.phone_number)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse {
            id: customer.id.to_string(),
            name: customer.name,
            phone_number: customer.phone_number,
            debt: 0.0,
            credit: 0.0,
            balance: 0.0,
        }),
    ))
}

/// POST /customer/edit — edit a customer's details.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<EditCustomerRequest>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer_id = parse_aggregate_id(&req.id)?;

    let customer = state
        .coordinator
        .customers()
        .update(customer_id, req.name, req.phone_number)
        .await?;

    refresh_views(&state).await?;
    let balance = state.facade.customer_balance(customer_id).await;
    Ok(Json(CustomerResponse {
        id: customer.id.to_string(),
        name: customer.name,
        phone_number: customer.phone_number,
        debt: balance.debt.as_major_units(),
        credit: balance.credit.as_major_units(),
        balance: balance.balance.as_major_units(),
    }))
}

/// DELETE /customer/{id}/delete — remove a customer. Refused with 409
/// while live sales or returns still reference them.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let customer_id = parse_aggregate_id(&id)?;
    state.coordinator.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
