//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Material, Money, NewProduct, Product, ProductUpdate};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    pub product_code: String,
    pub material: Material,
    pub by_weight: bool,
    pub price: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProductRequest {
    pub id: String,
    pub product_code: Option<String>,
    pub material: Option<Material>,
    pub by_weight: Option<bool>,
    pub price: Option<f64>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub product_code: String,
    pub material: Material,
    pub by_weight: bool,
    pub price: f64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            product_code: product.product_code,
            material: product.material,
            by_weight: product.by_weight,
            price: product.price.as_major_units(),
        }
    }
}

fn parse_price(price: f64) -> Result<Money, ApiError> {
    let money = Money::from_major_units(price);
    if money.is_negative() {
        return Err(ApiError::BadRequest(format!("Invalid price: {price}")));
    }
    Ok(money)
}

// -- Handlers --

/// GET /product/getAll — list non-deleted products.
#[tracing::instrument(skip(state))]
pub async fn get_all<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.facade.products().await;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// POST /product/add — register a new product and open its stock
/// record at zero.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let price = parse_price(req.price)?;

    let product = state
        .coordinator
        .products()
        .insert(NewProduct {
            product_code: req.product_code,
            material: req.material,
            by_weight: req.by_weight,
            price,
        })
        .await?;
    state.coordinator.open_stock(product.id).await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /product/edit — edit a product. Historical sale costs keep the
/// price that was current when they were recorded.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<EditProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_aggregate_id(&req.id)?;
    let price = req.price.map(parse_price).transpose()?;

    let product = state
        .coordinator
        .products()
        .update(
            product_id,
            ProductUpdate {
                product_code: req.product_code,
                material: req.material,
                by_weight: req.by_weight,
                price,
            },
        )
        .await?;

    Ok(Json(product.into()))
}

/// DELETE /product/{id}/delete — soft-delete a product. Existing ledger
/// entries and stock records keep resolving it.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    state.coordinator.products().soft_delete(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /product/{id}/admin/delete — hard-delete a product row.
#[tracing::instrument(skip(state))]
pub async fn admin_remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    state.coordinator.products().hard_delete(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
