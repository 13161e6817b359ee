//! Worker roster endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::Worker;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWorkerRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditWorkerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub days_of_leave: i64,
}

impl WorkerResponse {
    fn from_worker(worker: Worker, days_of_leave: i64) -> Self {
        Self {
            id: worker.id.to_string(),
            first_name: worker.first_name,
            last_name: worker.last_name,
            phone_number: worker.phone_number,
            days_of_leave,
        }
    }
}

// -- Handlers --

/// GET /worker/all — list workers with their accrued leave days.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<WorkerResponse>>, ApiError> {
    refresh_views(&state).await?;

    let mut responses = Vec::new();
    for worker in state.facade.workers().await {
        let days = state.facade.days_of_leave(worker.id).await;
        responses.push(WorkerResponse::from_worker(worker, days));
    }
    Ok(Json(responses))
}

/// POST /worker/register — register a new worker.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterWorkerRequest>,
) -> Result<(StatusCode, Json<WorkerResponse>), ApiError> {
    let worker = state
        .coordinator
        .workers()
        .insert(req.first_name, req.last_name, req.phone_number)
        .await?;

    Ok((StatusCode::CREATED, Json(WorkerResponse::from_worker(worker, 0))))
}

/// POST /worker/{id}/edit — edit a worker's details.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<EditWorkerRequest>,
) -> Result<Json<WorkerResponse>, ApiError> {
    let worker_id = parse_aggregate_id(&id)?;

    let worker = state
        .coordinator
        .workers()
        .update(worker_id, req.first_name, req.last_name, req.phone_number)
        .await?;

    refresh_views(&state).await?;
    let days = state.facade.days_of_leave(worker_id).await;
    Ok(Json(WorkerResponse::from_worker(worker, days)))
}

/// DELETE /worker/{id}/delete — remove a worker and their leave entries.
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let worker_id = parse_aggregate_id(&id)?;
    state.coordinator.delete_worker(worker_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
