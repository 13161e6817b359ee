//! Leave entry endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use coordinator::LeaveReceipt;
use event_store::EventStore;
use projections::LeaveRow;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::{AppState, parse_aggregate_id, parse_entry_id, refresh_views};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLeaveRequest {
    pub worker_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditLeaveRequest {
    pub leave_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLeaveRequest {
    pub leave_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub leave_id: String,
    pub worker_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
}

impl From<LeaveRow> for LeaveResponse {
    fn from(row: LeaveRow) -> Self {
        Self {
            leave_id: row.entry_id.to_string(),
            worker_id: row.worker_id.to_string(),
            start_date: row.start,
            end_date: row.end,
            days: row.days(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveReceiptResponse {
    pub leave_id: String,
    pub worker_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub days_of_leave: i64,
}

impl From<LeaveReceipt> for LeaveReceiptResponse {
    fn from(receipt: LeaveReceipt) -> Self {
        Self {
            leave_id: receipt.entry_id.to_string(),
            worker_id: receipt.worker_id.to_string(),
            start_date: receipt.start,
            end_date: receipt.end,
            days: receipt.days,
            days_of_leave: receipt.days_of_leave,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDayResponse {
    pub date: NaiveDate,
    pub entries: Vec<LeaveResponse>,
    pub absent_workers: usize,
    pub available_workers: usize,
}

// -- Handlers --

/// GET /leave/{workerId}/worker — list a worker's leave entries.
#[tracing::instrument(skip(state))]
pub async fn for_worker<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(worker_id): Path<String>,
) -> Result<Json<Vec<LeaveResponse>>, ApiError> {
    let worker_id = parse_aggregate_id(&worker_id)?;
    state.coordinator.workers().get(worker_id).await?;
    refresh_views(&state).await?;

    let rows = state.facade.leave_for_worker(worker_id).await;
    Ok(Json(rows.into_iter().map(LeaveResponse::from).collect()))
}

/// GET /leave/day — who is absent on a day and how many workers remain.
/// Defaults to today when no `date` query parameter is given.
#[tracing::instrument(skip(state))]
pub async fn day<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<DayQuery>,
) -> Result<Json<LeaveDayResponse>, ApiError> {
    refresh_views(&state).await?;

    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let board = state.facade.leave_day(date).await;

    Ok(Json(LeaveDayResponse {
        date: board.date,
        entries: board.entries.into_iter().map(LeaveResponse::from).collect(),
        absent_workers: board.absent_workers,
        available_workers: board.available_workers,
    }))
}

/// POST /leave/add — request a new leave span.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveReceiptResponse>), ApiError> {
    let worker_id = parse_aggregate_id(&req.worker_id)?;

    let receipt = state
        .coordinator
        .request_leave(worker_id, req.start_date, req.end_date)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /leave/edit — change the dates of an existing leave entry.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<EditLeaveRequest>,
) -> Result<Json<LeaveReceiptResponse>, ApiError> {
    let entry_id = parse_entry_id(&req.leave_id)?;

    let receipt = state
        .coordinator
        .edit_leave(entry_id, req.start_date, req.end_date)
        .await?;

    Ok(Json(receipt.into()))
}

/// DELETE /leave/delete — delete a leave entry (id in the body).
#[tracing::instrument(skip(state, req))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<DeleteLeaveRequest>,
) -> Result<StatusCode, ApiError> {
    let entry_id = parse_entry_id(&req.leave_id)?;
    state.coordinator.delete_leave(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
