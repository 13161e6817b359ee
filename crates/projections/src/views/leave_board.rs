//! Leave board read model — live leave entries across workers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::AggregateId;
use domain::{Aggregate, EntryId, LeaveAccount, LeaveEvent};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A live leave entry. Days are inclusive of both endpoints.
#[derive(Debug, Clone)]
pub struct LeaveRow {
    pub entry_id: EntryId,
    pub worker_id: AggregateId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LeaveRow {
    /// Number of days this entry covers, endpoints inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True if the given date falls inside this entry.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

struct LeaveBoardState {
    rows: HashMap<EntryId, LeaveRow>,
    position: ProjectionPosition,
}

/// Read model view of all live leave entries.
///
/// Overlapping entries are kept separately; per-worker totals sum entry
/// days, not distinct calendar days.
#[derive(Clone)]
pub struct LeaveBoardView {
    state: Arc<RwLock<LeaveBoardState>>,
}

impl LeaveBoardView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LeaveBoardState {
                rows: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a leave entry by id.
    pub async fn get(&self, entry_id: EntryId) -> Option<LeaveRow> {
        self.state.read().await.rows.get(&entry_id).cloned()
    }

    /// Lists a worker's leave entries, ordered by start date.
    pub async fn for_worker(&self, worker_id: AggregateId) -> Vec<LeaveRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| row.worker_id == worker_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start.cmp(&b.start).then(a.entry_id.cmp(&b.entry_id)));
        rows
    }

    /// Total leave days taken by a worker, summing entries.
    pub async fn days_of_leave(&self, worker_id: AggregateId) -> i64 {
        self.state
            .read()
            .await
            .rows
            .values()
            .filter(|row| row.worker_id == worker_id)
            .map(LeaveRow::days)
            .sum()
    }

    /// Lists the entries covering a given day, ordered by worker id.
    pub async fn on_day(&self, date: NaiveDate) -> Vec<LeaveRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| row.contains(date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.worker_id.cmp(&b.worker_id).then(a.entry_id.cmp(&b.entry_id)));
        rows
    }

    /// Distinct workers absent on a given day.
    pub async fn workers_on_day(&self, date: NaiveDate) -> usize {
        let state = self.state.read().await;
        let workers: HashSet<_> = state
            .rows
            .values()
            .filter(|row| row.contains(date))
            .map(|row| row.worker_id)
            .collect();
        workers.len()
    }
}

impl Default for LeaveBoardView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for LeaveBoardView {
    fn name(&self) -> &'static str {
        "LeaveBoardView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;

        if event.aggregate_type != LeaveAccount::aggregate_type() {
            state.position = state.position.advance();
            return Ok(());
        }

        let leave_event: LeaveEvent = event.decode()?;
        let worker_id = event.aggregate_id;

        match leave_event {
            LeaveEvent::LeaveRequested(data) => {
                state.rows.insert(
                    data.entry_id,
                    LeaveRow {
                        entry_id: data.entry_id,
                        worker_id,
                        start: data.start,
                        end: data.end,
                    },
                );
            }
            LeaveEvent::LeaveEdited(data) => {
                if let Some(row) = state.rows.get_mut(&data.entry_id) {
                    row.start = data.start;
                    row.end = data.end;
                }
            }
            LeaveEvent::LeaveDeleted(data) => {
                state.rows.remove(&data.entry_id);
            }
            LeaveEvent::LeaveOpened(_) => {}
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.rows.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for LeaveBoardView {
    fn name(&self) -> &'static str {
        "LeaveBoardView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.rows.len()).unwrap_or(0)
    }
}
