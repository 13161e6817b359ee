//! Leave account domain events.

use chrono::NaiveDate;
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::values::EntryId;

/// Events that can occur on a worker's leave account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LeaveEvent {
    /// A leave account was opened for a worker.
    LeaveOpened(LeaveOpenedData),

    /// A leave span was requested.
    LeaveRequested(LeaveRequestedData),

    /// An existing leave span was changed.
    LeaveEdited(LeaveEditedData),

    /// A leave span was deleted.
    LeaveDeleted(LeaveDeletedData),
}

impl DomainEvent for LeaveEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LeaveEvent::LeaveOpened(_) => "LeaveOpened",
            LeaveEvent::LeaveRequested(_) => "LeaveRequested",
            LeaveEvent::LeaveEdited(_) => "LeaveEdited",
            LeaveEvent::LeaveDeleted(_) => "LeaveDeleted",
        }
    }
}

/// Data for LeaveOpened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveOpenedData {
    /// The worker this account belongs to.
    pub worker_id: AggregateId,
}

/// Data for LeaveRequested event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequestedData {
    /// Identifier of this leave entry.
    pub entry_id: EntryId,

    /// First day of leave (inclusive).
    pub start: NaiveDate,

    /// Last day of leave (inclusive).
    pub end: NaiveDate,
}

/// Data for LeaveEdited event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveEditedData {
    /// The leave entry being changed.
    pub entry_id: EntryId,

    /// New first day (inclusive).
    pub start: NaiveDate,

    /// New last day (inclusive).
    pub end: NaiveDate,
}

/// Data for LeaveDeleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveDeletedData {
    /// The leave entry being deleted.
    pub entry_id: EntryId,
}
