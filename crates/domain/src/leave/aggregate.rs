//! The worker leave account aggregate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::values::EntryId;

use super::events::{
    LeaveDeletedData, LeaveEditedData, LeaveEvent, LeaveOpenedData, LeaveRequestedData,
};

/// Errors that can occur on leave commands.
#[derive(Debug, Error)]
pub enum LeaveError {
    /// The end date precedes the start date.
    #[error("Invalid leave range: {start} to {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// The referenced leave entry does not exist on this account.
    #[error("Leave entry not found: {entry_id}")]
    EntryNotFound { entry_id: EntryId },
}

/// An inclusive span of leave days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LeaveSpan {
    /// Number of days in the span, inclusive on both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Returns true if the span covers the given date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The per-worker leave account aggregate.
///
/// Used leave days are the sum of inclusive day spans over all live
/// entries. Overlapping entries each count in full; the total sums
/// entries, not calendar days.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LeaveAccount {
    id: Option<AggregateId>,
    version: Version,
    entries: BTreeMap<EntryId, LeaveSpan>,
}

impl LeaveAccount {
    /// Total used leave days over all live entries.
    pub fn days_of_leave(&self) -> i64 {
        self.entries.values().map(LeaveSpan::days).sum()
    }

    /// Returns a live leave span, if present.
    pub fn entry(&self, entry_id: EntryId) -> Option<LeaveSpan> {
        self.entries.get(&entry_id).copied()
    }

    /// All live leave entries.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, LeaveSpan)> + '_ {
        self.entries.iter().map(|(id, span)| (*id, *span))
    }

    /// Returns true if the worker is on leave on the given date.
    pub fn on_leave(&self, date: NaiveDate) -> bool {
        self.entries.values().any(|span| span.contains(date))
    }

    // --- Commands ---

    /// Requests a new leave span.
    pub fn request_leave(
        &self,
        worker_id: AggregateId,
        entry_id: EntryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveEvent>, LeaveError> {
        if end < start {
            return Err(LeaveError::InvalidRange { start, end });
        }

        let mut events = self.open_if_needed(worker_id);
        events.push(LeaveEvent::LeaveRequested(LeaveRequestedData {
            entry_id,
            start,
            end,
        }));
        Ok(events)
    }

    /// Changes the dates of an existing leave span.
    pub fn edit_leave(
        &self,
        entry_id: EntryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveEvent>, LeaveError> {
        if !self.entries.contains_key(&entry_id) {
            return Err(LeaveError::EntryNotFound { entry_id });
        }
        if end < start {
            return Err(LeaveError::InvalidRange { start, end });
        }

        Ok(vec![LeaveEvent::LeaveEdited(LeaveEditedData {
            entry_id,
            start,
            end,
        })])
    }

    /// Deletes a leave span.
    pub fn delete_leave(&self, entry_id: EntryId) -> Result<Vec<LeaveEvent>, LeaveError> {
        if !self.entries.contains_key(&entry_id) {
            return Err(LeaveError::EntryNotFound { entry_id });
        }

        Ok(vec![LeaveEvent::LeaveDeleted(LeaveDeletedData {
            entry_id,
        })])
    }

    /// Deletes every live leave span (worker removal cascade).
    pub fn delete_all(&self) -> Vec<LeaveEvent> {
        self.entries
            .keys()
            .map(|entry_id| {
                LeaveEvent::LeaveDeleted(LeaveDeletedData {
                    entry_id: *entry_id,
                })
            })
            .collect()
    }

    fn open_if_needed(&self, worker_id: AggregateId) -> Vec<LeaveEvent> {
        if self.id.is_none() {
            vec![LeaveEvent::LeaveOpened(LeaveOpenedData { worker_id })]
        } else {
            vec![]
        }
    }
}

impl Aggregate for LeaveAccount {
    type Event = LeaveEvent;
    type Error = LeaveError;

    fn aggregate_type() -> &'static str {
        "LeaveAccount"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            LeaveEvent::LeaveOpened(data) => {
                self.id = Some(data.worker_id);
            }
            LeaveEvent::LeaveRequested(data) => {
                self.entries.insert(
                    data.entry_id,
                    LeaveSpan {
                        start: data.start,
                        end: data.end,
                    },
                );
            }
            LeaveEvent::LeaveEdited(data) => {
                self.entries.insert(
                    data.entry_id,
                    LeaveSpan {
                        start: data.start,
                        end: data.end,
                    },
                );
            }
            LeaveEvent::LeaveDeleted(data) => {
                self.entries.remove(&data.entry_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_span_counts_inclusive_days() {
        let worker_id = AggregateId::new();
        let mut account = LeaveAccount::default();

        account.apply_events(
            account
                .request_leave(worker_id, EntryId::new(), d(2024, 1, 1), d(2024, 1, 3))
                .unwrap(),
        );

        assert_eq!(account.days_of_leave(), 3);
    }

    #[test]
    fn single_day_span_counts_one() {
        let worker_id = AggregateId::new();
        let mut account = LeaveAccount::default();

        account.apply_events(
            account
                .request_leave(worker_id, EntryId::new(), d(2024, 1, 2), d(2024, 1, 2))
                .unwrap(),
        );

        assert_eq!(account.days_of_leave(), 1);
    }

    #[test]
    fn overlapping_spans_sum_entries_not_calendar_days() {
        let worker_id = AggregateId::new();
        let mut account = LeaveAccount::default();

        account.apply_events(
            account
                .request_leave(worker_id, EntryId::new(), d(2024, 1, 1), d(2024, 1, 3))
                .unwrap(),
        );
        account.apply_events(
            account
                .request_leave(worker_id, EntryId::new(), d(2024, 1, 2), d(2024, 1, 2))
                .unwrap(),
        );

        assert_eq!(account.days_of_leave(), 4);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let worker_id = AggregateId::new();
        let account = LeaveAccount::default();

        let result =
            account.request_leave(worker_id, EntryId::new(), d(2024, 1, 5), d(2024, 1, 1));
        assert!(matches!(result, Err(LeaveError::InvalidRange { .. })));
    }

    #[test]
    fn day_count_is_order_independent() {
        let worker_id = AggregateId::new();
        let spans = [
            (d(2024, 1, 1), d(2024, 1, 3)),
            (d(2024, 2, 10), d(2024, 2, 10)),
            (d(2024, 3, 1), d(2024, 3, 7)),
        ];

        let mut forward = LeaveAccount::default();
        for (start, end) in spans {
            forward.apply_events(
                forward
                    .request_leave(worker_id, EntryId::new(), start, end)
                    .unwrap(),
            );
        }

        let mut reverse = LeaveAccount::default();
        for (start, end) in spans.iter().rev() {
            reverse.apply_events(
                reverse
                    .request_leave(worker_id, EntryId::new(), *start, *end)
                    .unwrap(),
            );
        }

        assert_eq!(forward.days_of_leave(), reverse.days_of_leave());
        assert_eq!(forward.days_of_leave(), 3 + 1 + 7);
    }

    #[test]
    fn edit_replaces_the_span() {
        let worker_id = AggregateId::new();
        let entry_id = EntryId::new();
        let mut account = LeaveAccount::default();
        account.apply_events(
            account
                .request_leave(worker_id, entry_id, d(2024, 1, 1), d(2024, 1, 3))
                .unwrap(),
        );

        account.apply_events(
            account
                .edit_leave(entry_id, d(2024, 1, 1), d(2024, 1, 10))
                .unwrap(),
        );

        assert_eq!(account.days_of_leave(), 10);
    }

    #[test]
    fn edit_unknown_entry_is_not_found() {
        let account = LeaveAccount::default();
        let result = account.edit_leave(EntryId::new(), d(2024, 1, 1), d(2024, 1, 2));
        assert!(matches!(result, Err(LeaveError::EntryNotFound { .. })));
    }

    #[test]
    fn delete_removes_days() {
        let worker_id = AggregateId::new();
        let entry_id = EntryId::new();
        let mut account = LeaveAccount::default();
        account.apply_events(
            account
                .request_leave(worker_id, entry_id, d(2024, 1, 1), d(2024, 1, 3))
                .unwrap(),
        );

        account.apply_events(account.delete_leave(entry_id).unwrap());

        assert_eq!(account.days_of_leave(), 0);
    }

    #[test]
    fn on_leave_checks_span_bounds() {
        let worker_id = AggregateId::new();
        let mut account = LeaveAccount::default();
        account.apply_events(
            account
                .request_leave(worker_id, EntryId::new(), d(2024, 1, 2), d(2024, 1, 4))
                .unwrap(),
        );

        assert!(!account.on_leave(d(2024, 1, 1)));
        assert!(account.on_leave(d(2024, 1, 2)));
        assert!(account.on_leave(d(2024, 1, 4)));
        assert!(!account.on_leave(d(2024, 1, 5)));
    }

    #[test]
    fn delete_all_clears_every_entry() {
        let worker_id = AggregateId::new();
        let mut account = LeaveAccount::default();
        for _ in 0..3 {
            account.apply_events(
                account
                    .request_leave(worker_id, EntryId::new(), d(2024, 1, 1), d(2024, 1, 2))
                    .unwrap(),
            );
        }

        account.apply_events(account.delete_all());

        assert_eq!(account.days_of_leave(), 0);
        assert_eq!(account.entries().count(), 0);
    }
}
