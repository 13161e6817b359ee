use crate::{AggregateId, Version};

/// Filter for reading a slice of the ledger event log.
///
/// The coordinator rebuilds its entry index from whole aggregate-type
/// partitions (every `StockRecord` stream at once, then `CustomerBalance`,
/// then `LeaveAccount`); diagnostics can narrow to a single stream and a
/// version window instead.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Restrict to a single aggregate stream.
    pub aggregate_id: Option<AggregateId>,

    /// Restrict to one aggregate type.
    pub aggregate_type: Option<String>,

    /// Lowest version to include.
    pub from_version: Option<Version>,

    /// Highest version to include.
    pub to_version: Option<Version>,
}

impl EventQuery {
    /// Creates an empty query matching every event in the log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to a single aggregate stream.
    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    /// Restricts the query to one aggregate type, e.g. `"StockRecord"`.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Includes only events at or above this version.
    pub fn from_version(mut self, version: Version) -> Self {
        self.from_version = Some(version);
        self
    }

    /// Includes only events at or below this version.
    pub fn to_version(mut self, version: Version) -> Self {
        self.to_version = Some(version);
        self
    }
}
