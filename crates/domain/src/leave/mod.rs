//! Per-worker leave accounts derived from leave events.

pub mod aggregate;
pub mod events;

pub use aggregate::{LeaveAccount, LeaveError, LeaveSpan};
pub use events::{
    LeaveDeletedData, LeaveEditedData, LeaveEvent, LeaveOpenedData, LeaveRequestedData,
};
