//! Per-customer balances derived from sale and return events.

pub mod aggregate;
pub mod events;

pub use aggregate::{BalanceError, CustomerBalance, ReturnLine};
pub use events::{
    BalanceEvent, BalanceOpenedData, ReturnCreditReversedData, ReturnCreditedData,
    SaleChargeReversedData, SaleChargedData,
};
