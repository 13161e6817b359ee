//! Customer balance domain events.

use chrono::NaiveDate;
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::values::{EntryId, Material, Money, Quantity};

/// Events that can occur on a customer's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BalanceEvent {
    /// A balance record was opened for a customer.
    BalanceOpened(BalanceOpenedData),

    /// A sale added to the customer's debt.
    SaleCharged(SaleChargedData),

    /// A wax return added to the customer's credit.
    ReturnCredited(ReturnCreditedData),

    /// A previous sale charge was reversed (delete or edit).
    SaleChargeReversed(SaleChargeReversedData),

    /// A previous return credit was reversed (delete).
    ReturnCreditReversed(ReturnCreditReversedData),
}

impl DomainEvent for BalanceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BalanceEvent::BalanceOpened(_) => "BalanceOpened",
            BalanceEvent::SaleCharged(_) => "SaleCharged",
            BalanceEvent::ReturnCredited(_) => "ReturnCredited",
            BalanceEvent::SaleChargeReversed(_) => "SaleChargeReversed",
            BalanceEvent::ReturnCreditReversed(_) => "ReturnCreditReversed",
        }
    }
}

/// Data for BalanceOpened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceOpenedData {
    /// The customer this balance belongs to.
    pub customer_id: AggregateId,
}

/// Data for SaleCharged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleChargedData {
    /// The sale entry this charge belongs to.
    pub entry_id: EntryId,

    /// Amount added to debt.
    pub amount: Money,
}

/// Data for ReturnCredited event.
///
/// Carries the full return details so the returns ledger can be rebuilt
/// from this stream alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnCreditedData {
    /// Identifier of this return entry.
    pub entry_id: EntryId,

    /// Material of the returned wax.
    pub material: Material,

    /// Returned weight in kilograms.
    pub weight: Quantity,

    /// Credit value (material rate times weight), fixed at return time.
    pub amount: Money,

    /// Date of the return.
    pub return_date: NaiveDate,

    /// Optional free-form note.
    pub note: Option<String>,
}

/// Data for SaleChargeReversed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleChargeReversedData {
    /// The sale entry being reversed.
    pub entry_id: EntryId,

    /// Amount removed from debt.
    pub amount: Money,
}

/// Data for ReturnCreditReversed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnCreditReversedData {
    /// The return entry being reversed.
    pub entry_id: EntryId,

    /// Amount removed from credit.
    pub amount: Money,
}
