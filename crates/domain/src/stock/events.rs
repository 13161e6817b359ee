//! Stock record domain events.

use chrono::NaiveDate;
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::values::{EntryId, Money, Quantity};

/// Events that can occur on a product's stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StockEvent {
    /// A stock record was opened for a product (at zero quantity).
    StockOpened(StockOpenedData),

    /// A production run added stock.
    ProductionLogged(ProductionLoggedData),

    /// A sale consumed stock.
    SaleRecorded(SaleRecordedData),

    /// A previously logged production was reversed (delete or edit).
    ProductionReversed(ProductionReversedData),

    /// A previously recorded sale was reversed (delete or edit).
    SaleReversed(SaleReversedData),

    /// The stock level was manually set to a new value.
    StockAdjusted(StockAdjustedData),

    /// The stock record was removed (product storage deleted).
    StockClosed(StockClosedData),
}

impl DomainEvent for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockOpened(_) => "StockOpened",
            StockEvent::ProductionLogged(_) => "ProductionLogged",
            StockEvent::SaleRecorded(_) => "SaleRecorded",
            StockEvent::ProductionReversed(_) => "ProductionReversed",
            StockEvent::SaleReversed(_) => "SaleReversed",
            StockEvent::StockAdjusted(_) => "StockAdjusted",
            StockEvent::StockClosed(_) => "StockClosed",
        }
    }
}

/// Data for StockOpened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockOpenedData {
    /// The product this stock record tracks.
    pub product_id: AggregateId,
}

/// Data for ProductionLogged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLoggedData {
    /// Identifier of this production entry.
    pub entry_id: EntryId,

    /// Quantity produced (positive).
    pub quantity: Quantity,

    /// Production date.
    pub date: NaiveDate,
}

/// Data for SaleRecorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecordedData {
    /// Identifier of this sale entry.
    pub entry_id: EntryId,

    /// The customer who bought the stock.
    pub customer_id: AggregateId,

    /// Quantity sold (positive).
    pub quantity: Quantity,

    /// Cost charged for the sale, fixed at sale time.
    pub cost: Money,

    /// Sale date.
    pub date: NaiveDate,
}

/// Data for ProductionReversed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionReversedData {
    /// The production entry being reversed.
    pub entry_id: EntryId,

    /// Quantity removed from stock by the reversal.
    pub quantity: Quantity,
}

/// Data for SaleReversed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReversedData {
    /// The sale entry being reversed.
    pub entry_id: EntryId,

    /// Quantity returned to stock by the reversal.
    pub quantity: Quantity,
}

/// Data for StockAdjusted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustedData {
    /// Change relative to the previous quantity.
    pub delta: Quantity,

    /// The quantity after the adjustment.
    pub quantity: Quantity,
}

/// Data for StockClosed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockClosedData {
    /// The product whose stock record was removed.
    pub product_id: AggregateId,
}

impl StockEvent {
    /// Creates a StockOpened event.
    pub fn opened(product_id: AggregateId) -> Self {
        StockEvent::StockOpened(StockOpenedData { product_id })
    }

    /// Creates a ProductionLogged event.
    pub fn production_logged(entry_id: EntryId, quantity: Quantity, date: NaiveDate) -> Self {
        StockEvent::ProductionLogged(ProductionLoggedData {
            entry_id,
            quantity,
            date,
        })
    }

    /// Creates a SaleRecorded event.
    pub fn sale_recorded(
        entry_id: EntryId,
        customer_id: AggregateId,
        quantity: Quantity,
        cost: Money,
        date: NaiveDate,
    ) -> Self {
        StockEvent::SaleRecorded(SaleRecordedData {
            entry_id,
            customer_id,
            quantity,
            cost,
            date,
        })
    }
}
