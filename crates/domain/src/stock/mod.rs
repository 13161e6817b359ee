//! Per-product stock records derived from production and sale events.

pub mod aggregate;
pub mod events;

pub use aggregate::{SaleLine, StockError, StockRecord};
pub use events::{
    ProductionLoggedData, ProductionReversedData, SaleRecordedData, SaleReversedData,
    StockAdjustedData, StockClosedData, StockEvent, StockOpenedData,
};
