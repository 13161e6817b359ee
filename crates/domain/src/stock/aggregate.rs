//! The stock record aggregate.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::values::{EntryId, Money, Quantity};

use super::events::{
    ProductionReversedData, SaleReversedData, StockAdjustedData, StockClosedData, StockEvent,
};

/// Errors that can occur on stock commands.
#[derive(Debug, Error)]
pub enum StockError {
    /// Quantity was zero, negative, or otherwise out of range.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: Quantity },

    /// A sale would drive the stock level negative.
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        available: Quantity,
        requested: Quantity,
    },

    /// The referenced production or sale entry does not exist on this record.
    #[error("Stock entry not found: {entry_id}")]
    EntryNotFound { entry_id: EntryId },

    /// Reversing the entry would drive the stock level negative because
    /// later events already consumed the stock it added.
    #[error(
        "Conflicting reversal of entry {entry_id}: would remove {required} but only {available} remain"
    )]
    ConflictingReversal {
        entry_id: EntryId,
        available: Quantity,
        required: Quantity,
    },

    /// A stock record is already open for this product.
    #[error("Stock record already open")]
    AlreadyOpen,

    /// No stock record is open for this product.
    #[error("Stock record not open")]
    NotOpen,
}

/// A recorded sale line, kept for reversal and auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub customer_id: AggregateId,
    pub quantity: Quantity,
    pub cost: Money,
    pub date: NaiveDate,
}

/// The per-product stock aggregate.
///
/// Derives the on-hand quantity from production and sale events and
/// enforces the non-negative invariant: after every applied event,
/// `quantity == Σ production − Σ sale (± adjustments)` and `quantity ≥ 0`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    id: Option<AggregateId>,
    version: Version,
    quantity: Quantity,
    productions: HashMap<EntryId, Quantity>,
    sales: HashMap<EntryId, SaleLine>,
}

impl StockRecord {
    /// Returns the current on-hand quantity.
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Returns the quantity of a live production entry, if present.
    pub fn production(&self, entry_id: EntryId) -> Option<Quantity> {
        self.productions.get(&entry_id).copied()
    }

    /// Returns a live sale line, if present.
    pub fn sale(&self, entry_id: EntryId) -> Option<&SaleLine> {
        self.sales.get(&entry_id)
    }

    /// Returns true if any production or sale entries are live.
    pub fn has_entries(&self) -> bool {
        !self.productions.is_empty() || !self.sales.is_empty()
    }

    // --- Commands ---

    /// Opens a stock record for a product at zero quantity.
    pub fn open(&self, product_id: AggregateId) -> Result<Vec<StockEvent>, StockError> {
        if self.id.is_some() {
            return Err(StockError::AlreadyOpen);
        }
        Ok(vec![StockEvent::opened(product_id)])
    }

    /// Logs a production run, increasing stock unconditionally.
    pub fn log_production(
        &self,
        product_id: AggregateId,
        entry_id: EntryId,
        quantity: Quantity,
        date: NaiveDate,
    ) -> Result<Vec<StockEvent>, StockError> {
        if !quantity.is_positive() {
            return Err(StockError::InvalidQuantity { quantity });
        }

        let mut events = self.open_if_needed(product_id);
        events.push(StockEvent::production_logged(entry_id, quantity, date));
        Ok(events)
    }

    /// Records a sale, decreasing stock. Fails if the stock would go
    /// negative, leaving state unchanged.
    pub fn record_sale(
        &self,
        product_id: AggregateId,
        entry_id: EntryId,
        customer_id: AggregateId,
        quantity: Quantity,
        cost: Money,
        date: NaiveDate,
    ) -> Result<Vec<StockEvent>, StockError> {
        if !quantity.is_positive() {
            return Err(StockError::InvalidQuantity { quantity });
        }
        if (self.quantity - quantity).is_negative() {
            return Err(StockError::InsufficientStock {
                available: self.quantity,
                requested: quantity,
            });
        }

        let mut events = self.open_if_needed(product_id);
        events.push(StockEvent::sale_recorded(
            entry_id,
            customer_id,
            quantity,
            cost,
            date,
        ));
        Ok(events)
    }

    /// Reverses a production entry. Fails with `ConflictingReversal` if
    /// later sales already consumed the stock this entry added.
    pub fn reverse_production(&self, entry_id: EntryId) -> Result<Vec<StockEvent>, StockError> {
        let quantity = self
            .productions
            .get(&entry_id)
            .copied()
            .ok_or(StockError::EntryNotFound { entry_id })?;

        if (self.quantity - quantity).is_negative() {
            return Err(StockError::ConflictingReversal {
                entry_id,
                available: self.quantity,
                required: quantity,
            });
        }

        Ok(vec![StockEvent::ProductionReversed(ProductionReversedData {
            entry_id,
            quantity,
        })])
    }

    /// Reverses a sale entry, returning its quantity to stock.
    pub fn reverse_sale(&self, entry_id: EntryId) -> Result<Vec<StockEvent>, StockError> {
        let line = self
            .sales
            .get(&entry_id)
            .ok_or(StockError::EntryNotFound { entry_id })?;

        Ok(vec![StockEvent::SaleReversed(SaleReversedData {
            entry_id,
            quantity: line.quantity,
        })])
    }

    /// Sets the stock level to an explicit value (manual correction).
    pub fn adjust_to(
        &self,
        product_id: AggregateId,
        quantity: Quantity,
    ) -> Result<Vec<StockEvent>, StockError> {
        if quantity.is_negative() {
            return Err(StockError::InvalidQuantity { quantity });
        }

        let delta = quantity - self.quantity;
        if delta == Quantity::ZERO && self.id.is_some() {
            return Ok(vec![]);
        }

        let mut events = self.open_if_needed(product_id);
        events.push(StockEvent::StockAdjusted(StockAdjustedData {
            delta,
            quantity,
        }));
        Ok(events)
    }

    /// Removes the stock record. A later command on the same product
    /// starts over from a fresh, empty record.
    pub fn close(&self, product_id: AggregateId) -> Result<Vec<StockEvent>, StockError> {
        if self.id.is_none() {
            return Err(StockError::NotOpen);
        }
        Ok(vec![StockEvent::StockClosed(StockClosedData { product_id })])
    }

    fn open_if_needed(&self, product_id: AggregateId) -> Vec<StockEvent> {
        if self.id.is_none() {
            vec![StockEvent::opened(product_id)]
        } else {
            vec![]
        }
    }

    // --- Event application ---

    fn apply_opened(&mut self, product_id: AggregateId) {
        self.id = Some(product_id);
        self.quantity = Quantity::ZERO;
    }

    fn apply_production_logged(&mut self, entry_id: EntryId, quantity: Quantity) {
        self.quantity += quantity;
        self.productions.insert(entry_id, quantity);
    }

    fn apply_sale_recorded(&mut self, entry_id: EntryId, line: SaleLine) {
        self.quantity -= line.quantity;
        self.sales.insert(entry_id, line);
    }

    fn apply_production_reversed(&mut self, entry_id: EntryId, quantity: Quantity) {
        self.quantity -= quantity;
        self.productions.remove(&entry_id);
    }

    fn apply_sale_reversed(&mut self, entry_id: EntryId, quantity: Quantity) {
        self.quantity += quantity;
        self.sales.remove(&entry_id);
    }

    fn apply_adjusted(&mut self, quantity: Quantity) {
        self.quantity = quantity;
    }

    fn apply_closed(&mut self) {
        self.id = None;
        self.quantity = Quantity::ZERO;
        self.productions.clear();
        self.sales.clear();
    }
}

impl Aggregate for StockRecord {
    type Event = StockEvent;
    type Error = StockError;

    fn aggregate_type() -> &'static str {
        "StockRecord"
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
            StockEvent::StockOpened(data) => self.apply_opened(data.product_id),
            StockEvent::ProductionLogged(data) => {
                self.apply_production_logged(data.entry_id, data.quantity)
            }
            StockEvent::SaleRecorded(data) => self.apply_sale_recorded(
                data.entry_id,
                SaleLine {
                    customer_id: data.customer_id,
                    quantity: data.quantity,
                    cost: data.cost,
                    date: data.date,
                },
            ),
            StockEvent::ProductionReversed(data) => {
                self.apply_production_reversed(data.entry_id, data.quantity)
            }
            StockEvent::SaleReversed(data) => {
                self.apply_sale_reversed(data.entry_id, data.quantity)
            }
            StockEvent::StockAdjusted(data) => self.apply_adjusted(data.quantity),
            StockEvent::StockClosed(_) => self.apply_closed(),
        }
    }
}
