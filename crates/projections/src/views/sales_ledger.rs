//! Sales ledger read model — live sale entries across products.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::AggregateId;
use domain::{Aggregate, EntryId, Money, Quantity, StockEvent, StockRecord};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A live sale entry.
#[derive(Debug, Clone)]
pub struct SaleRow {
    pub entry_id: EntryId,
    pub product_id: AggregateId,
    pub customer_id: AggregateId,
    pub quantity: Quantity,
    pub cost: Money,
    pub date: NaiveDate,
}

struct SalesLedgerState {
    rows: HashMap<EntryId, SaleRow>,
    position: ProjectionPosition,
}

/// Read model view of all live sale entries, sourced from the stock
/// stream (which carries the full sale line).
#[derive(Clone)]
pub struct SalesLedgerView {
    state: Arc<RwLock<SalesLedgerState>>,
}

impl SalesLedgerView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SalesLedgerState {
                rows: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a sale entry by id.
    pub async fn get(&self, entry_id: EntryId) -> Option<SaleRow> {
        self.state.read().await.rows.get(&entry_id).cloned()
    }

    /// Lists all sale entries, ordered by date then entry id.
    pub async fn all(&self) -> Vec<SaleRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.entry_id.cmp(&b.entry_id)));
        rows
    }

    /// Lists a customer's sale entries, ordered by date then entry id.
    pub async fn for_customer(&self, customer_id: AggregateId) -> Vec<SaleRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| row.customer_id == customer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.entry_id.cmp(&b.entry_id)));
        rows
    }
}

impl Default for SalesLedgerView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for SalesLedgerView {
    fn name(&self) -> &'static str {
        "SalesLedgerView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;

        if event.aggregate_type != StockRecord::aggregate_type() {
            state.position = state.position.advance();
            return Ok(());
        }

        let stock_event: StockEvent = event.decode()?;
        let product_id = event.aggregate_id;

        match stock_event {
            StockEvent::SaleRecorded(data) => {
                state.rows.insert(
                    data.entry_id,
                    SaleRow {
                        entry_id: data.entry_id,
                        product_id,
                        customer_id: data.customer_id,
                        quantity: data.quantity,
                        cost: data.cost,
                        date: data.date,
                    },
                );
            }
            StockEvent::SaleReversed(data) => {
                state.rows.remove(&data.entry_id);
            }
            StockEvent::StockClosed(_) => {
                state.rows.retain(|_, row| row.product_id != product_id);
            }
            _ => {}
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

impl ReadModel for SalesLedgerView {
    fn name(&self) -> &'static str {
        "SalesLedgerView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.rows.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainEvent;

    fn envelope(product_id: AggregateId, version: i64, event: &StockEvent) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(product_id)
            .aggregate_type(StockRecord::aggregate_type())
            .event_type(event.event_type())
            .version(event_store::Version::new(version))
            .payload(event)
            .unwrap()
            .build()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[tokio::test]
    async fn recorded_sales_are_listed() {
        let view = SalesLedgerView::new();
        let product_id = AggregateId::new();
        let customer_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::sale_recorded(
                entry_id,
                customer_id,
                Quantity::from_units(4),
                Money::from_cents(4200),
                date(2),
            ),
        ))
        .await
        .unwrap();

        let row = view.get(entry_id).await.unwrap();
        assert_eq!(row.cost, Money::from_cents(4200));
        assert_eq!(row.customer_id, customer_id);
    }

    #[tokio::test]
    async fn reversed_sale_disappears() {
        let view = SalesLedgerView::new();
        let product_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::sale_recorded(
                entry_id,
                AggregateId::new(),
                Quantity::from_units(4),
                Money::from_cents(400),
                date(2),
            ),
        ))
        .await
        .unwrap();

        let reversed = StockEvent::SaleReversed(domain::stock::SaleReversedData {
            entry_id,
            quantity: Quantity::from_units(4),
        });
        view.handle(&envelope(product_id, 2, &reversed)).await.unwrap();

        assert!(view.all().await.is_empty());
    }

    #[tokio::test]
    async fn customer_filter_only_returns_their_sales() {
        let view = SalesLedgerView::new();
        let product_id = AggregateId::new();
        let anna = AggregateId::new();
        let boris = AggregateId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::sale_recorded(
                EntryId::new(),
                anna,
                Quantity::from_units(1),
                Money::from_cents(100),
                date(1),
            ),
        ))
        .await
        .unwrap();
        view.handle(&envelope(
            product_id,
            2,
            &StockEvent::sale_recorded(
                EntryId::new(),
                boris,
                Quantity::from_units(2),
                Money::from_cents(200),
                date(2),
            ),
        ))
        .await
        .unwrap();

        let rows = view.for_customer(anna).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, anna);
    }
}
