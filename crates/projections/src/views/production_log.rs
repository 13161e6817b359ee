//! Production log read model — live production entries across products.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::AggregateId;
use domain::{Aggregate, EntryId, Quantity, StockEvent, StockRecord};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A live production entry.
#[derive(Debug, Clone)]
pub struct ProductionRow {
    pub entry_id: EntryId,
    pub product_id: AggregateId,
    pub quantity: Quantity,
    pub date: NaiveDate,
}

struct ProductionLogState {
    rows: HashMap<EntryId, ProductionRow>,
    position: ProjectionPosition,
}

/// Read model view of all live production entries.
///
/// Reversed entries disappear; an edit shows up as the re-logged entry
/// under the same id.
#[derive(Clone)]
pub struct ProductionLogView {
    state: Arc<RwLock<ProductionLogState>>,
}

impl ProductionLogView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ProductionLogState {
                rows: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a production entry by id.
    pub async fn get(&self, entry_id: EntryId) -> Option<ProductionRow> {
        self.state.read().await.rows.get(&entry_id).cloned()
    }

    /// Lists all production entries, ordered by date then entry id.
    pub async fn all(&self) -> Vec<ProductionRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.entry_id.cmp(&b.entry_id)));
        rows
    }
}

impl Default for ProductionLogView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ProductionLogView {
    fn name(&self) -> &'static str {
        "ProductionLogView"
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
            StockEvent::ProductionLogged(data) => {
                state.rows.insert(
                    data.entry_id,
                    ProductionRow {
                        entry_id: data.entry_id,
                        product_id,
                        quantity: data.quantity,
                        date: data.date,
                    },
                );
            }
            StockEvent::ProductionReversed(data) => {
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

impl ReadModel for ProductionLogView {
    fn name(&self) -> &'static str {
        "ProductionLogView"
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
    async fn logged_entries_are_listed_in_date_order() {
        let view = ProductionLogView::new();
        let product_id = AggregateId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::production_logged(EntryId::new(), Quantity::from_units(5), date(9)),
        ))
        .await
        .unwrap();
        view.handle(&envelope(
            product_id,
            2,
            &StockEvent::production_logged(EntryId::new(), Quantity::from_units(3), date(2)),
        ))
        .await
        .unwrap();

        let rows = view.all().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2));
        assert_eq!(rows[1].date, date(9));
    }

    #[tokio::test]
    async fn reversed_entry_disappears() {
        let view = ProductionLogView::new();
        let product_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::production_logged(entry_id, Quantity::from_units(5), date(1)),
        ))
        .await
        .unwrap();

        let reversed = StockEvent::ProductionReversed(domain::stock::ProductionReversedData {
            entry_id,
            quantity: Quantity::from_units(5),
        });
        view.handle(&envelope(product_id, 2, &reversed)).await.unwrap();

        assert!(view.get(entry_id).await.is_none());
        assert!(view.all().await.is_empty());
    }

    #[tokio::test]
    async fn relogged_entry_replaces_the_row() {
        let view = ProductionLogView::new();
        let product_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(
            product_id,
            1,
            &StockEvent::production_logged(entry_id, Quantity::from_units(5), date(1)),
        ))
        .await
        .unwrap();
        view.handle(&envelope(
            product_id,
            2,
            &StockEvent::production_logged(entry_id, Quantity::from_units(8), date(2)),
        ))
        .await
        .unwrap();

        let row = view.get(entry_id).await.unwrap();
        assert_eq!(row.quantity, Quantity::from_units(8));
        assert_eq!(view.all().await.len(), 1);
    }
}
