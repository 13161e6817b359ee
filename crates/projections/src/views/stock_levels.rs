//! Stock levels read model — on-hand quantity per product.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Aggregate, Quantity, StockEvent, StockRecord};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// On-hand stock for one product.
#[derive(Debug, Clone)]
pub struct StockLevel {
    pub product_id: AggregateId,
    pub quantity: Quantity,
}

struct StockLevelsState {
    levels: HashMap<AggregateId, Quantity>,
    position: ProjectionPosition,
}

/// Read model view of current stock per product.
///
/// Folds the stock stream: productions add, sales subtract, reversals
/// undo, adjustments overwrite, and a closed record drops out entirely.
#[derive(Clone)]
pub struct StockLevelsView {
    state: Arc<RwLock<StockLevelsState>>,
}

impl StockLevelsView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StockLevelsState {
                levels: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets the on-hand quantity for a product, if a record is open.
    pub async fn get(&self, product_id: AggregateId) -> Option<Quantity> {
        self.state.read().await.levels.get(&product_id).copied()
    }

    /// Lists all stock levels, ordered by product id.
    pub async fn all(&self) -> Vec<StockLevel> {
        let state = self.state.read().await;
        let mut levels: Vec<_> = state
            .levels
            .iter()
            .map(|(product_id, quantity)| StockLevel {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect();
        levels.sort_by_key(|l| l.product_id);
        levels
    }
}

impl Default for StockLevelsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for StockLevelsView {
    fn name(&self) -> &'static str {
        "StockLevelsView"
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
            StockEvent::StockOpened(_) => {
                state.levels.insert(product_id, Quantity::ZERO);
            }
            StockEvent::ProductionLogged(data) => {
                *state.levels.entry(product_id).or_default() += data.quantity;
            }
            StockEvent::SaleRecorded(data) => {
                *state.levels.entry(product_id).or_default() -= data.quantity;
            }
            StockEvent::ProductionReversed(data) => {
                *state.levels.entry(product_id).or_default() -= data.quantity;
            }
            StockEvent::SaleReversed(data) => {
                *state.levels.entry(product_id).or_default() += data.quantity;
            }
            StockEvent::StockAdjusted(data) => {
                state.levels.insert(product_id, data.quantity);
            }
            StockEvent::StockClosed(_) => {
                state.levels.remove(&product_id);
            }
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.levels.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for StockLevelsView {
    fn name(&self) -> &'static str {
        "StockLevelsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.levels.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::{DomainEvent, EntryId, Money};

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

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn productions_and_sales_fold_into_quantity() {
        let view = StockLevelsView::new();
        let product_id = AggregateId::new();

        view.handle(&envelope(product_id, 1, &StockEvent::opened(product_id)))
            .await
            .unwrap();
        view.handle(&envelope(
            product_id,
            2,
            &StockEvent::production_logged(EntryId::new(), Quantity::from_units(10), date()),
        ))
        .await
        .unwrap();
        view.handle(&envelope(
            product_id,
            3,
            &StockEvent::sale_recorded(
                EntryId::new(),
                AggregateId::new(),
                Quantity::from_units(4),
                Money::from_cents(400),
                date(),
            ),
        ))
        .await
        .unwrap();

        assert_eq!(view.get(product_id).await, Some(Quantity::from_units(6)));
    }

    #[tokio::test]
    async fn closed_record_drops_out_of_listing() {
        let view = StockLevelsView::new();
        let product_id = AggregateId::new();

        view.handle(&envelope(product_id, 1, &StockEvent::opened(product_id)))
            .await
            .unwrap();
        assert_eq!(view.all().await.len(), 1);

        let closed = StockEvent::StockClosed(domain::stock::StockClosedData { product_id });
        view.handle(&envelope(product_id, 2, &closed)).await.unwrap();

        assert_eq!(view.get(product_id).await, None);
        assert!(view.all().await.is_empty());
    }

    #[tokio::test]
    async fn other_streams_only_advance_position() {
        let view = StockLevelsView::new();
        let event = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("CustomerBalance")
            .event_type("SaleCharged")
            .version(event_store::Version::new(1))
            .payload_raw(serde_json::json!({}))
            .build();

        view.handle(&event).await.unwrap();

        assert!(view.all().await.is_empty());
        assert_eq!(view.position().await.events_processed, 1);
    }

    #[tokio::test]
    async fn reset_clears_levels() {
        let view = StockLevelsView::new();
        let product_id = AggregateId::new();

        view.handle(&envelope(product_id, 1, &StockEvent::opened(product_id)))
            .await
            .unwrap();
        view.reset().await.unwrap();

        assert!(view.all().await.is_empty());
        assert_eq!(view.position().await.events_processed, 0);
    }
}
