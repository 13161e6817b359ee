//! Returns ledger read model — live wax return entries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::AggregateId;
use domain::{Aggregate, BalanceEvent, CustomerBalance, EntryId, Material, Money, Quantity};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A live wax return entry.
#[derive(Debug, Clone)]
pub struct ReturnRow {
    pub entry_id: EntryId,
    pub customer_id: AggregateId,
    pub material: Material,
    pub weight: Quantity,
    pub amount: Money,
    pub return_date: NaiveDate,
    pub note: Option<String>,
}

struct ReturnsLedgerState {
    rows: HashMap<EntryId, ReturnRow>,
    position: ProjectionPosition,
}

/// Read model view of all live wax returns, sourced from the balance
/// stream (ReturnCredited carries the full return details).
#[derive(Clone)]
pub struct ReturnsLedgerView {
    state: Arc<RwLock<ReturnsLedgerState>>,
}

impl ReturnsLedgerView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ReturnsLedgerState {
                rows: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a return entry by id.
    pub async fn get(&self, entry_id: EntryId) -> Option<ReturnRow> {
        self.state.read().await.rows.get(&entry_id).cloned()
    }

    /// Lists all return entries, ordered by date then entry id.
    pub async fn all(&self) -> Vec<ReturnRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state.rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            a.return_date
                .cmp(&b.return_date)
                .then(a.entry_id.cmp(&b.entry_id))
        });
        rows
    }

    /// Lists a customer's return entries, ordered by date then entry id.
    pub async fn for_customer(&self, customer_id: AggregateId) -> Vec<ReturnRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| row.customer_id == customer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.return_date
                .cmp(&b.return_date)
                .then(a.entry_id.cmp(&b.entry_id))
        });
        rows
    }
}

impl Default for ReturnsLedgerView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ReturnsLedgerView {
    fn name(&self) -> &'static str {
        "ReturnsLedgerView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;

        if event.aggregate_type != CustomerBalance::aggregate_type() {
            state.position = state.position.advance();
            return Ok(());
        }

        let balance_event: BalanceEvent = event.decode()?;
        let customer_id = event.aggregate_id;

        match balance_event {
            BalanceEvent::ReturnCredited(data) => {
                state.rows.insert(
                    data.entry_id,
                    ReturnRow {
                        entry_id: data.entry_id,
                        customer_id,
                        material: data.material,
                        weight: data.weight,
                        amount: data.amount,
                        return_date: data.return_date,
                        note: data.note,
                    },
                );
            }
            BalanceEvent::ReturnCreditReversed(data) => {
                state.rows.remove(&data.entry_id);
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

impl ReadModel for ReturnsLedgerView {
    fn name(&self) -> &'static str {
        "ReturnsLedgerView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.rows.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainEvent;

    fn envelope(customer_id: AggregateId, version: i64, event: &BalanceEvent) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(customer_id)
            .aggregate_type(CustomerBalance::aggregate_type())
            .event_type(event.event_type())
            .version(event_store::Version::new(version))
            .payload(event)
            .unwrap()
            .build()
    }

    fn credited(entry_id: EntryId, day: u32) -> BalanceEvent {
        BalanceEvent::ReturnCredited(domain::balance::ReturnCreditedData {
            entry_id,
            material: Material::Brown,
            weight: Quantity::from_units(3),
            amount: Money::from_cents(210),
            return_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            note: Some("crumbled blocks".to_string()),
        })
    }

    #[tokio::test]
    async fn credited_returns_are_listed_with_details() {
        let view = ReturnsLedgerView::new();
        let customer_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(customer_id, 1, &credited(entry_id, 3)))
            .await
            .unwrap();

        let row = view.get(entry_id).await.unwrap();
        assert_eq!(row.material, Material::Brown);
        assert_eq!(row.amount, Money::from_cents(210));
        assert_eq!(row.note.as_deref(), Some("crumbled blocks"));
    }

    #[tokio::test]
    async fn reversed_return_disappears() {
        let view = ReturnsLedgerView::new();
        let customer_id = AggregateId::new();
        let entry_id = EntryId::new();

        view.handle(&envelope(customer_id, 1, &credited(entry_id, 3)))
            .await
            .unwrap();

        let reversed =
            BalanceEvent::ReturnCreditReversed(domain::balance::ReturnCreditReversedData {
                entry_id,
                amount: Money::from_cents(210),
            });
        view.handle(&envelope(customer_id, 2, &reversed))
            .await
            .unwrap();

        assert!(view.all().await.is_empty());
    }
}
