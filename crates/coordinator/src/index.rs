//! Entry index: maps ledger entry ids back to their aggregates.
//!
//! REST callers address productions, sales, returns, and leave entries by
//! entry id alone. The index resolves an entry id to the aggregate(s) that
//! hold it, and is rebuilt from the event log on startup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use common::AggregateId;
use domain::{
    Aggregate, BalanceEvent, CustomerBalance, EntryId, LeaveAccount, LeaveEvent, Money,
    Quantity, StockEvent, StockRecord,
};
use event_store::{EventQuery, EventStore};
use tokio::sync::RwLock;

use crate::error::Result;

/// Where a sale entry lives and what it recorded.
#[derive(Debug, Clone)]
pub struct SaleRef {
    pub product_id: AggregateId,
    pub customer_id: AggregateId,
    pub quantity: Quantity,
    pub cost: Money,
    pub date: NaiveDate,
}

/// Where a production entry lives and what it recorded.
#[derive(Debug, Clone)]
pub struct ProductionRef {
    pub product_id: AggregateId,
    pub quantity: Quantity,
    pub date: NaiveDate,
}

#[derive(Default)]
struct IndexState {
    productions: HashMap<EntryId, ProductionRef>,
    sales: HashMap<EntryId, SaleRef>,
    returns: HashMap<EntryId, AggregateId>,
    leaves: HashMap<EntryId, AggregateId>,
}

/// Shared, rebuildable entry-to-aggregate index.
#[derive(Clone, Default)]
pub struct EntryIndex {
    inner: Arc<RwLock<IndexState>>,
}

impl EntryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replays the event log and rebuilds the index from scratch.
    pub async fn rebuild<S: EventStore>(&self, store: &S) -> Result<()> {
        let mut state = IndexState::default();

        let stock_events = store
            .query_events(EventQuery::new().aggregate_type(StockRecord::aggregate_type()))
            .await?;
        for envelope in stock_events {
            let event: StockEvent = envelope.decode()?;
            apply_stock_event(&mut state, envelope.aggregate_id, event);
        }

        let balance_events = store
            .query_events(EventQuery::new().aggregate_type(CustomerBalance::aggregate_type()))
            .await?;
        for envelope in balance_events {
            let event: BalanceEvent = envelope.decode()?;
            apply_balance_event(&mut state, envelope.aggregate_id, event);
        }

        let leave_events = store
            .query_events(EventQuery::new().aggregate_type(LeaveAccount::aggregate_type()))
            .await?;
        for envelope in leave_events {
            let event: LeaveEvent = envelope.decode()?;
            apply_leave_event(&mut state, envelope.aggregate_id, event);
        }

        let mut inner = self.inner.write().await;
        *inner = state;

        tracing::info!(
            productions = inner.productions.len(),
            sales = inner.sales.len(),
            returns = inner.returns.len(),
            leaves = inner.leaves.len(),
            "entry index rebuilt"
        );
        Ok(())
    }

    pub async fn record_production(&self, entry_id: EntryId, entry: ProductionRef) {
        self.inner.write().await.productions.insert(entry_id, entry);
    }

    pub async fn remove_production(&self, entry_id: EntryId) {
        self.inner.write().await.productions.remove(&entry_id);
    }

    pub async fn production(&self, entry_id: EntryId) -> Option<ProductionRef> {
        self.inner.read().await.productions.get(&entry_id).cloned()
    }

    pub async fn record_sale(&self, entry_id: EntryId, entry: SaleRef) {
        self.inner.write().await.sales.insert(entry_id, entry);
    }

    pub async fn remove_sale(&self, entry_id: EntryId) {
        self.inner.write().await.sales.remove(&entry_id);
    }

    pub async fn sale(&self, entry_id: EntryId) -> Option<SaleRef> {
        self.inner.read().await.sales.get(&entry_id).cloned()
    }

    pub async fn record_return(&self, entry_id: EntryId, customer_id: AggregateId) {
        self.inner.write().await.returns.insert(entry_id, customer_id);
    }

    pub async fn remove_return(&self, entry_id: EntryId) {
        self.inner.write().await.returns.remove(&entry_id);
    }

    pub async fn return_customer(&self, entry_id: EntryId) -> Option<AggregateId> {
        self.inner.read().await.returns.get(&entry_id).copied()
    }

    pub async fn record_leave(&self, entry_id: EntryId, worker_id: AggregateId) {
        self.inner.write().await.leaves.insert(entry_id, worker_id);
    }

    pub async fn remove_leave(&self, entry_id: EntryId) {
        self.inner.write().await.leaves.remove(&entry_id);
    }

    pub async fn remove_leaves_for_worker(&self, worker_id: AggregateId) {
        self.inner
            .write()
            .await
            .leaves
            .retain(|_, worker| *worker != worker_id);
    }

    pub async fn leave_worker(&self, entry_id: EntryId) -> Option<AggregateId> {
        self.inner.read().await.leaves.get(&entry_id).copied()
    }

    /// True while any live sale or return entry references the customer.
    pub async fn customer_has_entries(&self, customer_id: AggregateId) -> bool {
        let inner = self.inner.read().await;
        inner.sales.values().any(|s| s.customer_id == customer_id)
            || inner.returns.values().any(|c| *c == customer_id)
    }
}

fn apply_stock_event(state: &mut IndexState, product_id: AggregateId, event: StockEvent) {
    match event {
        StockEvent::ProductionLogged(data) => {
            state.productions.insert(
                data.entry_id,
                ProductionRef {
                    product_id,
                    quantity: data.quantity,
                    date: data.date,
                },
            );
        }
        StockEvent::SaleRecorded(data) => {
            state.sales.insert(
                data.entry_id,
                SaleRef {
                    product_id,
                    customer_id: data.customer_id,
                    quantity: data.quantity,
                    cost: data.cost,
                    date: data.date,
                },
            );
        }
        StockEvent::ProductionReversed(data) => {
            state.productions.remove(&data.entry_id);
        }
        StockEvent::SaleReversed(data) => {
            state.sales.remove(&data.entry_id);
        }
        StockEvent::StockClosed(_) => {
            state.productions.retain(|_, p| p.product_id != product_id);
            state.sales.retain(|_, s| s.product_id != product_id);
        }
        StockEvent::StockOpened(_) | StockEvent::StockAdjusted(_) => {}
    }
}

fn apply_balance_event(state: &mut IndexState, customer_id: AggregateId, event: BalanceEvent) {
    match event {
        BalanceEvent::ReturnCredited(data) => {
            state.returns.insert(data.entry_id, customer_id);
        }
        BalanceEvent::ReturnCreditReversed(data) => {
            state.returns.remove(&data.entry_id);
        }
        _ => {}
    }
}

fn apply_leave_event(state: &mut IndexState, worker_id: AggregateId, event: LeaveEvent) {
    match event {
        LeaveEvent::LeaveRequested(data) => {
            state.leaves.insert(data.entry_id, worker_id);
        }
        LeaveEvent::LeaveDeleted(data) => {
            state.leaves.remove(&data.entry_id);
        }
        _ => {}
    }
}
