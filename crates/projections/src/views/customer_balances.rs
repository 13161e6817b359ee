//! Customer balances read model — debt, credit, and net per customer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Aggregate, BalanceEvent, CustomerBalance, Money};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A customer's running balance. Net is debt minus credit; negative
/// means the store owes the customer.
#[derive(Debug, Clone)]
pub struct BalanceRow {
    pub customer_id: AggregateId,
    pub debt: Money,
    pub credit: Money,
    pub balance: Money,
}

struct CustomerBalancesState {
    rows: HashMap<AggregateId, (Money, Money)>,
    position: ProjectionPosition,
}

/// Read model view of all customer balances.
#[derive(Clone)]
pub struct CustomerBalancesView {
    state: Arc<RwLock<CustomerBalancesState>>,
}

impl CustomerBalancesView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(CustomerBalancesState {
                rows: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a customer's balance. Customers with no balance record yet
    /// report all-zero.
    pub async fn get(&self, customer_id: AggregateId) -> BalanceRow {
        let (debt, credit) = self
            .state
            .read()
            .await
            .rows
            .get(&customer_id)
            .copied()
            .unwrap_or((Money::ZERO, Money::ZERO));
        BalanceRow {
            customer_id,
            debt,
            credit,
            balance: debt - credit,
        }
    }

    /// Lists all balances, ordered by customer id.
    pub async fn all(&self) -> Vec<BalanceRow> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .rows
            .iter()
            .map(|(customer_id, (debt, credit))| BalanceRow {
                customer_id: *customer_id,
                debt: *debt,
                credit: *credit,
                balance: *debt - *credit,
            })
            .collect();
        rows.sort_by_key(|r| r.customer_id);
        rows
    }
}

impl Default for CustomerBalancesView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for CustomerBalancesView {
    fn name(&self) -> &'static str {
        "CustomerBalancesView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;

        if event.aggregate_type != CustomerBalance::aggregate_type() {
            state.position = state.position.advance();
            return Ok(());
        }

        let balance_event: BalanceEvent = event.decode()?;
        let customer_id = event.aggregate_id;
        let entry = state.rows.entry(customer_id).or_default();

        match balance_event {
            BalanceEvent::BalanceOpened(_) => {}
            BalanceEvent::SaleCharged(data) => entry.0 += data.amount,
            BalanceEvent::SaleChargeReversed(data) => entry.0 -= data.amount,
            BalanceEvent::ReturnCredited(data) => entry.1 += data.amount,
            BalanceEvent::ReturnCreditReversed(data) => entry.1 -= data.amount,
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

impl ReadModel for CustomerBalancesView {
    fn name(&self) -> &'static str {
        "CustomerBalancesView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.rows.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::{DomainEvent, EntryId, Material, Quantity};

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

    fn charged(amount_cents: i64) -> BalanceEvent {
        BalanceEvent::SaleCharged(domain::balance::SaleChargedData {
            entry_id: EntryId::new(),
            amount: Money::from_cents(amount_cents),
        })
    }

    #[tokio::test]
    async fn charges_and_credits_net_out() {
        let view = CustomerBalancesView::new();
        let customer_id = AggregateId::new();

        view.handle(&envelope(customer_id, 1, &charged(4200)))
            .await
            .unwrap();

        let credited = BalanceEvent::ReturnCredited(domain::balance::ReturnCreditedData {
            entry_id: EntryId::new(),
            material: Material::Pure,
            weight: Quantity::from_units(2),
            amount: Money::from_cents(640),
            return_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            note: None,
        });
        view.handle(&envelope(customer_id, 2, &credited))
            .await
            .unwrap();

        let row = view.get(customer_id).await;
        assert_eq!(row.debt, Money::from_cents(4200));
        assert_eq!(row.credit, Money::from_cents(640));
        assert_eq!(row.balance, Money::from_cents(3560));
    }

    #[tokio::test]
    async fn unknown_customer_reads_zero() {
        let view = CustomerBalancesView::new();
        let row = view.get(AggregateId::new()).await;
        assert_eq!(row.balance, Money::ZERO);
    }

    #[tokio::test]
    async fn reversal_restores_the_balance() {
        let view = CustomerBalancesView::new();
        let customer_id = AggregateId::new();
        let entry_id = EntryId::new();

        let charge = BalanceEvent::SaleCharged(domain::balance::SaleChargedData {
            entry_id,
            amount: Money::from_cents(1000),
        });
        view.handle(&envelope(customer_id, 1, &charge)).await.unwrap();

        let reversed = BalanceEvent::SaleChargeReversed(domain::balance::SaleChargeReversedData {
            entry_id,
            amount: Money::from_cents(1000),
        });
        view.handle(&envelope(customer_id, 2, &reversed))
            .await
            .unwrap();

        assert_eq!(view.get(customer_id).await.balance, Money::ZERO);
    }
}
