//! The customer balance aggregate.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::values::{EntryId, Material, Money, Quantity};

use super::events::{
    BalanceEvent, BalanceOpenedData, ReturnCreditReversedData, ReturnCreditedData,
    SaleChargeReversedData, SaleChargedData,
};

/// Errors that can occur on balance commands.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Charge or credit amount was negative.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Money },

    /// Returned weight was zero or negative.
    #[error("Invalid weight: {weight}")]
    InvalidWeight { weight: Quantity },

    /// The referenced charge or credit entry does not exist on this balance.
    #[error("Balance entry not found: {entry_id}")]
    EntryNotFound { entry_id: EntryId },
}

/// A recorded return line, kept for reversal and the returns ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub material: Material,
    pub weight: Quantity,
    pub amount: Money,
    pub return_date: NaiveDate,
    pub note: Option<String>,
}

/// The per-customer balance aggregate.
///
/// Debt accumulates from sale charges, credit from wax returns. The
/// displayed balance is `debt − credit` and may be negative, meaning
/// the store owes the customer.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CustomerBalance {
    id: Option<AggregateId>,
    version: Version,
    debt: Money,
    credit: Money,
    charges: HashMap<EntryId, Money>,
    credits: HashMap<EntryId, ReturnLine>,
}

impl CustomerBalance {
    /// Total of all live sale charges.
    pub fn debt(&self) -> Money {
        self.debt
    }

    /// Total of all live return credits.
    pub fn credit(&self) -> Money {
        self.credit
    }

    /// Net balance: debt minus credit.
    pub fn balance(&self) -> Money {
        self.debt - self.credit
    }

    /// Returns a live charge amount, if present.
    pub fn charge(&self, entry_id: EntryId) -> Option<Money> {
        self.charges.get(&entry_id).copied()
    }

    /// Returns a live return line, if present.
    pub fn return_line(&self, entry_id: EntryId) -> Option<&ReturnLine> {
        self.credits.get(&entry_id)
    }

    /// Returns true if any charges or credits are live.
    pub fn has_entries(&self) -> bool {
        !self.charges.is_empty() || !self.credits.is_empty()
    }

    // --- Commands ---

    /// Adds a sale cost to the customer's debt.
    pub fn charge_sale(
        &self,
        customer_id: AggregateId,
        entry_id: EntryId,
        amount: Money,
    ) -> Result<Vec<BalanceEvent>, BalanceError> {
        if amount.is_negative() {
            return Err(BalanceError::InvalidAmount { amount });
        }

        let mut events = self.open_if_needed(customer_id);
        events.push(BalanceEvent::SaleCharged(SaleChargedData {
            entry_id,
            amount,
        }));
        Ok(events)
    }

    /// Adds a wax return's value to the customer's credit.
    #[allow(clippy::too_many_arguments)]
    pub fn credit_return(
        &self,
        customer_id: AggregateId,
        entry_id: EntryId,
        material: Material,
        weight: Quantity,
        amount: Money,
        return_date: NaiveDate,
        note: Option<String>,
    ) -> Result<Vec<BalanceEvent>, BalanceError> {
        if !weight.is_positive() {
            return Err(BalanceError::InvalidWeight { weight });
        }

        let mut events = self.open_if_needed(customer_id);
        events.push(BalanceEvent::ReturnCredited(ReturnCreditedData {
            entry_id,
            material,
            weight,
            amount,
            return_date,
            note,
        }));
        Ok(events)
    }

    /// Reverses a sale charge, removing it from debt.
    pub fn reverse_charge(&self, entry_id: EntryId) -> Result<Vec<BalanceEvent>, BalanceError> {
        let amount = self
            .charges
            .get(&entry_id)
            .copied()
            .ok_or(BalanceError::EntryNotFound { entry_id })?;

        Ok(vec![BalanceEvent::SaleChargeReversed(
            SaleChargeReversedData { entry_id, amount },
        )])
    }

    /// Reverses a return credit, removing it from credit.
    pub fn reverse_credit(&self, entry_id: EntryId) -> Result<Vec<BalanceEvent>, BalanceError> {
        let amount = self
            .credits
            .get(&entry_id)
            .map(|line| line.amount)
            .ok_or(BalanceError::EntryNotFound { entry_id })?;

        Ok(vec![BalanceEvent::ReturnCreditReversed(
            ReturnCreditReversedData { entry_id, amount },
        )])
    }

    fn open_if_needed(&self, customer_id: AggregateId) -> Vec<BalanceEvent> {
        if self.id.is_none() {
            vec![BalanceEvent::BalanceOpened(BalanceOpenedData {
                customer_id,
            })]
        } else {
            vec![]
        }
    }

    // --- Event application ---

    fn apply_charged(&mut self, entry_id: EntryId, amount: Money) {
        self.debt += amount;
        self.charges.insert(entry_id, amount);
    }

    fn apply_credited(&mut self, entry_id: EntryId, line: ReturnLine) {
        self.credit += line.amount;
        self.credits.insert(entry_id, line);
    }

    fn apply_charge_reversed(&mut self, entry_id: EntryId, amount: Money) {
        self.debt -= amount;
        self.charges.remove(&entry_id);
        // Accumulator drift from the live entries is a programming error.
        debug_assert_eq!(
            self.debt,
            self.charges.values().copied().fold(Money::ZERO, |a, b| a + b)
        );
    }

    fn apply_credit_reversed(&mut self, entry_id: EntryId, amount: Money) {
        self.credit -= amount;
        self.credits.remove(&entry_id);
        debug_assert_eq!(
            self.credit,
            self.credits.values().fold(Money::ZERO, |a, l| a + l.amount)
        );
    }
}

impl Aggregate for CustomerBalance {
    type Event = BalanceEvent;
    type Error = BalanceError;

    fn aggregate_type() -> &'static str {
        "CustomerBalance"
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
            BalanceEvent::BalanceOpened(data) => {
                self.id = Some(data.customer_id);
            }
            BalanceEvent::SaleCharged(data) => self.apply_charged(data.entry_id, data.amount),
            BalanceEvent::ReturnCredited(data) => self.apply_credited(
                data.entry_id,
                ReturnLine {
                    material: data.material,
                    weight: data.weight,
                    amount: data.amount,
                    return_date: data.return_date,
                    note: data.note,
                },
            ),
            BalanceEvent::SaleChargeReversed(data) => {
                self.apply_charge_reversed(data.entry_id, data.amount)
            }
            BalanceEvent::ReturnCreditReversed(data) => {
                self.apply_credit_reversed(data.entry_id, data.amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn opened_balance() -> (CustomerBalance, AggregateId) {
        let customer_id = AggregateId::new();
        let mut balance = CustomerBalance::default();
        balance.apply_events(
            balance
                .charge_sale(customer_id, EntryId::new(), Money::ZERO)
                .unwrap(),
        );
        (balance, customer_id)
    }

    #[test]
    fn charge_increases_debt() {
        let (mut balance, customer_id) = opened_balance();

        balance.apply_events(
            balance
                .charge_sale(customer_id, EntryId::new(), Money::from_cents(4000))
                .unwrap(),
        );

        assert_eq!(balance.debt(), Money::from_cents(4000));
        assert_eq!(balance.balance(), Money::from_cents(4000));
    }

    #[test]
    fn credit_decreases_balance() {
        let (mut balance, customer_id) = opened_balance();
        balance.apply_events(
            balance
                .charge_sale(customer_id, EntryId::new(), Money::from_cents(1000))
                .unwrap(),
        );

        balance.apply_events(
            balance
                .credit_return(
                    customer_id,
                    EntryId::new(),
                    Material::Pure,
                    Quantity::from_units(10),
                    Money::from_cents(3200),
                    date(),
                    None,
                )
                .unwrap(),
        );

        assert_eq!(balance.credit(), Money::from_cents(3200));
        // Store owes the customer
        assert_eq!(balance.balance(), Money::from_cents(-2200));
        assert!(balance.balance().is_negative());
    }

    #[test]
    fn negative_charge_is_rejected() {
        let (balance, customer_id) = opened_balance();
        let result = balance.charge_sale(customer_id, EntryId::new(), Money::from_cents(-1));
        assert!(matches!(result, Err(BalanceError::InvalidAmount { .. })));
    }

    #[test]
    fn zero_weight_return_is_rejected() {
        let (balance, customer_id) = opened_balance();
        let result = balance.credit_return(
            customer_id,
            EntryId::new(),
            Material::Brown,
            Quantity::ZERO,
            Money::ZERO,
            date(),
            None,
        );
        assert!(matches!(result, Err(BalanceError::InvalidWeight { .. })));
    }

    #[test]
    fn reverse_charge_restores_balance() {
        let (mut balance, customer_id) = opened_balance();
        let entry_id = EntryId::new();
        balance.apply_events(
            balance
                .charge_sale(customer_id, entry_id, Money::from_cents(4000))
                .unwrap(),
        );

        balance.apply_events(balance.reverse_charge(entry_id).unwrap());

        assert_eq!(balance.debt(), Money::ZERO);
        assert!(balance.charge(entry_id).is_none());
    }

    #[test]
    fn reverse_unknown_entry_is_not_found() {
        let (balance, _) = opened_balance();
        assert!(matches!(
            balance.reverse_charge(EntryId::new()),
            Err(BalanceError::EntryNotFound { .. })
        ));
        assert!(matches!(
            balance.reverse_credit(EntryId::new()),
            Err(BalanceError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn balance_is_net_of_live_entries_under_interleaving() {
        let (mut balance, customer_id) = opened_balance();
        let sale_a = EntryId::new();
        let sale_b = EntryId::new();
        let return_a = EntryId::new();

        balance.apply_events(
            balance
                .charge_sale(customer_id, sale_a, Money::from_cents(1000))
                .unwrap(),
        );
        balance.apply_events(
            balance
                .credit_return(
                    customer_id,
                    return_a,
                    Material::Brown,
                    Quantity::from_units(2),
                    Money::from_cents(140),
                    date(),
                    Some("scraps".to_string()),
                )
                .unwrap(),
        );
        balance.apply_events(
            balance
                .charge_sale(customer_id, sale_b, Money::from_cents(500))
                .unwrap(),
        );
        balance.apply_events(balance.reverse_charge(sale_a).unwrap());

        // Only sale_b and return_a remain live
        assert_eq!(balance.balance(), Money::from_cents(500 - 140));
    }
}
