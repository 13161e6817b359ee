//! Reconciliation coordinator: the single write path for ledger mutations.
//!
//! Every mutation that touches stock, balances, or leave goes through the
//! coordinator. It resolves registry references, takes the per-aggregate
//! locks, runs the domain commands, and keeps the entry index current.
//! Cross-stream operations (a sale writes both a stock record and a
//! customer balance) compensate already-appended events when a later
//! append fails, so replaying the log never shows a half-applied sale.

use std::time::Duration;

use chrono::NaiveDate;
use common::AggregateId;
use domain::{
    BalanceError, CommandHandler, CustomerBalance, CustomerDirectory, EntryId, LeaveAccount,
    LeaveError, Material, Money, ProductCatalog, Quantity, StockError, StockRecord, WorkerRoster,
};
use event_store::EventStore;

use crate::error::{CoordinatorError, Result};
use crate::index::{EntryIndex, ProductionRef, SaleRef};
use crate::locks::AggregateLocks;

/// Outcome of a production mutation.
#[derive(Debug, Clone)]
pub struct ProductionReceipt {
    pub entry_id: EntryId,
    pub product_id: AggregateId,
    pub quantity: Quantity,
    pub date: NaiveDate,
    pub stock_on_hand: Quantity,
}

/// Outcome of a sale mutation.
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub entry_id: EntryId,
    pub product_id: AggregateId,
    pub customer_id: AggregateId,
    pub quantity: Quantity,
    pub cost: Money,
    pub date: NaiveDate,
    pub stock_on_hand: Quantity,
    pub customer_balance: Money,
}

/// Outcome of a wax return mutation.
#[derive(Debug, Clone)]
pub struct ReturnReceipt {
    pub entry_id: EntryId,
    pub customer_id: AggregateId,
    pub material: Material,
    pub weight: Quantity,
    pub amount: Money,
    pub return_date: NaiveDate,
    pub customer_balance: Money,
}

/// Outcome of a leave mutation.
#[derive(Debug, Clone)]
pub struct LeaveReceipt {
    pub entry_id: EntryId,
    pub worker_id: AggregateId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
    pub days_of_leave: i64,
}

/// Outcome of a storage mutation.
#[derive(Debug, Clone)]
pub struct StockReceipt {
    pub product_id: AggregateId,
    pub quantity: Quantity,
}

/// Coordinates ledger mutations across the three event streams and the
/// reference-data registries.
pub struct ReconciliationCoordinator<S>
where
    S: EventStore,
{
    stock: CommandHandler<S, StockRecord>,
    balances: CommandHandler<S, CustomerBalance>,
    leaves: CommandHandler<S, LeaveAccount>,
    products: ProductCatalog,
    customers: CustomerDirectory,
    workers: WorkerRoster,
    locks: AggregateLocks,
    index: EntryIndex,
}

impl<S> ReconciliationCoordinator<S>
where
    S: EventStore + Clone,
{
    /// Creates a coordinator over the given store and registries.
    pub fn new(
        store: S,
        products: ProductCatalog,
        customers: CustomerDirectory,
        workers: WorkerRoster,
        lock_wait: Duration,
    ) -> Self {
        Self {
            stock: CommandHandler::new(store.clone()),
            balances: CommandHandler::new(store.clone()),
            leaves: CommandHandler::new(store),
            products,
            customers,
            workers,
            locks: AggregateLocks::new(lock_wait),
            index: EntryIndex::new(),
        }
    }

    /// Rebuilds the entry index from the event log. Run once on startup.
    pub async fn rebuild_index(&self) -> Result<()> {
        self.index.rebuild(self.stock.store()).await
    }

    /// The product catalog this coordinator resolves against.
    pub fn products(&self) -> &ProductCatalog {
        &self.products
    }

    /// The customer directory this coordinator resolves against.
    pub fn customers(&self) -> &CustomerDirectory {
        &self.customers
    }

    /// The worker roster this coordinator resolves against.
    pub fn workers(&self) -> &WorkerRoster {
        &self.workers
    }

    // --- Production ---

    /// Logs a production run against a product's stock record.
    #[tracing::instrument(skip(self))]
    pub async fn log_production(
        &self,
        product_id: AggregateId,
        quantity: Quantity,
        date: NaiveDate,
    ) -> Result<ProductionReceipt> {
        self.products.get(product_id).await?;
        let _held = self.locks.acquire(&[product_id]).await?;

        let entry_id = EntryId::new();
        let result = self
            .stock
            .execute(product_id, |record| {
                record.log_production(product_id, entry_id, quantity, date)
            })
            .await?;

        self.index
            .record_production(
                entry_id,
                ProductionRef {
                    product_id,
                    quantity,
                    date,
                },
            )
            .await;

        metrics::counter!("ledger_mutations_total", "operation" => "log_production").increment(1);
        Ok(ProductionReceipt {
            entry_id,
            product_id,
            quantity,
            date,
            stock_on_hand: result.aggregate.quantity(),
        })
    }

    /// Moves a production entry to new values (possibly a new product).
    ///
    /// The old entry is reversed and the entry id is re-logged with the
    /// new values, so downstream views see one entry, not two.
    #[tracing::instrument(skip(self))]
    pub async fn edit_production(
        &self,
        entry_id: EntryId,
        product_id: AggregateId,
        quantity: Quantity,
        date: NaiveDate,
    ) -> Result<ProductionReceipt> {
        let old = self
            .index
            .production(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;
        self.products.get(product_id).await?;
        if !quantity.is_positive() {
            return Err(StockError::InvalidQuantity { quantity }.into());
        }

        let _held = self.locks.acquire(&[old.product_id, product_id]).await?;

        // Reversal carries the only domain-level failure mode
        // (ConflictingReversal); nothing has been appended before it.
        self.stock
            .execute(old.product_id, |record| record.reverse_production(entry_id))
            .await?;

        let result = match self
            .stock
            .execute(product_id, |record| {
                record.log_production(product_id, entry_id, quantity, date)
            })
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.restore_production(&old, entry_id).await;
                return Err(e.into());
            }
        };

        self.index
            .record_production(
                entry_id,
                ProductionRef {
                    product_id,
                    quantity,
                    date,
                },
            )
            .await;

        metrics::counter!("ledger_mutations_total", "operation" => "edit_production").increment(1);
        Ok(ProductionReceipt {
            entry_id,
            product_id,
            quantity,
            date,
            stock_on_hand: result.aggregate.quantity(),
        })
    }

    /// Reverses a production entry, removing its quantity from stock.
    #[tracing::instrument(skip(self))]
    pub async fn delete_production(&self, entry_id: EntryId) -> Result<()> {
        let old = self
            .index
            .production(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;

        let _held = self.locks.acquire(&[old.product_id]).await?;

        self.stock
            .execute(old.product_id, |record| record.reverse_production(entry_id))
            .await?;
        self.index.remove_production(entry_id).await;

        metrics::counter!("ledger_mutations_total", "operation" => "delete_production")
            .increment(1);
        Ok(())
    }

    // --- Sales ---

    /// Records a sale: consumes stock and charges the customer's balance.
    ///
    /// When no cost is given it defaults to the product price scaled by
    /// the quantity, fixed at sale time.
    #[tracing::instrument(skip(self))]
    pub async fn record_sale(
        &self,
        customer_id: AggregateId,
        product_id: AggregateId,
        quantity: Quantity,
        date: NaiveDate,
        cost: Option<Money>,
    ) -> Result<SaleReceipt> {
        let start = std::time::Instant::now();
        let product = self.products.get(product_id).await?;
        self.customers.get(customer_id).await?;
        if !quantity.is_positive() {
            return Err(StockError::InvalidQuantity { quantity }.into());
        }
        let cost = cost.unwrap_or_else(|| product.price.scale_by(quantity));
        // Rejected before any append; the charge would only fail after
        // the stock event had already landed.
        if cost.is_negative() {
            return Err(BalanceError::InvalidAmount { amount: cost }.into());
        }

        let _held = self.locks.acquire(&[product_id, customer_id]).await?;

        let entry_id = EntryId::new();
        let stock_result = self
            .stock
            .execute(product_id, |record| {
                record.record_sale(product_id, entry_id, customer_id, quantity, cost, date)
            })
            .await?;

        let balance_result = match self
            .balances
            .execute(customer_id, |balance| {
                balance.charge_sale(customer_id, entry_id, cost)
            })
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // The stock append landed but the charge did not; put the
                // stock back so the log never shows an uncharged sale.
                self.restore_stock_after_failed_sale(product_id, entry_id)
                    .await;
                return Err(e.into());
            }
        };

        self.index
            .record_sale(
                entry_id,
                SaleRef {
                    product_id,
                    customer_id,
                    quantity,
                    cost,
                    date,
                },
            )
            .await;

        metrics::counter!("ledger_mutations_total", "operation" => "record_sale").increment(1);
        metrics::histogram!("ledger_sale_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(SaleReceipt {
            entry_id,
            product_id,
            customer_id,
            quantity,
            cost,
            date,
            stock_on_hand: stock_result.aggregate.quantity(),
            customer_balance: balance_result.aggregate.balance(),
        })
    }

    /// Rewrites a sale entry with new values, possibly moving it to a
    /// different product or customer.
    ///
    /// The old entry is reversed on both streams before the new values
    /// are applied under the same entry id. Feasibility is checked first
    /// under the union of the involved locks, so a doomed edit rejects
    /// before anything is appended.
    #[tracing::instrument(skip(self))]
    pub async fn edit_sale(
        &self,
        entry_id: EntryId,
        customer_id: AggregateId,
        product_id: AggregateId,
        quantity: Quantity,
        date: NaiveDate,
        cost: Option<Money>,
    ) -> Result<SaleReceipt> {
        let start = std::time::Instant::now();
        let old = self
            .index
            .sale(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;
        let product = self.products.get(product_id).await?;
        self.customers.get(customer_id).await?;
        if !quantity.is_positive() {
            return Err(StockError::InvalidQuantity { quantity }.into());
        }
        let cost = cost.unwrap_or_else(|| product.price.scale_by(quantity));
        if cost.is_negative() {
            return Err(BalanceError::InvalidAmount { amount: cost }.into());
        }

        let _held = self
            .locks
            .acquire(&[old.product_id, old.customer_id, product_id, customer_id])
            .await?;

        // Feasibility under the held locks: the new product must cover the
        // new quantity, counting back what the reversal will free up.
        let target = self.stock.load(product_id).await?;
        let mut available = target.quantity();
        if product_id == old.product_id {
            available += old.quantity;
        }
        if (available - quantity).is_negative() {
            return Err(StockError::InsufficientStock {
                available,
                requested: quantity,
            }
            .into());
        }

        self.stock
            .execute(old.product_id, |record| record.reverse_sale(entry_id))
            .await?;

        if let Err(e) = self
            .balances
            .execute(old.customer_id, |balance| balance.reverse_charge(entry_id))
            .await
        {
            self.restore_sale_on_stock(&old, entry_id).await;
            return Err(e.into());
        }

        let stock_result = match self
            .stock
            .execute(product_id, |record| {
                record.record_sale(product_id, entry_id, customer_id, quantity, cost, date)
            })
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.restore_charge(&old, entry_id).await;
                self.restore_sale_on_stock(&old, entry_id).await;
                return Err(e.into());
            }
        };

        let balance_result = match self
            .balances
            .execute(customer_id, |balance| {
                balance.charge_sale(customer_id, entry_id, cost)
            })
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.restore_stock_after_failed_sale(product_id, entry_id)
                    .await;
                self.restore_charge(&old, entry_id).await;
                self.restore_sale_on_stock(&old, entry_id).await;
                return Err(e.into());
            }
        };

        self.index
            .record_sale(
                entry_id,
                SaleRef {
                    product_id,
                    customer_id,
                    quantity,
                    cost,
                    date,
                },
            )
            .await;

        metrics::counter!("ledger_mutations_total", "operation" => "edit_sale").increment(1);
        metrics::histogram!("ledger_sale_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(SaleReceipt {
            entry_id,
            product_id,
            customer_id,
            quantity,
            cost,
            date,
            stock_on_hand: stock_result.aggregate.quantity(),
            customer_balance: balance_result.aggregate.balance(),
        })
    }

    /// Reverses a sale entry on both streams: stock returns, debt drops.
    #[tracing::instrument(skip(self))]
    pub async fn delete_sale(&self, entry_id: EntryId) -> Result<()> {
        let old = self
            .index
            .sale(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;

        let _held = self
            .locks
            .acquire(&[old.product_id, old.customer_id])
            .await?;

        self.stock
            .execute(old.product_id, |record| record.reverse_sale(entry_id))
            .await?;

        if let Err(e) = self
            .balances
            .execute(old.customer_id, |balance| balance.reverse_charge(entry_id))
            .await
        {
            self.restore_sale_on_stock(&old, entry_id).await;
            return Err(e.into());
        }

        self.index.remove_sale(entry_id).await;
        metrics::counter!("ledger_mutations_total", "operation" => "delete_sale").increment(1);
        Ok(())
    }

    // --- Returns ---

    /// Records a wax return, crediting the customer's balance at the
    /// material's fixed per-kilogram rate.
    #[tracing::instrument(skip(self))]
    pub async fn record_return(
        &self,
        customer_id: AggregateId,
        material: Material,
        weight: Quantity,
        return_date: NaiveDate,
        note: Option<String>,
    ) -> Result<ReturnReceipt> {
        self.customers.get(customer_id).await?;
        let amount = material.return_rate().scale_by(weight);

        let _held = self.locks.acquire(&[customer_id]).await?;

        let entry_id = EntryId::new();
        let result = self
            .balances
            .execute(customer_id, |balance| {
                balance.credit_return(
                    customer_id,
                    entry_id,
                    material,
                    weight,
                    amount,
                    return_date,
                    note.clone(),
                )
            })
            .await?;

        self.index.record_return(entry_id, customer_id).await;
        metrics::counter!("ledger_mutations_total", "operation" => "record_return").increment(1);
        Ok(ReturnReceipt {
            entry_id,
            customer_id,
            material,
            weight,
            amount,
            return_date,
            customer_balance: result.aggregate.balance(),
        })
    }

    /// Reverses a return credit.
    #[tracing::instrument(skip(self))]
    pub async fn delete_return(&self, entry_id: EntryId) -> Result<()> {
        let customer_id = self
            .index
            .return_customer(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;

        let _held = self.locks.acquire(&[customer_id]).await?;

        self.balances
            .execute(customer_id, |balance| balance.reverse_credit(entry_id))
            .await?;
        self.index.remove_return(entry_id).await;

        metrics::counter!("ledger_mutations_total", "operation" => "delete_return").increment(1);
        Ok(())
    }

    // --- Storage ---

    /// Opens an empty stock record for a product.
    #[tracing::instrument(skip(self))]
    pub async fn open_stock(&self, product_id: AggregateId) -> Result<StockReceipt> {
        self.products.get(product_id).await?;
        let _held = self.locks.acquire(&[product_id]).await?;

        let result = self
            .stock
            .execute(product_id, |record| record.open(product_id))
            .await?;

        metrics::counter!("ledger_mutations_total", "operation" => "open_stock").increment(1);
        Ok(StockReceipt {
            product_id,
            quantity: result.aggregate.quantity(),
        })
    }

    /// Sets a product's stock level to an explicit value.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: AggregateId,
        quantity: Quantity,
    ) -> Result<StockReceipt> {
        self.products.get(product_id).await?;
        let _held = self.locks.acquire(&[product_id]).await?;

        let result = self
            .stock
            .execute(product_id, |record| record.adjust_to(product_id, quantity))
            .await?;

        metrics::counter!("ledger_mutations_total", "operation" => "adjust_stock").increment(1);
        Ok(StockReceipt {
            product_id,
            quantity: result.aggregate.quantity(),
        })
    }

    /// Removes a product's stock record.
    #[tracing::instrument(skip(self))]
    pub async fn close_stock(&self, product_id: AggregateId) -> Result<()> {
        let _held = self.locks.acquire(&[product_id]).await?;

        self.stock
            .execute(product_id, |record| record.close(product_id))
            .await?;

        metrics::counter!("ledger_mutations_total", "operation" => "close_stock").increment(1);
        Ok(())
    }

    // --- Leave ---

    /// Requests a leave span for a worker. Overlapping spans are allowed;
    /// totals count entry days, not distinct calendar days.
    #[tracing::instrument(skip(self))]
    pub async fn request_leave(
        &self,
        worker_id: AggregateId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<LeaveReceipt> {
        self.workers.get(worker_id).await?;
        let _held = self.locks.acquire(&[worker_id]).await?;

        let entry_id = EntryId::new();
        let result = self
            .leaves
            .execute(worker_id, |account| {
                account.request_leave(worker_id, entry_id, start, end)
            })
            .await?;

        self.index.record_leave(entry_id, worker_id).await;
        metrics::counter!("ledger_mutations_total", "operation" => "request_leave").increment(1);
        Ok(LeaveReceipt {
            entry_id,
            worker_id,
            start,
            end,
            days: (end - start).num_days() + 1,
            days_of_leave: result.aggregate.days_of_leave(),
        })
    }

    /// Changes the dates of an existing leave entry.
    #[tracing::instrument(skip(self))]
    pub async fn edit_leave(
        &self,
        entry_id: EntryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<LeaveReceipt> {
        let worker_id = self
            .index
            .leave_worker(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;

        let _held = self.locks.acquire(&[worker_id]).await?;

        let result = self
            .leaves
            .execute(worker_id, |account| account.edit_leave(entry_id, start, end))
            .await?;

        metrics::counter!("ledger_mutations_total", "operation" => "edit_leave").increment(1);
        Ok(LeaveReceipt {
            entry_id,
            worker_id,
            start,
            end,
            days: (end - start).num_days() + 1,
            days_of_leave: result.aggregate.days_of_leave(),
        })
    }

    /// Deletes a leave entry.
    #[tracing::instrument(skip(self))]
    pub async fn delete_leave(&self, entry_id: EntryId) -> Result<()> {
        let worker_id = self
            .index
            .leave_worker(entry_id)
            .await
            .ok_or(CoordinatorError::UnknownEntry(entry_id))?;

        let _held = self.locks.acquire(&[worker_id]).await?;

        self.leaves
            .execute(worker_id, |account| account.delete_leave(entry_id))
            .await?;
        self.index.remove_leave(entry_id).await;

        metrics::counter!("ledger_mutations_total", "operation" => "delete_leave").increment(1);
        Ok(())
    }

    // --- Registry cascades ---

    /// Removes a worker and cascades the deletion of their leave entries.
    #[tracing::instrument(skip(self))]
    pub async fn delete_worker(&self, worker_id: AggregateId) -> Result<()> {
        self.workers.get(worker_id).await?;
        let _held = self.locks.acquire(&[worker_id]).await?;

        self.leaves
            .execute(worker_id, |account| {
                Ok::<_, LeaveError>(account.delete_all())
            })
            .await?;
        self.index.remove_leaves_for_worker(worker_id).await;
        self.workers.remove(worker_id).await?;

        metrics::counter!("ledger_mutations_total", "operation" => "delete_worker").increment(1);
        Ok(())
    }

    /// Removes a customer. Refused while any live sale or return entry
    /// still references them; those must be deleted first.
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: AggregateId) -> Result<()> {
        self.customers.get(customer_id).await?;
        let _held = self.locks.acquire(&[customer_id]).await?;

        if self.index.customer_has_entries(customer_id).await {
            return Err(CoordinatorError::CustomerInUse(customer_id));
        }
        self.customers.remove(customer_id).await?;

        metrics::counter!("ledger_mutations_total", "operation" => "delete_customer").increment(1);
        Ok(())
    }

    // --- Loaders ---

    /// Loads a product's current stock record.
    pub async fn load_stock(&self, product_id: AggregateId) -> Result<StockRecord> {
        Ok(self.stock.load(product_id).await?)
    }

    /// Loads a customer's current balance.
    pub async fn load_balance(&self, customer_id: AggregateId) -> Result<CustomerBalance> {
        Ok(self.balances.load(customer_id).await?)
    }

    /// Loads a worker's current leave account.
    pub async fn load_leave(&self, worker_id: AggregateId) -> Result<LeaveAccount> {
        Ok(self.leaves.load(worker_id).await?)
    }

    // --- Compensation ---
    //
    // These run after a partial multi-stream mutation. Compensation works
    // on state we appended moments ago under locks we still hold, so a
    // failure here means the store itself is down; it is logged and the
    // original error is surfaced to the caller.

    async fn restore_stock_after_failed_sale(&self, product_id: AggregateId, entry_id: EntryId) {
        if let Err(comp) = self
            .stock
            .execute(product_id, |record| record.reverse_sale(entry_id))
            .await
        {
            metrics::counter!("ledger_compensation_failures_total").increment(1);
            tracing::error!(
                %product_id, %entry_id, error = %comp,
                "failed to reverse sale while compensating"
            );
        }
    }

    async fn restore_sale_on_stock(&self, old: &SaleRef, entry_id: EntryId) {
        if let Err(comp) = self
            .stock
            .execute(old.product_id, |record| {
                record.record_sale(
                    old.product_id,
                    entry_id,
                    old.customer_id,
                    old.quantity,
                    old.cost,
                    old.date,
                )
            })
            .await
        {
            metrics::counter!("ledger_compensation_failures_total").increment(1);
            tracing::error!(
                product_id = %old.product_id, %entry_id, error = %comp,
                "failed to restore sale while compensating"
            );
        }
    }

    async fn restore_charge(&self, old: &SaleRef, entry_id: EntryId) {
        if let Err(comp) = self
            .balances
            .execute(old.customer_id, |balance| {
                balance.charge_sale(old.customer_id, entry_id, old.cost)
            })
            .await
        {
            metrics::counter!("ledger_compensation_failures_total").increment(1);
            tracing::error!(
                customer_id = %old.customer_id, %entry_id, error = %comp,
                "failed to restore charge while compensating"
            );
        }
    }

    async fn restore_production(&self, old: &ProductionRef, entry_id: EntryId) {
        if let Err(comp) = self
            .stock
            .execute(old.product_id, |record| {
                record.log_production(old.product_id, entry_id, old.quantity, old.date)
            })
            .await
        {
            metrics::counter!("ledger_compensation_failures_total").increment(1);
            tracing::error!(
                product_id = %old.product_id, %entry_id, error = %comp,
                "failed to restore production while compensating"
            );
        }
    }
}
