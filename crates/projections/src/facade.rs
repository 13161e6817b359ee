//! Query facade bundling the read models and the registries.

use chrono::NaiveDate;
use common::AggregateId;
use domain::{
    Customer, CustomerDirectory, Product, ProductCatalog, Quantity, Worker, WorkerRoster,
};
use event_store::EventStore;

use crate::processor::ProjectionProcessor;
use crate::views::{
    BalanceRow, CustomerBalancesView, LeaveBoardView, LeaveRow, ProductionLogView,
    ProductionRow, ReturnRow, ReturnsLedgerView, SaleRow, SalesLedgerView, StockLevelsView,
};

/// A stock level joined with its product row.
#[derive(Debug, Clone)]
pub struct StorageRow {
    pub product: Product,
    pub quantity: Quantity,
}

/// A customer joined with their balance.
#[derive(Debug, Clone)]
pub struct CustomerAccountRow {
    pub customer: Customer,
    pub balance: BalanceRow,
}

/// Who is absent on a given day and how many workers remain.
#[derive(Debug, Clone)]
pub struct LeaveDayBoard {
    pub date: NaiveDate,
    pub entries: Vec<LeaveRow>,
    pub absent_workers: usize,
    pub available_workers: usize,
}

/// Read-only entry point for all query endpoints.
///
/// Bundles the six event-fed views with the reference-data registries so
/// listing endpoints can join ids to names and codes in one place.
#[derive(Clone)]
pub struct QueryFacade {
    products: ProductCatalog,
    customers: CustomerDirectory,
    workers: WorkerRoster,
    stock_levels: StockLevelsView,
    balances: CustomerBalancesView,
    sales: SalesLedgerView,
    productions: ProductionLogView,
    returns: ReturnsLedgerView,
    leave: LeaveBoardView,
}

impl QueryFacade {
    /// Creates a facade with fresh, empty views over the given registries.
    pub fn new(
        products: ProductCatalog,
        customers: CustomerDirectory,
        workers: WorkerRoster,
    ) -> Self {
        Self {
            products,
            customers,
            workers,
            stock_levels: StockLevelsView::new(),
            balances: CustomerBalancesView::new(),
            sales: SalesLedgerView::new(),
            productions: ProductionLogView::new(),
            returns: ReturnsLedgerView::new(),
            leave: LeaveBoardView::new(),
        }
    }

    /// Registers clones of every view with a projection processor. The
    /// clones share state with this facade, so catch-up and live events
    /// delivered to the processor become visible here.
    pub fn register_views<S: EventStore>(&self, processor: &mut ProjectionProcessor<S>) {
        processor.register(Box::new(self.stock_levels.clone()));
        processor.register(Box::new(self.balances.clone()));
        processor.register(Box::new(self.sales.clone()));
        processor.register(Box::new(self.productions.clone()));
        processor.register(Box::new(self.returns.clone()));
        processor.register(Box::new(self.leave.clone()));
    }

    // --- Registries ---

    /// Lists all non-deleted products.
    pub async fn products(&self) -> Vec<Product> {
        self.products.all().await
    }

    /// Lists all workers.
    pub async fn workers(&self) -> Vec<Worker> {
        self.workers.all().await
    }

    /// Lists all customers joined with their balances.
    pub async fn customer_accounts(&self) -> Vec<CustomerAccountRow> {
        let mut rows = Vec::new();
        for customer in self.customers.all().await {
            let balance = self.balances.get(customer.id).await;
            rows.push(CustomerAccountRow { customer, balance });
        }
        rows
    }

    /// A single customer's balance (all-zero when nothing is recorded).
    pub async fn customer_balance(&self, customer_id: AggregateId) -> BalanceRow {
        self.balances.get(customer_id).await
    }

    // --- Stock ---

    /// Lists every open stock record joined with its product.
    pub async fn storage(&self) -> Vec<StorageRow> {
        let mut rows = Vec::new();
        for level in self.stock_levels.all().await {
            // Soft-deleted products still resolve here so their stock
            // stays visible until the record is closed.
            if let Ok(product) = self.products.get(level.product_id).await {
                rows.push(StorageRow {
                    product,
                    quantity: level.quantity,
                });
            }
        }
        rows.sort_by(|a, b| a.product.product_code.cmp(&b.product.product_code));
        rows
    }

    /// On-hand quantity for one product, if a stock record is open.
    pub async fn stock_level(&self, product_id: AggregateId) -> Option<Quantity> {
        self.stock_levels.get(product_id).await
    }

    // --- Ledger listings ---

    /// Lists all live production entries.
    pub async fn productions(&self) -> Vec<ProductionRow> {
        self.productions.all().await
    }

    /// Lists all live sale entries.
    pub async fn sales(&self) -> Vec<SaleRow> {
        self.sales.all().await
    }

    /// Lists one customer's live sale entries.
    pub async fn sales_for_customer(&self, customer_id: AggregateId) -> Vec<SaleRow> {
        self.sales.for_customer(customer_id).await
    }

    /// Lists all live wax return entries.
    pub async fn returns(&self) -> Vec<ReturnRow> {
        self.returns.all().await
    }

    // --- Leave ---

    /// Lists one worker's live leave entries.
    pub async fn leave_for_worker(&self, worker_id: AggregateId) -> Vec<LeaveRow> {
        self.leave.for_worker(worker_id).await
    }

    /// Total leave days a worker has taken, summing entries.
    pub async fn days_of_leave(&self, worker_id: AggregateId) -> i64 {
        self.leave.days_of_leave(worker_id).await
    }

    /// The leave board for a given day: who is absent and how many
    /// workers remain available (floored at zero).
    pub async fn leave_day(&self, date: NaiveDate) -> LeaveDayBoard {
        let entries = self.leave.on_day(date).await;
        let absent_workers = self.leave.workers_on_day(date).await;
        let available_workers = self.workers.count().await.saturating_sub(absent_workers);
        LeaveDayBoard {
            date,
            entries,
            absent_workers,
            available_workers,
        }
    }
}
