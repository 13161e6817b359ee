//! Read model views over the ledger event streams.

pub mod customer_balances;
pub mod leave_board;
pub mod production_log;
pub mod returns_ledger;
pub mod sales_ledger;
pub mod stock_levels;

pub use customer_balances::{BalanceRow, CustomerBalancesView};
pub use leave_board::{LeaveBoardView, LeaveRow};
pub use production_log::{ProductionLogView, ProductionRow};
pub use returns_ledger::{ReturnRow, ReturnsLedgerView};
pub use sales_ledger::{SaleRow, SalesLedgerView};
pub use stock_levels::{StockLevel, StockLevelsView};
