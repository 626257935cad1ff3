//! Shared-expense splitting: equal shares per participant and the transfers
//! that settle them, served over a small JSON API.
//!
//! [`balance::compute_balances`] and [`exchange::compute_payments`] are pure;
//! everything else wraps them with storage and HTTP.
pub mod balance;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod money;
pub mod report;
pub mod routes;
pub mod schemas;
pub mod settings;
pub mod store;
pub mod undo;

pub use balance::{compute_balances, BalanceEntry, Balances, Summary};
pub use error::{ApiError, SettleError};
pub use exchange::{compute_payments, Payment};
pub use report::{compute_report, Report};
pub use schemas::{Expense, Ledger, Participant};
