//! Expense, income and budget tracking.

pub mod models;
pub mod money;
pub mod period;
pub mod service;

pub use models::{
    Budget, CategoryTotal, EntryKind, ExpenseStats, HistoryEntry, NewExpense, NewIncome,
};
pub use money::Money;
pub use period::{InvalidPeriod, Period};
pub use service::{overspend_alert, BudgetStatus, FinanceService, MAX_DESCRIPTION_CHARS};
