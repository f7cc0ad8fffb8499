use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use super::money::Money;

/// A new row for `gastos`.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: Money,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub at: NaiveDateTime,
}

/// A new row for `receitas`.
#[derive(Debug, Clone)]
pub struct NewIncome {
    pub amount: Money,
    pub at: NaiveDateTime,
}

/// A spending limit for a category/sub-category pair, optionally bounded
/// in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub category: String,
    pub subcategory: String,
    pub limit: Money,
    pub starts: Option<NaiveDateTime>,
    pub ends: Option<NaiveDateTime>,
}

impl Budget {
    /// A budget stops applying once its end date has passed.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.ends.is_none_or(|end| end >= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseStats {
    pub count: i64,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub subcategory: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub at: NaiveDateTime,
    pub amount: Money,
}

/// Which ledger a generic entry goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Expense,
    Income,
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gasto" | "expense" => Ok(EntryKind::Expense),
            "receita" | "income" => Ok(EntryKind::Income),
            _ => Err("Tipo inválido. Use 'gasto' ou 'receita'.".into()),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Expense => f.write_str("gasto"),
            EntryKind::Income => f.write_str("receita"),
        }
    }
}
