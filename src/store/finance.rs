use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{opt_ts_column, ts_column, Ledger};
use crate::clock::to_storage;
use crate::error::LedgerError;
use crate::finance::{
    Budget, CategoryTotal, ExpenseStats, HistoryEntry, Money, NewExpense, NewIncome,
};

impl Ledger {
    pub fn insert_expense(&self, expense: &NewExpense) -> Result<i64, LedgerError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gastos (valor, categoria, sub_categoria, descricao, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    expense.amount,
                    expense.category,
                    expense.subcategory,
                    expense.description,
                    to_storage(&expense.at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(id, category = %expense.category, "expense inserted");
        Ok(id)
    }

    pub fn insert_income(&self, income: &NewIncome) -> Result<i64, LedgerError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO receitas (valor, data) VALUES (?1, ?2)",
                params![income.amount, to_storage(&income.at)],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(id, "income inserted");
        Ok(id)
    }

    /// Insert or replace the budget for its category/sub-category pair.
    pub fn upsert_budget(&self, budget: &Budget) -> Result<(), LedgerError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO orcamentos (categoria, sub_categoria, limite, data_inicio, data_fim)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (categoria, sub_categoria) DO UPDATE SET
                    limite = excluded.limite,
                    data_inicio = excluded.data_inicio,
                    data_fim = excluded.data_fim",
                params![
                    budget.category,
                    budget.subcategory,
                    budget.limit,
                    budget.starts.as_ref().map(to_storage),
                    budget.ends.as_ref().map(to_storage),
                ],
            )?;
            Ok(())
        })
    }

    pub fn budget_for(
        &self,
        category: &str,
        subcategory: &str,
    ) -> Result<Option<Budget>, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT categoria, sub_categoria, limite, data_inicio, data_fim
                 FROM orcamentos WHERE categoria = ?1 AND sub_categoria = ?2",
                params![category, subcategory],
                |row| {
                    Ok(Budget {
                        category: row.get(0)?,
                        subcategory: row.get(1)?,
                        limit: row.get(2)?,
                        starts: opt_ts_column(row, 3)?,
                        ends: opt_ts_column(row, 4)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn expense_stats(&self, since: NaiveDateTime) -> Result<ExpenseStats, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(valor), 0) FROM gastos WHERE data >= ?1",
                [to_storage(&since)],
                |row| {
                    Ok(ExpenseStats {
                        count: row.get(0)?,
                        total: row.get(1)?,
                    })
                },
            )
        })
    }

    pub fn expense_total(&self, since: NaiveDateTime) -> Result<Money, LedgerError> {
        self.expense_stats(since).map(|s| s.total)
    }

    pub fn income_total(&self, since: NaiveDateTime) -> Result<Money, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(valor), 0) FROM receitas WHERE data >= ?1",
                [to_storage(&since)],
                |row| row.get(0),
            )
        })
    }

    pub fn category_total(
        &self,
        category: &str,
        subcategory: &str,
        since: NaiveDateTime,
    ) -> Result<Money, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(valor), 0) FROM gastos
                 WHERE categoria = ?1 AND sub_categoria = ?2 AND data >= ?3",
                params![category, subcategory, to_storage(&since)],
                |row| row.get(0),
            )
        })
    }

    /// Totals per category/sub-category, alphabetical.
    pub fn totals_by_category(
        &self,
        since: NaiveDateTime,
    ) -> Result<Vec<CategoryTotal>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT categoria, sub_categoria, SUM(valor) FROM gastos
                 WHERE data >= ?1
                 GROUP BY categoria, sub_categoria
                 ORDER BY categoria, sub_categoria",
            )?;
            let rows = stmt.query_map([to_storage(&since)], category_total_row)?;
            rows.collect()
        })
    }

    /// The category/sub-category with the largest total in the window.
    pub fn top_category(&self, since: NaiveDateTime) -> Result<Option<CategoryTotal>, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT categoria, sub_categoria, SUM(valor) AS total FROM gastos
                 WHERE data >= ?1
                 GROUP BY categoria, sub_categoria
                 ORDER BY total DESC, categoria, sub_categoria
                 LIMIT 1",
                [to_storage(&since)],
                category_total_row,
            )
            .optional()
        })
    }

    /// Individual expenses, newest first.
    pub fn expense_history(
        &self,
        category: &str,
        subcategory: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<HistoryEntry>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data, valor FROM gastos
                 WHERE categoria = ?1 AND sub_categoria = ?2 AND data >= ?3
                 ORDER BY data DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![category, subcategory, to_storage(&since)], |row| {
                Ok(HistoryEntry {
                    at: ts_column(row, 0)?,
                    amount: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }
}

fn category_total_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategoryTotal> {
    Ok(CategoryTotal {
        category: row.get(0)?,
        subcategory: row.get(1)?,
        total: row.get(2)?,
    })
}
