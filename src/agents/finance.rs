//! The `financeiro` agent: one tool per finance operation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::finance::{overspend_alert, FinanceService, Money};
use crate::tools::args::{optional_str, optional_timestamp, period, required_amount, required_str};
use crate::tools::{ToolGroup, ToolHandler};

pub const GROUP: &str = "financeiro";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinanceOp {
    RecordExpense,
    ExpenseSummary,
    SetBudget,
    AnalyzeSpending,
    ExpenseReport,
    OverspendAlert,
    RecordIncome,
    CategoryTotal,
    ComparePeriods,
    AvailableBalance,
    SuggestReduction,
    RecordEntry,
    ExpenseHistory,
}

impl FinanceOp {
    pub const ALL: [FinanceOp; 13] = [
        FinanceOp::RecordExpense,
        FinanceOp::ExpenseSummary,
        FinanceOp::SetBudget,
        FinanceOp::AnalyzeSpending,
        FinanceOp::ExpenseReport,
        FinanceOp::OverspendAlert,
        FinanceOp::RecordIncome,
        FinanceOp::CategoryTotal,
        FinanceOp::ComparePeriods,
        FinanceOp::AvailableBalance,
        FinanceOp::SuggestReduction,
        FinanceOp::RecordEntry,
        FinanceOp::ExpenseHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FinanceOp::RecordExpense => "record_expense",
            FinanceOp::ExpenseSummary => "expense_summary",
            FinanceOp::SetBudget => "set_budget",
            FinanceOp::AnalyzeSpending => "analyze_spending",
            FinanceOp::ExpenseReport => "expense_report",
            FinanceOp::OverspendAlert => "overspend_alert",
            FinanceOp::RecordIncome => "record_income",
            FinanceOp::CategoryTotal => "category_total",
            FinanceOp::ComparePeriods => "compare_periods",
            FinanceOp::AvailableBalance => "available_balance",
            FinanceOp::SuggestReduction => "suggest_reduction",
            FinanceOp::RecordEntry => "record_entry",
            FinanceOp::ExpenseHistory => "expense_history",
        }
    }

    fn description(self) -> &'static str {
        match self {
            FinanceOp::RecordExpense => "Record a new expense with amount, category, optional sub-category, description and date.",
            FinanceOp::ExpenseSummary => "Count and total of all expenses in a period.",
            FinanceOp::SetBudget => "Set (or replace) the spending limit for a category and sub-category, optionally with a validity window.",
            FinanceOp::AnalyzeSpending => "Compare what was spent in a category and sub-category against its budget.",
            FinanceOp::ExpenseReport => "Total spent per category and sub-category in a period.",
            FinanceOp::OverspendAlert => "Check whether a given spent total exceeds a given limit.",
            FinanceOp::RecordIncome => "Record a new income with amount and optional date.",
            FinanceOp::CategoryTotal => "Total spent in one category and sub-category in a period.",
            FinanceOp::ComparePeriods => "Compare total expenses of two periods.",
            FinanceOp::AvailableBalance => "Income minus expenses in a period.",
            FinanceOp::SuggestReduction => "Suggest the category and sub-category where spending could be reduced.",
            FinanceOp::RecordEntry => "Record either an expense ('gasto') or an income ('receita').",
            FinanceOp::ExpenseHistory => "List individual expenses of a category and sub-category, newest first.",
        }
    }

    fn properties(self) -> (Value, Vec<&'static str>) {
        match self {
            FinanceOp::RecordExpense => (
                json!({
                    "amount": amount_schema(),
                    "category": category_schema(),
                    "subcategory": subcategory_schema(),
                    "description": {"type": "string", "description": "Free text, at most 500 characters"},
                    "date": date_schema(),
                }),
                vec!["amount", "category"],
            ),
            FinanceOp::ExpenseSummary
            | FinanceOp::ExpenseReport
            | FinanceOp::AvailableBalance
            | FinanceOp::SuggestReduction => (json!({ "period": period_schema() }), vec![]),
            FinanceOp::SetBudget => (
                json!({
                    "category": category_schema(),
                    "limit": amount_schema(),
                    "subcategory": subcategory_schema(),
                    "start": date_schema(),
                    "end": date_schema(),
                }),
                vec!["category", "limit"],
            ),
            FinanceOp::AnalyzeSpending | FinanceOp::CategoryTotal | FinanceOp::ExpenseHistory => (
                json!({
                    "category": category_schema(),
                    "subcategory": subcategory_schema(),
                    "period": period_schema(),
                }),
                vec!["category"],
            ),
            FinanceOp::OverspendAlert => (
                json!({
                    "category": category_schema(),
                    "subcategory": subcategory_schema(),
                    "spent": amount_schema(),
                    "limit": amount_schema(),
                }),
                vec!["category", "spent", "limit"],
            ),
            FinanceOp::RecordIncome => (
                json!({ "amount": amount_schema(), "date": date_schema() }),
                vec!["amount"],
            ),
            FinanceOp::ComparePeriods => (
                json!({ "first": period_schema(), "second": period_schema() }),
                vec!["first", "second"],
            ),
            FinanceOp::RecordEntry => (
                json!({
                    "kind": {"type": "string", "enum": ["gasto", "receita"]},
                    "category": category_schema(),
                    "subcategory": subcategory_schema(),
                    "amount": amount_schema(),
                    "date": date_schema(),
                }),
                vec!["kind", "amount"],
            ),
        }
    }

    pub fn schema(self) -> Value {
        let (properties, required) = self.properties();
        json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

fn amount_schema() -> Value {
    json!({"type": "number", "description": "Amount in reais, e.g. 12.50"})
}

fn category_schema() -> Value {
    json!({"type": "string", "description": "Category, e.g. alimentacao"})
}

fn subcategory_schema() -> Value {
    json!({"type": "string", "description": "Sub-category, empty when not applicable"})
}

fn date_schema() -> Value {
    json!({"type": "string", "description": "Date or date-time, YYYY-MM-DD or YYYY-MM-DD HH:MM"})
}

fn period_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["semanal", "quinzenal", "mensal", "trimestral"],
        "description": "Look-back window; defaults to mensal"
    })
}

/// Runs one finance operation.
pub struct FinanceTool {
    op: FinanceOp,
    finance: Arc<FinanceService>,
}

impl FinanceTool {
    pub fn new(op: FinanceOp, finance: Arc<FinanceService>) -> Self {
        Self { op, finance }
    }

    fn run(&self, input: &Value) -> Result<String, String> {
        let svc = &self.finance;
        let result = match self.op {
            FinanceOp::RecordExpense => svc.record_expense(
                required_amount(input, "amount")?,
                optional_str(input, "category"),
                optional_str(input, "subcategory"),
                optional_str(input, "description"),
                optional_timestamp(input, "date")?,
            ),
            FinanceOp::ExpenseSummary => svc.expense_summary(period(input, "period")?),
            FinanceOp::SetBudget => svc.set_budget(
                optional_str(input, "category"),
                required_amount(input, "limit")?,
                optional_str(input, "subcategory"),
                optional_timestamp(input, "start")?,
                optional_timestamp(input, "end")?,
            ),
            FinanceOp::AnalyzeSpending => svc.analyze_spending(
                required_str(input, "category")?,
                optional_str(input, "subcategory"),
                period(input, "period")?,
            ),
            FinanceOp::ExpenseReport => svc.expense_report(period(input, "period")?),
            FinanceOp::OverspendAlert => {
                let spent = money_arg(input, "spent")?;
                let limit = money_arg(input, "limit")?;
                return Ok(overspend_alert(
                    required_str(input, "category")?.trim(),
                    optional_str(input, "subcategory").trim(),
                    spent,
                    limit,
                ));
            }
            FinanceOp::RecordIncome => svc.record_income(
                required_amount(input, "amount")?,
                optional_timestamp(input, "date")?,
            ),
            FinanceOp::CategoryTotal => svc.category_total(
                required_str(input, "category")?,
                optional_str(input, "subcategory"),
                period(input, "period")?,
            ),
            FinanceOp::ComparePeriods => {
                svc.compare_periods(period(input, "first")?, period(input, "second")?)
            }
            FinanceOp::AvailableBalance => svc.available_balance(period(input, "period")?),
            FinanceOp::SuggestReduction => svc.suggest_reduction(period(input, "period")?),
            FinanceOp::RecordEntry => svc.record_entry(
                required_str(input, "kind")?,
                optional_str(input, "category"),
                optional_str(input, "subcategory"),
                required_amount(input, "amount")?,
                optional_timestamp(input, "date")?,
            ),
            FinanceOp::ExpenseHistory => svc.expense_history(
                required_str(input, "category")?,
                optional_str(input, "subcategory"),
                period(input, "period")?,
            ),
        };
        result.map_err(|e| e.to_string())
    }
}

fn money_arg(input: &Value, key: &str) -> Result<Money, String> {
    let value = required_amount(input, key)?;
    Money::from_decimal(value).ok_or_else(|| format!("O campo '{key}' deve ser um número."))
}

#[async_trait]
impl ToolHandler for FinanceTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        self.run(input)
    }
}

pub fn group(finance: Arc<FinanceService>) -> ToolGroup {
    FinanceOp::ALL.iter().fold(
        ToolGroup::new(GROUP, "Controle financeiro: gastos, receitas, orçamentos e relatórios."),
        |group, &op| group.add(op.name(), op.schema(), FinanceTool::new(op, finance.clone())),
    )
}
