use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;

use super::models::{Budget, EntryKind, NewExpense, NewIncome};
use super::money::Money;
use super::period::Period;
use crate::clock::{self, Clock};
use crate::error::FinanceError;
use crate::store::Ledger;

pub const MAX_DESCRIPTION_CHARS: usize = 500;

const INVALID_CATEGORY: &str = "Categoria inválida. Por favor, insira uma categoria válida.";

/// How a category currently stands against its budget over the default
/// period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: Money,
}

impl BudgetStatus {
    pub fn exceeded(&self) -> bool {
        self.spent > self.budget.limit
    }
}

/// Finance operations. Each one validates its inputs, talks to the ledger
/// and renders the answer the assistant relays to the user.
pub struct FinanceService {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl FinanceService {
    pub fn new(ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn record_expense(
        &self,
        amount: f64,
        category: &str,
        subcategory: &str,
        description: &str,
        at: Option<NaiveDateTime>,
    ) -> Result<String, FinanceError> {
        let amount = positive_amount(amount, "O valor do gasto deve ser maior que zero.")?;
        let category = required_category(category)?;
        let description = description.trim();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(FinanceError::invalid(format!(
                "A descrição do gasto é muito longa. O limite é {MAX_DESCRIPTION_CHARS} caracteres."
            )));
        }

        let expense = NewExpense {
            amount,
            category: category.to_string(),
            subcategory: subcategory.trim().to_string(),
            description: description.to_string(),
            at: at.unwrap_or_else(|| self.now()),
        };
        self.ledger.insert_expense(&expense)?;
        info!(amount = %expense.amount, category = %expense.category, "expense recorded");

        Ok(format!(
            "Gasto de {} registrado na categoria '{}' e sub-categoria '{}' em {}.",
            expense.amount,
            expense.category,
            expense.subcategory,
            clock::display(&expense.at)
        ))
    }

    pub fn expense_summary(&self, period: Period) -> Result<String, FinanceError> {
        let stats = self.ledger.expense_stats(period.start(self.now()))?;
        Ok(format!(
            "Total de gastos: {}, Valor total gasto: {} no período {period}.",
            stats.count, stats.total
        ))
    }

    pub fn set_budget(
        &self,
        category: &str,
        limit: f64,
        subcategory: &str,
        starts: Option<NaiveDateTime>,
        ends: Option<NaiveDateTime>,
    ) -> Result<String, FinanceError> {
        let limit = positive_amount(limit, "O limite do orçamento deve ser maior que zero.")?;
        let category = required_category(category)?;
        if let (Some(start), Some(end)) = (starts, ends) {
            if end < start {
                return Err(FinanceError::invalid(
                    "A data final do orçamento deve ser posterior à data inicial.",
                ));
            }
        }

        let budget = Budget {
            category: category.to_string(),
            subcategory: subcategory.trim().to_string(),
            limit,
            starts,
            ends,
        };
        self.ledger.upsert_budget(&budget)?;
        info!(category = %budget.category, limit = %budget.limit, "budget set");

        Ok(format!(
            "Orçamento de {} definido para a categoria '{}' e sub-categoria '{}' ({}).",
            budget.limit,
            budget.category,
            budget.subcategory,
            describe_window(&budget)
        ))
    }

    /// The active budget for a category and what was spent against it in the
    /// default period. `None` when no active budget exists.
    pub fn budget_status(
        &self,
        category: &str,
        subcategory: &str,
    ) -> Result<Option<BudgetStatus>, FinanceError> {
        self.budget_status_for(category, subcategory, Period::default())
    }

    fn budget_status_for(
        &self,
        category: &str,
        subcategory: &str,
        period: Period,
    ) -> Result<Option<BudgetStatus>, FinanceError> {
        let now = self.now();
        let Some(budget) = self
            .ledger
            .budget_for(category, subcategory)?
            .filter(|b| b.is_active(now))
        else {
            return Ok(None);
        };
        let spent = self
            .ledger
            .category_total(category, subcategory, period.start(now))?;
        Ok(Some(BudgetStatus { budget, spent }))
    }

    pub fn analyze_spending(
        &self,
        category: &str,
        subcategory: &str,
        period: Period,
    ) -> Result<String, FinanceError> {
        let category = category.trim();
        let subcategory = subcategory.trim();
        let Some(status) = self.budget_status_for(category, subcategory, period)? else {
            return Ok(format!(
                "Nenhum orçamento definido para a categoria '{category}' e sub-categoria '{subcategory}'."
            ));
        };

        if status.exceeded() {
            Ok(format!(
                "Você excedeu o orçamento de {} em '{category}' e sub-categoria '{subcategory}' no período {period}. Total gasto: {}.",
                status.budget.limit, status.spent
            ))
        } else {
            Ok(format!(
                "Você está dentro do orçamento de '{category}' e sub-categoria '{subcategory}' no período {period}. Total gasto: {}, Limite: {}.",
                status.spent, status.budget.limit
            ))
        }
    }

    pub fn expense_report(&self, period: Period) -> Result<String, FinanceError> {
        let totals = self.ledger.totals_by_category(period.start(self.now()))?;
        if totals.is_empty() {
            return Ok("Nenhum gasto registrado para gerar o relatório.".into());
        }

        Ok(totals
            .iter()
            .map(|t| {
                if t.subcategory.is_empty() {
                    format!("{}: {}", t.category, t.total)
                } else {
                    format!("{} - {}: {}", t.category, t.subcategory, t.total)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn record_income(
        &self,
        amount: f64,
        at: Option<NaiveDateTime>,
    ) -> Result<String, FinanceError> {
        let amount = positive_amount(amount, "O valor da receita deve ser maior que zero.")?;
        let income = NewIncome {
            amount,
            at: at.unwrap_or_else(|| self.now()),
        };
        self.ledger.insert_income(&income)?;
        info!(amount = %income.amount, "income recorded");

        Ok(format!(
            "Receita de {} registrada em {}.",
            income.amount,
            clock::display(&income.at)
        ))
    }

    pub fn category_total(
        &self,
        category: &str,
        subcategory: &str,
        period: Period,
    ) -> Result<String, FinanceError> {
        let category = category.trim();
        let subcategory = subcategory.trim();
        let total = self
            .ledger
            .category_total(category, subcategory, period.start(self.now()))?;
        Ok(format!(
            "Total de gastos em {category} e sub-categoria {subcategory} no período {period}: {total}."
        ))
    }

    pub fn compare_periods(&self, first: Period, second: Period) -> Result<String, FinanceError> {
        let now = self.now();
        let first_total = self.ledger.expense_total(first.start(now))?;
        let second_total = self.ledger.expense_total(second.start(now))?;
        Ok(format!(
            "Gastos no período {first}: {first_total}, Gastos no período {second}: {second_total}."
        ))
    }

    /// Income minus expenses over the period. May be negative.
    pub fn available_balance(&self, period: Period) -> Result<String, FinanceError> {
        let since = period.start(self.now());
        let income = self.ledger.income_total(since)?;
        let expenses = self.ledger.expense_total(since)?;
        Ok(format!(
            "Saldo disponível no período {period}: {}.",
            income - expenses
        ))
    }

    pub fn suggest_reduction(&self, period: Period) -> Result<String, FinanceError> {
        match self.ledger.top_category(period.start(self.now()))? {
            Some(top) => Ok(format!(
                "Considere reduzir gastos na categoria '{}' e sub-categoria '{}' no período {period}, onde você gastou {}.",
                top.category, top.subcategory, top.total
            )),
            None => Ok("Nenhuma sugestão de redução de gastos disponível.".into()),
        }
    }

    /// Record either kind of entry. Income carries no category, so the
    /// category arguments only apply to expenses.
    pub fn record_entry(
        &self,
        kind: &str,
        category: &str,
        subcategory: &str,
        amount: f64,
        at: Option<NaiveDateTime>,
    ) -> Result<String, FinanceError> {
        match kind.parse::<EntryKind>().map_err(FinanceError::Invalid)? {
            EntryKind::Expense => self.record_expense(amount, category, subcategory, "", at),
            EntryKind::Income => self.record_income(amount, at),
        }
    }

    pub fn expense_history(
        &self,
        category: &str,
        subcategory: &str,
        period: Period,
    ) -> Result<String, FinanceError> {
        let category = category.trim();
        let subcategory = subcategory.trim();
        let history = self
            .ledger
            .expense_history(category, subcategory, period.start(self.now()))?;
        if history.is_empty() {
            return Ok(format!(
                "Nenhum gasto registrado na categoria '{category}' e sub-categoria '{subcategory}' no período {period}."
            ));
        }

        Ok(history
            .iter()
            .map(|h| format!("{}: {}", clock::display(&h.at), h.amount))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Alert text for a spending total against a limit.
pub fn overspend_alert(category: &str, subcategory: &str, spent: Money, limit: Money) -> String {
    if spent > limit {
        format!("Atenção: Você ultrapassou o orçamento de {category} e sub-categoria {subcategory}!")
    } else {
        "Sem alertas.".into()
    }
}

fn positive_amount(value: f64, message: &str) -> Result<Money, FinanceError> {
    match Money::from_decimal(value) {
        Some(amount) if amount.is_positive() => Ok(amount),
        _ => Err(FinanceError::invalid(message)),
    }
}

fn required_category(category: &str) -> Result<&str, FinanceError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(FinanceError::invalid(INVALID_CATEGORY));
    }
    Ok(category)
}

fn describe_window(budget: &Budget) -> String {
    match (&budget.starts, &budget.ends) {
        (None, None) => "sem prazo definido".into(),
        (Some(start), Some(end)) => {
            format!("de {} a {}", clock::display(start), clock::display(end))
        }
        (Some(start), None) => format!("a partir de {}", clock::display(start)),
        (None, Some(end)) => format!("até {}", clock::display(end)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{from_storage, FixedClock};

    const NOW: &str = "2024-05-20 12:00:00";

    fn ts(s: &str) -> NaiveDateTime {
        from_storage(s).unwrap()
    }

    fn service() -> FinanceService {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        FinanceService::new(ledger, Arc::new(FixedClock(ts(NOW))))
    }

    fn invalid(result: Result<String, FinanceError>) -> String {
        match result {
            Err(FinanceError::Invalid(msg)) => msg,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn record_expense_rejects_non_positive_amount() {
        let svc = service();
        assert_eq!(
            invalid(svc.record_expense(0.0, "mercado", "", "", None)),
            "O valor do gasto deve ser maior que zero."
        );
        assert_eq!(
            invalid(svc.record_expense(-10.0, "mercado", "", "", None)),
            "O valor do gasto deve ser maior que zero."
        );
        assert_eq!(
            invalid(svc.record_expense(0.001, "mercado", "", "", None)),
            "O valor do gasto deve ser maior que zero."
        );
    }

    #[test]
    fn record_expense_rejects_blank_category() {
        let svc = service();
        assert_eq!(
            invalid(svc.record_expense(10.0, "   ", "", "", None)),
            INVALID_CATEGORY
        );
    }

    #[test]
    fn record_expense_limits_description_length() {
        let svc = service();
        let long = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(invalid(svc.record_expense(10.0, "lazer", "", &long, None)).contains("muito longa"));

        // Multi-byte characters count once each.
        let accented = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert!(svc.record_expense(10.0, "lazer", "", &accented, None).is_ok());
    }

    #[test]
    fn record_expense_defaults_to_now() {
        let svc = service();
        let msg = svc
            .record_expense(12.5, " alimentacao ", "mercado", "feira", None)
            .unwrap();
        assert_eq!(
            msg,
            "Gasto de R$ 12.50 registrado na categoria 'alimentacao' e sub-categoria 'mercado' em 20/05/2024 12:00."
        );
        let history = svc
            .ledger()
            .expense_history("alimentacao", "mercado", ts("2024-05-01 00:00:00"))
            .unwrap();
        assert_eq!(history[0].at, ts(NOW));
    }

    #[test]
    fn summary_counts_window_only() {
        let svc = service();
        svc.record_expense(10.0, "a", "", "", Some(ts("2024-05-18 10:00:00"))).unwrap();
        svc.record_expense(5.25, "b", "", "", Some(ts("2024-05-01 10:00:00"))).unwrap();
        svc.record_expense(100.0, "c", "", "", Some(ts("2024-01-01 10:00:00"))).unwrap();

        assert_eq!(
            svc.expense_summary(Period::Weekly).unwrap(),
            "Total de gastos: 1, Valor total gasto: R$ 10.00 no período semanal."
        );
        assert_eq!(
            svc.expense_summary(Period::Monthly).unwrap(),
            "Total de gastos: 2, Valor total gasto: R$ 15.25 no período mensal."
        );
    }

    #[test]
    fn summary_of_empty_ledger() {
        assert_eq!(
            service().expense_summary(Period::Monthly).unwrap(),
            "Total de gastos: 0, Valor total gasto: R$ 0.00 no período mensal."
        );
    }

    #[test]
    fn set_budget_validates() {
        let svc = service();
        assert_eq!(
            invalid(svc.set_budget("lazer", 0.0, "", None, None)),
            "O limite do orçamento deve ser maior que zero."
        );
        assert_eq!(invalid(svc.set_budget("", 10.0, "", None, None)), INVALID_CATEGORY);
        assert!(invalid(svc.set_budget(
            "lazer",
            10.0,
            "",
            Some(ts("2024-06-01 00:00:00")),
            Some(ts("2024-05-01 00:00:00"))
        ))
        .contains("data final"));
    }

    #[test]
    fn set_budget_describes_window() {
        let svc = service();
        assert_eq!(
            svc.set_budget("lazer", 200.0, "cinema", None, None).unwrap(),
            "Orçamento de R$ 200.00 definido para a categoria 'lazer' e sub-categoria 'cinema' (sem prazo definido)."
        );
        let msg = svc
            .set_budget(
                "lazer",
                300.0,
                "cinema",
                Some(ts("2024-05-01 00:00:00")),
                Some(ts("2024-05-31 00:00:00")),
            )
            .unwrap();
        assert!(msg.contains("de 01/05/2024 00:00 a 31/05/2024 00:00"));
        assert_eq!(
            svc.ledger().budget_for("lazer", "cinema").unwrap().unwrap().limit,
            Money::from_cents(30000)
        );
    }

    #[test]
    fn analyze_without_budget() {
        assert_eq!(
            service()
                .analyze_spending("lazer", "cinema", Period::Monthly)
                .unwrap(),
            "Nenhum orçamento definido para a categoria 'lazer' e sub-categoria 'cinema'."
        );
    }

    #[test]
    fn analyze_within_and_over_budget() {
        let svc = service();
        svc.set_budget("lazer", 100.0, "cinema", None, None).unwrap();
        svc.record_expense(60.0, "lazer", "cinema", "", Some(ts("2024-05-10 20:00:00"))).unwrap();

        assert_eq!(
            svc.analyze_spending("lazer", "cinema", Period::Monthly).unwrap(),
            "Você está dentro do orçamento de 'lazer' e sub-categoria 'cinema' no período mensal. Total gasto: R$ 60.00, Limite: R$ 100.00."
        );

        svc.record_expense(50.0, "lazer", "cinema", "", Some(ts("2024-05-15 20:00:00"))).unwrap();
        assert_eq!(
            svc.analyze_spending("lazer", "cinema", Period::Monthly).unwrap(),
            "Você excedeu o orçamento de R$ 100.00 em 'lazer' e sub-categoria 'cinema' no período mensal. Total gasto: R$ 110.00."
        );

        let status = svc.budget_status("lazer", "cinema").unwrap().unwrap();
        assert!(status.exceeded());
        assert_eq!(status.spent, Money::from_cents(11000));
    }

    #[test]
    fn expired_budget_is_ignored() {
        let svc = service();
        svc.set_budget(
            "lazer",
            100.0,
            "",
            Some(ts("2024-04-01 00:00:00")),
            Some(ts("2024-04-30 23:59:59")),
        )
        .unwrap();
        assert!(svc.budget_status("lazer", "").unwrap().is_none());
        assert!(svc
            .analyze_spending("lazer", "", Period::Monthly)
            .unwrap()
            .starts_with("Nenhum orçamento definido"));
    }

    #[test]
    fn report_lists_each_group() {
        let svc = service();
        assert_eq!(
            svc.expense_report(Period::Monthly).unwrap(),
            "Nenhum gasto registrado para gerar o relatório."
        );

        svc.record_expense(20.0, "transporte", "", "", None).unwrap();
        svc.record_expense(10.0, "alimentacao", "mercado", "", None).unwrap();
        svc.record_expense(5.0, "alimentacao", "mercado", "", None).unwrap();

        assert_eq!(
            svc.expense_report(Period::Monthly).unwrap(),
            "alimentacao - mercado: R$ 15.00\ntransporte: R$ 20.00"
        );
    }

    #[test]
    fn overspend_alert_only_when_strictly_over() {
        let limit = Money::from_cents(10000);
        assert_eq!(
            overspend_alert("lazer", "cinema", Money::from_cents(10001), limit),
            "Atenção: Você ultrapassou o orçamento de lazer e sub-categoria cinema!"
        );
        assert_eq!(overspend_alert("lazer", "cinema", limit, limit), "Sem alertas.");
    }

    #[test]
    fn income_validation_and_balance() {
        let svc = service();
        assert_eq!(
            invalid(svc.record_income(-1.0, None)),
            "O valor da receita deve ser maior que zero."
        );

        assert_eq!(
            svc.record_income(1000.0, Some(ts("2024-05-05 09:00:00"))).unwrap(),
            "Receita de R$ 1000.00 registrada em 05/05/2024 09:00."
        );
        svc.record_expense(250.5, "casa", "", "", None).unwrap();
        assert_eq!(
            svc.available_balance(Period::Monthly).unwrap(),
            "Saldo disponível no período mensal: R$ 749.50."
        );

        svc.record_expense(1000.0, "casa", "", "", None).unwrap();
        assert_eq!(
            svc.available_balance(Period::Monthly).unwrap(),
            "Saldo disponível no período mensal: -R$ 250.50."
        );
    }

    #[test]
    fn category_total_and_comparison() {
        let svc = service();
        svc.record_expense(30.0, "lazer", "bar", "", Some(ts("2024-05-19 22:00:00"))).unwrap();
        svc.record_expense(70.0, "lazer", "bar", "", Some(ts("2024-04-25 22:00:00"))).unwrap();

        assert_eq!(
            svc.category_total("lazer", "bar", Period::Quarterly).unwrap(),
            "Total de gastos em lazer e sub-categoria bar no período trimestral: R$ 100.00."
        );
        assert_eq!(
            svc.compare_periods(Period::Weekly, Period::Monthly).unwrap(),
            "Gastos no período semanal: R$ 30.00, Gastos no período mensal: R$ 100.00."
        );
    }

    #[test]
    fn suggestion_targets_biggest_group() {
        let svc = service();
        assert_eq!(
            svc.suggest_reduction(Period::Monthly).unwrap(),
            "Nenhuma sugestão de redução de gastos disponível."
        );
        svc.record_expense(30.0, "lazer", "bar", "", None).unwrap();
        svc.record_expense(80.0, "casa", "luz", "", None).unwrap();
        assert_eq!(
            svc.suggest_reduction(Period::Monthly).unwrap(),
            "Considere reduzir gastos na categoria 'casa' e sub-categoria 'luz' no período mensal, onde você gastou R$ 80.00."
        );
    }

    #[test]
    fn record_entry_routes_by_kind() {
        let svc = service();
        assert!(svc
            .record_entry("gasto", "lazer", "", 10.0, None)
            .unwrap()
            .starts_with("Gasto de R$ 10.00"));
        assert!(svc
            .record_entry("receita", "salario", "", 10.0, None)
            .unwrap()
            .starts_with("Receita de R$ 10.00"));
        assert_eq!(
            invalid(svc.record_entry("doacao", "lazer", "", 10.0, None)),
            "Tipo inválido. Use 'gasto' ou 'receita'."
        );
    }

    #[test]
    fn history_lines_newest_first() {
        let svc = service();
        assert!(svc
            .expense_history("lazer", "", Period::Monthly)
            .unwrap()
            .starts_with("Nenhum gasto registrado na categoria 'lazer'"));

        svc.record_expense(10.0, "lazer", "", "", Some(ts("2024-05-01 10:00:00"))).unwrap();
        svc.record_expense(20.0, "lazer", "", "", Some(ts("2024-05-02 11:30:00"))).unwrap();
        assert_eq!(
            svc.expense_history("lazer", "", Period::Monthly).unwrap(),
            "02/05/2024 11:30: R$ 20.00\n01/05/2024 10:00: R$ 10.00"
        );
    }
}
