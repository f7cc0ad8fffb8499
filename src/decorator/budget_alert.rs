use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Decoration, DecoratorError, ToolDecorator};
use crate::finance::{overspend_alert, EntryKind, FinanceService, Period};

/// After an expense is recorded, checks the category against its budget and
/// appends an overspend alert when the monthly total is over the limit.
pub struct BudgetAlertDecorator {
    finance: Arc<FinanceService>,
}

impl BudgetAlertDecorator {
    pub fn new(finance: Arc<FinanceService>) -> Self {
        Self { finance }
    }
}

#[async_trait]
impl ToolDecorator for BudgetAlertDecorator {
    fn name(&self) -> &str {
        "budget_alert"
    }

    fn applies_to(&self, tool_name: &str, input: &Value) -> bool {
        match tool_name {
            "record_expense" => true,
            "record_entry" => input["kind"]
                .as_str()
                .and_then(|k| k.parse::<EntryKind>().ok())
                == Some(EntryKind::Expense),
            _ => false,
        }
    }

    async fn decorate(
        &self,
        _tool_name: &str,
        input: &Value,
        _output: &str,
    ) -> Result<Option<Decoration>, DecoratorError> {
        let category = input["category"].as_str().unwrap_or("").trim();
        let subcategory = input["subcategory"].as_str().unwrap_or("").trim();
        if category.is_empty() {
            return Ok(None);
        }

        let status = self
            .finance
            .budget_status(category, subcategory)
            .map_err(|e| DecoratorError::Failed(e.to_string()))?;

        Ok(status.filter(|s| s.exceeded()).map(|s| Decoration {
            label: "alerta de orçamento".into(),
            content: format!(
                "{} Total gasto no período {}: {}, Limite: {}.",
                overspend_alert(category, subcategory, s.spent, s.budget.limit),
                Period::default(),
                s.spent,
                s.budget.limit
            ),
        }))
    }
}
