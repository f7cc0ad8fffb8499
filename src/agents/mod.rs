//! The assistant's agents: tool groups wired onto shared services.

pub mod agenda;
pub mod finance;
pub mod research;
pub mod work;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::clock::{self, Clock};
use crate::decorator::BudgetAlertDecorator;
use crate::finance::FinanceService;
use crate::inference::InferenceProvider;
use crate::store::Ledger;
use crate::tools::{ToolPipeline, ToolRegistry};

const SYSTEM_PROMPT: &str = "\
Você é um assistente pessoal. Use as ferramentas disponíveis para atender ao pedido do usuário:
- financeiro: gastos, receitas, orçamentos e relatórios;
- agenda: compromissos e lembretes;
- trabalho: automação de tarefas e organização de projetos;
- pesquisa: perguntas gerais.
Valores estão em reais. Se faltar uma informação obrigatória, pergunte antes de chamar a ferramenta.
Responda sempre em português, de forma breve.";

/// The system prompt, stamped with the current date so relative dates
/// ("ontem", "semana que vem") can be resolved.
pub fn system_prompt(now: NaiveDateTime) -> String {
    format!("{SYSTEM_PROMPT}\nData e hora atuais: {}.", clock::display(&now))
}

/// Everything the agents need.
pub struct Services {
    pub ledger: Arc<Ledger>,
    pub clock: Arc<dyn Clock>,
    pub provider: Arc<dyn InferenceProvider>,
    pub model: String,
    pub max_tokens: u32,
}

impl Services {
    /// Registry with all four groups.
    pub fn registry(&self, finance: Arc<FinanceService>) -> ToolRegistry {
        ToolRegistry::new()
            .add_group(finance::group(finance))
            .add_group(agenda::group(self.ledger.clone(), self.clock.clone()))
            .add_group(work::group(self.ledger.clone(), self.clock.clone()))
            .add_group(research::group(
                self.provider.clone(),
                &self.model,
                self.max_tokens,
            ))
    }

    /// The full pipeline: every agent plus the budget alert decorator.
    pub fn pipeline(&self) -> ToolPipeline {
        let finance = Arc::new(FinanceService::new(self.ledger.clone(), self.clock.clone()));
        ToolPipeline::new(self.registry(finance.clone()))
            .with_decorator(BudgetAlertDecorator::new(finance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{from_storage, FixedClock};
    use crate::error::InferenceError;
    use crate::types::{InferenceRequest, InferenceResponse};
    use async_trait::async_trait;
    use serde_json::json;

    struct Unreachable;

    #[async_trait]
    impl InferenceProvider for Unreachable {
        async fn infer(&self, _: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
            Err(InferenceError::Request("offline".into()))
        }
    }

    fn services() -> Services {
        Services {
            ledger: Arc::new(Ledger::open_in_memory().unwrap()),
            clock: Arc::new(FixedClock(from_storage("2024-05-20 12:00:00").unwrap())),
            provider: Arc::new(Unreachable),
            model: "gpt-4o-mini".into(),
            max_tokens: 256,
        }
    }

    #[test]
    fn every_group_is_registered() {
        let pipeline = services().pipeline();
        let groups: Vec<String> = pipeline
            .registry()
            .groups()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(groups, vec!["financeiro", "agenda", "trabalho", "pesquisa"]);
        assert_eq!(pipeline.len(), 13 + 2 + 2 + 1);
        // tool_search rides along.
        assert_eq!(pipeline.schemas().len(), pipeline.len() + 1);
    }

    #[tokio::test]
    async fn expense_over_budget_gets_alert() {
        let pipeline = services().pipeline();
        pipeline
            .execute("set_budget", &json!({"category": "lazer", "limit": 50}))
            .await
            .unwrap();
        let out = pipeline
            .execute("record_expense", &json!({"amount": 80, "category": "lazer"}))
            .await
            .unwrap();
        assert!(out.starts_with("Gasto de R$ 80.00 registrado"));
        assert!(out.contains("\n\n---\n[alerta de orçamento]\nAtenção: Você ultrapassou o orçamento de lazer"));
    }

    #[tokio::test]
    async fn tool_search_finds_calendar() {
        let pipeline = services().pipeline();
        let out = pipeline
            .execute("tool_search", &json!({"query": "agenda"}))
            .await
            .unwrap();
        assert!(out.contains("add_event"));
        assert!(out.contains("list_events"));
    }

    #[test]
    fn prompt_carries_date() {
        let prompt = system_prompt(from_storage("2024-05-20 12:00:00").unwrap());
        assert!(prompt.ends_with("Data e hora atuais: 20/05/2024 12:00."));
    }
}
