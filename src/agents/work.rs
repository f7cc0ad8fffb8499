//! The `trabalho` agent: automation requests and project plans.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::clock::{self, Clock};
use crate::store::{Ledger, TaskKind};
use crate::tools::args::{optional_timestamp, required_str};
use crate::tools::{ToolGroup, ToolHandler};

pub const GROUP: &str = "trabalho";

pub struct AutomateTaskTool {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ToolHandler for AutomateTaskTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let description = required_str(input, "description")?.trim();
        let id = self
            .ledger
            .insert_task(TaskKind::Automation, description, self.clock.now())
            .map_err(|e| e.to_string())?;
        info!(id, "automation task recorded");

        Ok(format!(
            "Tarefa de automação #{id} registrada: {description}."
        ))
    }
}

/// Records a project and answers with a plan outline. A deadline, when
/// given, also goes on the calendar.
pub struct OrganizeProjectTool {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ToolHandler for OrganizeProjectTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let description = required_str(input, "description")?.trim();
        let deadline = optional_timestamp(input, "deadline")?;
        let now = self.clock.now();

        let title = format!("Prazo: {description}");
        let id = self
            .ledger
            .insert_project(description, deadline.map(|at| (title.as_str(), at)), now)
            .map_err(|e| e.to_string())?;
        info!(id, has_deadline = deadline.is_some(), "project recorded");

        Ok(plan_outline(id, description, deadline.as_ref().map(clock::display)))
    }
}

fn plan_outline(id: i64, description: &str, deadline: Option<String>) -> String {
    let follow_up = match deadline {
        Some(at) => format!("Revisar o andamento antes do prazo ({at}), já adicionado à agenda."),
        None => "Agendar revisões periódicas do andamento.".to_string(),
    };
    format!(
        "Projeto #{id} organizado: {description}\n\
         Objetivo: definir o resultado esperado e como medir a conclusão.\n\
         Etapas:\n\
         1. Levantar requisitos e recursos necessários.\n\
         2. Dividir o trabalho em entregas menores com responsáveis.\n\
         3. Estimar prazos para cada entrega.\n\
         Acompanhamento: {follow_up}"
    )
}

pub fn group(ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> ToolGroup {
    ToolGroup::new(GROUP, "Trabalho: automação de tarefas e organização de projetos.")
        .add(
            "automate_task",
            json!({
                "name": "automate_task",
                "description": "Register a repetitive task the user wants automated.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "description": {"type": "string", "description": "What should be automated"}
                    },
                    "required": ["description"]
                }
            }),
            AutomateTaskTool {
                ledger: ledger.clone(),
                clock: clock.clone(),
            },
        )
        .add(
            "organize_project",
            json!({
                "name": "organize_project",
                "description": "Register a project and get a plan outline (objective, steps, follow-up).",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "description": {"type": "string", "description": "The project"},
                        "deadline": {"type": "string", "description": "Optional due date, YYYY-MM-DD"}
                    },
                    "required": ["description"]
                }
            }),
            OrganizeProjectTool { ledger, clock },
        )
}
