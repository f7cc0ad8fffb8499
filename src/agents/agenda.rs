//! The `agenda` agent: a small calendar kept in the ledger.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::clock::{self, Clock};
use crate::store::{Event, Ledger};
use crate::tools::args::{optional_timestamp, optional_usize, required_str};
use crate::tools::{ToolGroup, ToolHandler};

pub const GROUP: &str = "agenda";

const MAX_LISTED: usize = 50;

pub struct AddEventTool {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ToolHandler for AddEventTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let title = required_str(input, "title")?.trim();
        let when = optional_timestamp(input, "when")?;

        let id = self
            .ledger
            .insert_event(title, when, self.clock.now())
            .map_err(|e| e.to_string())?;
        info!(id, title, "event added");

        Ok(match when {
            Some(at) => format!(
                "Evento '{title}' adicionado à agenda para {}.",
                clock::display(&at)
            ),
            None => format!("Evento '{title}' adicionado à agenda (sem data definida)."),
        })
    }
}

pub struct ListEventsTool {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ToolHandler for ListEventsTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let limit = optional_usize(input, "limit", 10).clamp(1, MAX_LISTED);
        let events = self
            .ledger
            .upcoming_events(self.clock.now(), limit)
            .map_err(|e| e.to_string())?;

        if events.is_empty() {
            return Ok("Nenhum evento agendado.".into());
        }
        Ok(events.iter().map(event_line).collect::<Vec<_>>().join("\n"))
    }
}

fn event_line(event: &Event) -> String {
    match &event.when {
        Some(at) => format!("- {}: {}", clock::display(at), event.title),
        None => format!("- (sem data): {}", event.title),
    }
}

pub fn group(ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> ToolGroup {
    ToolGroup::new(GROUP, "Agenda: compromissos e lembretes.")
        .add(
            "add_event",
            json!({
                "name": "add_event",
                "description": "Add an event or reminder to the calendar.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "What the event is"},
                        "when": {"type": "string", "description": "Date or date-time, YYYY-MM-DD HH:MM. Omit for an undated reminder"}
                    },
                    "required": ["title"]
                }
            }),
            AddEventTool {
                ledger: ledger.clone(),
                clock: clock.clone(),
            },
        )
        .add(
            "list_events",
            json!({
                "name": "list_events",
                "description": "List upcoming events, soonest first, followed by undated reminders.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "limit": {"type": "integer", "description": "Maximum events to list (default 10)"}
                    }
                }
            }),
            ListEventsTool { ledger, clock },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{from_storage, FixedClock};

    fn parts() -> (Arc<Ledger>, Arc<dyn Clock>) {
        let ledger = Arc::new(Ledger::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock(from_storage("2024-05-20 12:00:00").unwrap()));
        (ledger, clock)
    }

    #[tokio::test]
    async fn add_and_list() {
        let (ledger, clock) = parts();
        let add = AddEventTool {
            ledger: ledger.clone(),
            clock: clock.clone(),
        };
        let list = ListEventsTool { ledger, clock };

        assert_eq!(list.call(&json!({})).await.unwrap(), "Nenhum evento agendado.");

        let out = add
            .call(&json!({"title": "Dentista", "when": "2024-05-22 15:30"}))
            .await
            .unwrap();
        assert_eq!(out, "Evento 'Dentista' adicionado à agenda para 22/05/2024 15:30.");
        add.call(&json!({"title": "Reunião", "when": "2024-05-21 09:00"}))
            .await
            .unwrap();
        add.call(&json!({"title": "Comprar presente"})).await.unwrap();
        add.call(&json!({"title": "Passado", "when": "2024-05-01"}))
            .await
            .unwrap();

        let out = list.call(&json!({})).await.unwrap();
        assert_eq!(
            out,
            "- 21/05/2024 09:00: Reunião\n- 22/05/2024 15:30: Dentista\n- (sem data): Comprar presente"
        );

        let out = list.call(&json!({"limit": 1})).await.unwrap();
        assert_eq!(out, "- 21/05/2024 09:00: Reunião");
    }

    #[tokio::test]
    async fn rejects_blank_title_and_bad_date() {
        let (ledger, clock) = parts();
        let add = AddEventTool { ledger, clock };
        assert_eq!(
            add.call(&json!({"title": "  "})).await.unwrap_err(),
            "O campo 'title' é obrigatório."
        );
        assert!(add
            .call(&json!({"title": "x", "when": "amanhã"}))
            .await
            .unwrap_err()
            .starts_with("Data inválida"));
    }

    #[test]
    fn group_has_both_tools() {
        let (ledger, clock) = parts();
        assert_eq!(group(ledger, clock).tool_names(), vec!["add_event", "list_events"]);
    }
}
