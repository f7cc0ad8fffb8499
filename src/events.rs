use serde_json::Value;

/// Events emitted while the assistant works on a request, for the CLI to render.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    TurnStart { turn: usize },
    Text { content: String },
    ToolCall { name: String, input: Value },
    ToolResult { name: String, output: String, is_error: bool },
    Finished { turns: usize },
}
