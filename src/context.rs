use serde_json::{json, Value};
use tracing::debug;

use crate::error::AgentError;
use crate::types::{ContentBlock, InferenceRequest, InferenceResponse};

/// Owns everything the LLM sees. The one place all context decisions happen.
pub trait ContextManager: Send + Sync {
    /// Build the complete inference request for the next turn.
    fn build_request(&self) -> InferenceRequest;

    /// Record a new user prompt.
    fn add_prompt(&mut self, prompt: &str);

    /// Record what the model said.
    fn record_response(&mut self, response: &InferenceResponse);

    /// Record a tool execution result.
    fn record_tool_result(&mut self, call_id: &str, name: &str, result: &str, is_error: bool);

    /// Serialize the context state for session persistence.
    fn snapshot(&self) -> Value;

    /// Restore from a serialized snapshot.
    fn restore(&mut self, snapshot: &Value) -> Result<(), AgentError>;
}

/// Conversation history with a bounded window.
///
/// When a new prompt pushes the history past `history_limit` messages, whole
/// exchanges are dropped from the front so the history always starts at a
/// user prompt and never at an orphaned tool result.
pub struct ConversationContext {
    model: String,
    max_tokens: u32,
    system: Option<String>,
    messages: Vec<Value>,
    tool_schemas: Vec<Value>,
    history_limit: usize,
}

impl ConversationContext {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system: None,
            messages: Vec::new(),
            tool_schemas: Vec::new(),
            history_limit: 40,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, schemas: Vec<Value>) -> Self {
        self.tool_schemas = schemas;
        self
    }

    /// Maximum number of messages kept between prompts. At least one.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    fn trim_history(&mut self) {
        if self.messages.len() <= self.history_limit {
            return;
        }
        let excess = self.messages.len() - self.history_limit;
        let cut = self
            .messages
            .iter()
            .enumerate()
            .skip(excess)
            .find(|(_, m)| is_prompt(m))
            .map(|(i, _)| i)
            .unwrap_or(excess);

        self.messages.drain(..cut);
        debug!(dropped = cut, kept = self.messages.len(), "history trimmed");
    }
}

/// A plain user prompt, as opposed to a user message carrying tool results.
fn is_prompt(message: &Value) -> bool {
    message["role"] == "user" && message["content"].is_string()
}

impl ContextManager for ConversationContext {
    fn build_request(&self) -> InferenceRequest {
        InferenceRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.system.clone(),
            tools: self.tool_schemas.clone(),
            messages: self.messages.clone(),
        }
    }

    fn add_prompt(&mut self, prompt: &str) {
        self.messages.push(json!({
            "role": "user",
            "content": prompt,
        }));
        self.trim_history();
    }

    fn record_response(&mut self, response: &InferenceResponse) {
        let content: Vec<Value> = response
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text(text) => json!({
                    "type": "text",
                    "text": text,
                }),
                ContentBlock::ToolUse { id, name, input } => json!({
                    "type": "tool_use",
                    "id": id,
                    "name": name,
                    "input": input,
                }),
            })
            .collect();

        self.messages.push(json!({
            "role": "assistant",
            "content": content,
        }));
    }

    fn record_tool_result(&mut self, call_id: &str, name: &str, result: &str, is_error: bool) {
        let mut tool_result = json!({
            "type": "tool_result",
            "tool_use_id": call_id,
            "tool_name": name,
            "content": result,
        });
        if is_error {
            tool_result["is_error"] = json!(true);
        }

        // Batch tool results of the same turn into one user message.
        if let Some(last) = self.messages.last_mut() {
            let is_tool_result_msg = last["role"] == "user"
                && last["content"]
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(|c| c.get("type"))
                    .and_then(Value::as_str)
                    == Some("tool_result");

            if is_tool_result_msg {
                if let Some(arr) = last.get_mut("content").and_then(Value::as_array_mut) {
                    arr.push(tool_result);
                    return;
                }
            }
        }

        self.messages.push(json!({
            "role": "user",
            "content": [tool_result],
        }));
    }

    /// Only the conversation itself is persisted. Model, system prompt and
    /// tools come from the current configuration on restore.
    fn snapshot(&self) -> Value {
        json!({
            "messages": self.messages,
        })
    }

    fn restore(&mut self, snapshot: &Value) -> Result<(), AgentError> {
        self.messages = snapshot["messages"]
            .as_array()
            .ok_or_else(|| AgentError::Context("missing messages in snapshot".into()))?
            .clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StopReason, Usage};

    fn tool_call(id: &str) -> InferenceResponse {
        InferenceResponse {
            stop_reason: StopReason::ToolUse,
            content: vec![ContentBlock::ToolUse {
                id: id.into(),
                name: "expense_summary".into(),
                input: json!({}),
            }],
            usage: Usage::default(),
        }
    }

    fn answer(text: &str) -> InferenceResponse {
        InferenceResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Text(text.into())],
            usage: Usage::default(),
        }
    }

    /// prompt, tool call, tool result, answer: four messages.
    fn exchange(ctx: &mut ConversationContext, n: usize) {
        ctx.add_prompt(&format!("pergunta {n}"));
        ctx.record_response(&tool_call(&format!("call_{n}")));
        ctx.record_tool_result(&format!("call_{n}"), "expense_summary", "ok", false);
        ctx.record_response(&answer(&format!("resposta {n}")));
    }

    #[test]
    fn request_carries_system_and_tools() {
        let ctx = ConversationContext::new("gpt-4o-mini", 512)
            .with_system("Você é um assistente.")
            .with_tools(vec![json!({"name": "t"})]);
        let req = ctx.build_request();
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.system.as_deref(), Some("Você é um assistente."));
        assert_eq!(req.tools.len(), 1);
        assert!(req.messages.is_empty());
    }

    #[test]
    fn tool_results_batch_into_one_message() {
        let mut ctx = ConversationContext::new("m", 100);
        ctx.add_prompt("oi");
        ctx.record_response(&tool_call("a"));
        ctx.record_tool_result("a", "x", "1", false);
        ctx.record_tool_result("b", "y", "2", true);

        let msgs = ctx.messages();
        assert_eq!(msgs.len(), 3);
        let results = msgs[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["is_error"], true);
        assert!(results[0].get("is_error").is_none());
    }

    #[test]
    fn history_trims_at_prompt_boundaries() {
        let mut ctx = ConversationContext::new("m", 100).with_history_limit(6);
        exchange(&mut ctx, 1);
        exchange(&mut ctx, 2);
        ctx.add_prompt("pergunta 3");

        // 9 messages exceed the limit; the cut lands on the next prompt at or
        // after the excess, so exchange 1 is dropped whole.
        let msgs = ctx.messages();
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[0]["content"], "pergunta 2");
        assert_eq!(msgs[4]["content"], "pergunta 3");
    }

    #[test]
    fn latest_prompt_always_survives() {
        let mut ctx = ConversationContext::new("m", 100).with_history_limit(1);
        exchange(&mut ctx, 1);
        ctx.add_prompt("última");
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0]["content"], "última");
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut ctx = ConversationContext::new("m", 100);
        exchange(&mut ctx, 1);
        let snap = ctx.snapshot();

        let mut restored = ConversationContext::new("outro", 100);
        restored.restore(&snap).unwrap();
        assert_eq!(restored.messages(), ctx.messages());
        assert_eq!(restored.build_request().model, "outro");
    }

    #[test]
    fn restore_rejects_bad_snapshot() {
        let mut ctx = ConversationContext::new("m", 100);
        assert!(matches!(
            ctx.restore(&json!({"foo": 1})),
            Err(AgentError::Context(_))
        ));
    }
}
