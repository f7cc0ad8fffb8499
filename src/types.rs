use serde_json::Value;

/// Fully-formed request. The provider just sends it.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub tools: Vec<Value>,
    pub messages: Vec<Value>,
}

impl InferenceRequest {
    /// A tool-less, single-question request. Used by the research tool.
    pub fn single_prompt(
        model: impl Into<String>,
        max_tokens: u32,
        system: Option<String>,
        prompt: &str,
    ) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system,
            tools: Vec::new(),
            messages: vec![serde_json::json!({ "role": "user", "content": prompt })],
        }
    }
}

/// What came back from the LLM.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

impl InferenceResponse {
    /// All text blocks joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    ToolUse { id: String, name: String, input: Value },
}

/// Token usage for a single inference call.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn accumulate(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}
