use async_trait::async_trait;
use serde_json::Value;

/// A tool's execution handler. `Err` is reported back to the model as a
/// failed tool call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: &Value) -> Result<String, String>;
}

/// A tool definition: schema for the LLM + handler for execution.
pub struct ToolDef {
    pub name: String,
    pub schema: Value,
    /// The agent group this tool belongs to, if any.
    pub group: Option<String>,
    pub(crate) handler: Box<dyn ToolHandler>,
}

/// A named set of tools exposed together ("agente"), e.g. `financeiro`.
pub struct ToolGroup {
    pub name: String,
    pub description: String,
    pub(crate) tools: Vec<ToolDef>,
}

impl ToolGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tools: Vec::new(),
        }
    }

    /// Add a tool. The schema is the complete JSON tool definition
    /// (name, description, input_schema) sent to the LLM.
    pub fn add(
        mut self,
        name: impl Into<String>,
        schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.tools.push(ToolDef {
            name: name.into(),
            schema,
            group: Some(self.name.clone()),
            handler: Box::new(handler),
        });
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
