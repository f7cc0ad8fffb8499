use serde_json::Value;
use tracing::{info, warn};

use super::registry::ToolRegistry;
use crate::decorator::{Decoration, ToolDecorator};

/// Executes tools and enriches successful output with decorations
/// (budget alerts and the like).
///
/// Decorators are non-fatal. A failing decorator logs a warning and the
/// pipeline continues with the undecorated output.
pub struct ToolPipeline {
    registry: ToolRegistry,
    decorators: Vec<Box<dyn ToolDecorator>>,
}

impl ToolPipeline {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            decorators: Vec::new(),
        }
    }

    /// Add a decorator. Decorators run in insertion order.
    pub fn with_decorator(mut self, decorator: impl ToolDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    /// Execute a tool by name and decorate the result. Failed calls are
    /// returned as-is.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<String, String> {
        if name == "tool_search" {
            let query = input["query"].as_str().unwrap_or("");
            let results = self.registry.search(query);
            return Ok(serde_json::to_string_pretty(&results).unwrap_or_else(|_| "[]".into()));
        }

        info!(tool = name, "executing tool");
        let raw = self.registry.execute(name, input).await?;
        Ok(self.run(name, input, raw).await)
    }

    /// Run the decorators on arbitrary output (no tool lookup).
    pub async fn run(&self, tool_name: &str, input: &Value, raw_output: String) -> String {
        let decorations = self.decorate(tool_name, input, &raw_output).await;
        if decorations.is_empty() {
            return raw_output;
        }

        format!(
            "{}\n\n---\n{}",
            raw_output,
            decorations
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join("\n\n")
        )
    }

    async fn decorate(&self, tool_name: &str, input: &Value, output: &str) -> Vec<Decoration> {
        let mut decorations = Vec::new();

        for dec in &self.decorators {
            if !dec.applies_to(tool_name, input) {
                continue;
            }
            match dec.decorate(tool_name, input, output).await {
                Ok(Some(decoration)) => decorations.push(decoration),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        decorator = dec.name(),
                        tool = tool_name,
                        error = %e,
                        "decorator failed, skipping"
                    );
                }
            }
        }

        decorations
    }

    /// Schemas for every registered tool plus the `tool_search` meta-tool.
    pub fn schemas(&self) -> Vec<Value> {
        let mut schemas = self.registry.schemas();
        if !schemas.is_empty() {
            schemas.push(ToolRegistry::search_tool_schema());
        }
        schemas
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.registry.tool_names()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}
