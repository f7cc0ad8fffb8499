use serde_json::{json, Value};
use tracing::warn;

use super::handler::{ToolDef, ToolGroup, ToolHandler};

/// Summary of one agent group, for listing what the assistant can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
}

/// Catalog of available tools. Stores definitions, provides schemas,
/// looks up handlers by name, and offers a built-in search for tool discovery.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
    groups: Vec<(String, String)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Register a single ungrouped tool.
    pub fn add(
        mut self,
        name: impl Into<String>,
        schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.insert(ToolDef {
            name: name.into(),
            schema,
            group: None,
            handler: Box::new(handler),
        });
        self
    }

    /// Register every tool of an agent group.
    pub fn add_group(mut self, group: ToolGroup) -> Self {
        self.groups.retain(|(name, _)| *name != group.name);
        self.groups.push((group.name, group.description));
        for tool in group.tools {
            self.insert(tool);
        }
        self
    }

    /// Tool names are unique; a later registration replaces the earlier one.
    fn insert(&mut self, tool: ToolDef) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name == tool.name) {
            warn!(tool = %tool.name, "tool registered twice, replacing");
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// All tool schemas for the LLM API request.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.schema.clone()).collect()
    }

    /// Schema for a specific tool by name.
    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.tools.iter().find(|t| t.name == name).map(|t| &t.schema)
    }

    pub async fn execute(&self, name: &str, input: &Value) -> Result<String, String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| format!("unknown tool: {name}"))?;
        tool.handler.call(input).await
    }

    /// Search tools by query. Matches against name, description and group.
    /// Returns compact summaries without the input schema.
    pub fn search(&self, query: &str) -> Vec<Value> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();

        self.tools
            .iter()
            .filter(|t| {
                let name = t.name.to_lowercase();
                let desc = t.schema["description"]
                    .as_str()
                    .unwrap_or("")
                    .to_lowercase();
                let group = t.group.as_deref().unwrap_or("").to_lowercase();
                let haystack = format!("{name} {desc} {group}");

                terms.iter().any(|term| haystack.contains(term))
            })
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.schema["description"],
                    "group": t.group,
                })
            })
            .collect()
    }

    /// The schema for the built-in `tool_search` meta-tool.
    pub fn search_tool_schema() -> Value {
        json!({
            "name": "tool_search",
            "description": "Search for available tools by keyword (name, description or agent group such as financeiro, agenda, trabalho, pesquisa). Returns tool names and descriptions matching the query.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Keywords to match against tool names, descriptions and groups"
                    }
                },
                "required": ["query"]
            }
        })
    }

    /// Registered agent groups with their tool names, in registration order.
    pub fn groups(&self) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|(name, description)| GroupSummary {
                name: name.clone(),
                description: description.clone(),
                tools: self
                    .tools
                    .iter()
                    .filter(|t| t.group.as_deref() == Some(name.as_str()))
                    .map(|t| t.name.clone())
                    .collect(),
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
