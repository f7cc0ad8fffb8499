pub mod budget_alert;

use async_trait::async_trait;
use serde_json::Value;

pub use budget_alert::BudgetAlertDecorator;

/// Error from a decorator. Non-fatal: the tool output still goes through.
#[derive(Debug, thiserror::Error)]
pub enum DecoratorError {
    #[error("{0}")]
    Failed(String),
}

/// A decorator enriches successful tool output with context appended after it.
#[async_trait]
pub trait ToolDecorator: Send + Sync {
    fn name(&self) -> &str;

    fn applies_to(&self, tool_name: &str, input: &Value) -> bool;

    /// Return additional context to append. `Ok(None)` means nothing to add.
    async fn decorate(
        &self,
        tool_name: &str,
        input: &Value,
        output: &str,
    ) -> Result<Option<Decoration>, DecoratorError>;
}

/// A labeled block of additional context appended to tool output.
#[derive(Debug, Clone)]
pub struct Decoration {
    pub label: String,
    pub content: String,
}

impl std::fmt::Display for Decoration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]\n{}", self.label, self.content)
    }
}
