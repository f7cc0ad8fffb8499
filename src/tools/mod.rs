pub mod args;
pub mod handler;
pub mod pipeline;
pub mod registry;

pub use handler::{ToolDef, ToolGroup, ToolHandler};
pub use pipeline::ToolPipeline;
pub use registry::{GroupSummary, ToolRegistry};
