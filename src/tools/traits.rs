//! Tool trait and result types

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{ToolContext, ToolError};

/// What a tool produced on success
///
/// Rendering to the string the model sees happens in one place
/// ([`ToolOutput::render`]), so every tool reports success and structure the
/// same way.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Side effect only, nothing to show
    None,
    Text(String),
    /// Rendered one per line
    Lines(Vec<String>),
    /// Rendered as pretty-printed JSON
    Json(serde_json::Value),
}

impl ToolOutput {
    /// Render to the textual content of a tool result message
    pub fn render(&self) -> String {
        match self {
            ToolOutput::None => "Success (no return value)".to_string(),
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Lines(lines) => lines.join("\n"),
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Rendered outcome of one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name advertised to the model
    fn name(&self) -> &str;

    /// Description advertised to the model
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object
    fn input_schema(&self) -> serde_json::Value;

    /// Execute with already-parsed JSON arguments
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;
}

/// Deserialize tool arguments, mapping failures to `InvalidArguments`
pub fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
