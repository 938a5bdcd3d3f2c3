//! Tool execution errors

/// Errors surfaced by tool registration and execution
///
/// Execution errors never abort the run: the registry renders them into an
/// error-flagged tool result so the model can see what went wrong and adjust.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registration-time: a tool with this name already exists
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    /// Registration-time: the tool's parameter schema is malformed
    #[error("Invalid schema for tool {tool}: {reason}")]
    InvalidSchema { tool: String, reason: String },
}
