//! Tools the model can call during a run

pub mod builtin;
mod context;
mod error;
mod registry;
mod traits;

pub use context::ToolContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolOutput, ToolResult};
