//! Completion service client
//!
//! Provides the `LlmClient` trait plus an OpenAI-compatible implementation.
//! The orchestration loop only ever holds one outstanding request.

mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use client::mock;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, TokenUsage, ToolCallRequest, ToolDefinition,
};
