//! LLM request/response types
//!
//! These model the OpenAI Chat Completions API (which the summarization agent
//! speaks) but stay provider-agnostic: wire conversion lives in the client.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
///
/// The system prompt travels inside `messages` as the first entry; the model
/// id and tool-choice ("auto") are supplied by the client configuration.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full conversation, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Tools advertised for this request
    pub tools: Vec<ToolDefinition>,

    /// Max tokens for the response
    pub max_tokens: u32,
}

/// A message in the conversation
///
/// One tagged variant per protocol role. There is deliberately no generic
/// `{role, content}` shape: every place that cares about tool pairing matches
/// on `AssistantToolCalls` / `ToolResult` explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    /// Assistant turn requesting tool invocations
    AssistantToolCalls {
        content: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Answer to exactly one pending tool call
    ToolResult {
        call_id: String,
        content: String,
    },
}

impl ChatMessage {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        ChatMessage::System { content: text.into() }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage::User { content: text.into() }
    }

    /// Create an assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        ChatMessage::Assistant { content: text.into() }
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        debug!(call_count = calls.len(), "ChatMessage::assistant_tool_calls: called");
        ChatMessage::AssistantToolCalls { content, calls }
    }

    /// Create a tool result message answering one call id
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    /// Tool call ids this message leaves pending (assistant tool-call turns only)
    pub fn pending_call_ids(&self) -> Option<Vec<&str>> {
        match self {
            ChatMessage::AssistantToolCalls { calls, .. } => {
                Some(calls.iter().map(|c| c.id.as_str()).collect())
            }
            _ => None,
        }
    }

    /// The call id this message answers, if it is a tool result
    pub fn answered_call_id(&self) -> Option<&str> {
        match self {
            ChatMessage::ToolResult { call_id, .. } => Some(call_id),
            _ => None,
        }
    }

    /// Character length for token estimation
    ///
    /// Counts visible content plus serialized tool call arguments - the same
    /// text the wire format carries.
    pub fn char_len(&self) -> usize {
        match self {
            ChatMessage::System { content }
            | ChatMessage::User { content }
            | ChatMessage::Assistant { content }
            | ChatMessage::ToolResult { content, .. } => content.len(),
            ChatMessage::AssistantToolCalls { content, calls } => {
                let text = content.as_deref().map_or(0, str::len);
                let calls: usize = calls
                    .iter()
                    .map(|c| c.id.len() + c.name.len() + c.arguments.to_string().len())
                    .sum();
                text + calls
            }
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id - tool results must echo this back
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Response from a completion request
///
/// One assistant message: either text content, or a list of tool calls
/// (possibly with accompanying text).
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Convert into the conversation message to append
    pub fn into_message(self) -> ChatMessage {
        if self.tool_calls.is_empty() {
            ChatMessage::assistant(self.content.unwrap_or_default())
        } else {
            ChatMessage::assistant_tool_calls(self.content, self.tool_calls)
        }
    }

    /// Whether the model requested any tool invocations
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage reported by the completion service
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Tool definition advertised to the LLM
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: serde_json::Value) -> Self {
        let name = name.into();
        debug!(%name, "ToolDefinition::new: called");
        Self {
            name,
            description: description.into(),
            parameters,
        }
    }

    /// Convert to OpenAI function-calling schema format
    pub fn to_openai_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::user("Hello");
        assert!(matches!(msg, ChatMessage::User { ref content } if content == "Hello"));

        let msg = ChatMessage::tool_result("call_1", "done");
        assert_eq!(msg.answered_call_id(), Some("call_1"));
        assert!(msg.pending_call_ids().is_none());
    }

    #[test]
    fn test_pending_call_ids() {
        let msg = ChatMessage::assistant_tool_calls(
            None,
            vec![
                ToolCallRequest {
                    id: "a".to_string(),
                    name: "read_lines".to_string(),
                    arguments: serde_json::json!({"start_line": 1}),
                },
                ToolCallRequest {
                    id: "b".to_string(),
                    name: "get_progress".to_string(),
                    arguments: serde_json::json!({}),
                },
            ],
        );

        assert_eq!(msg.pending_call_ids(), Some(vec!["a", "b"]));
        assert_eq!(msg.answered_call_id(), None);
    }

    #[test]
    fn test_char_len_counts_arguments() {
        let plain = ChatMessage::user("12345");
        assert_eq!(plain.char_len(), 5);

        let calls = ChatMessage::assistant_tool_calls(
            Some("x".to_string()),
            vec![ToolCallRequest {
                id: "id".to_string(),
                name: "n".to_string(),
                arguments: serde_json::json!({"k": "v"}),
            }],
        );
        // 1 (text) + 2 (id) + 1 (name) + len of {"k":"v"}
        assert_eq!(calls.char_len(), 1 + 2 + 1 + r#"{"k":"v"}"#.len());
    }

    #[test]
    fn test_into_message_text() {
        let response = CompletionResponse {
            content: Some("All done".to_string()),
            tool_calls: vec![],
            usage: TokenUsage::default(),
        };

        assert!(!response.has_tool_calls());
        let msg = response.into_message();
        assert!(matches!(msg, ChatMessage::Assistant { ref content } if content == "All done"));
    }

    #[test]
    fn test_into_message_tool_calls() {
        let response = CompletionResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "read_lines".to_string(),
                arguments: serde_json::json!({"start_line": 1, "end_line": 300}),
            }],
            usage: TokenUsage::default(),
        };

        assert!(response.has_tool_calls());
        let msg = response.into_message();
        assert_eq!(msg.pending_call_ids(), Some(vec!["call_1"]));
    }

    #[test]
    fn test_tool_definition_to_openai_schema() {
        let tool = ToolDefinition::new(
            "read_lines",
            "Read a line range",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "start_line": { "type": "integer" }
                },
                "required": ["start_line"]
            }),
        );

        let schema = tool.to_openai_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "read_lines");
        assert!(schema["function"]["parameters"].is_object());
    }
}
