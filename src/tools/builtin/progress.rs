//! Progress reporting tool

use async_trait::async_trait;

use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

/// Reports reading progress, section state, and the next unread chunk
pub struct GetProgress;

#[async_trait]
impl Tool for GetProgress {
    fn name(&self) -> &str {
        "get_progress"
    }

    fn description(&self) -> &str {
        "Report how much of the document has been read, which summary \
         sections are filled, and which lines to read next. Call this after a \
         context truncation or whenever you are unsure of the current state."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let tracker = ctx.tracker.lock().await;
        Ok(ToolOutput::Text(tracker.recovery_summary(ctx.chunk_size)))
    }
}
