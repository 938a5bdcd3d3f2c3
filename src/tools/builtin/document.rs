//! Tools that read the source document

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::tools::traits::parse_args;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

/// Cap on search hits returned to the model
const MAX_SEARCH_RESULTS: usize = 50;

/// Load the source document as numbered lines
async fn source_lines(ctx: &ToolContext) -> Result<Vec<String>, ToolError> {
    let text = tokio::fs::read_to_string(&ctx.source_path).await?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Reports the document's path, line count, and byte size
pub struct GetDocumentInfo;

#[async_trait]
impl Tool for GetDocumentInfo {
    fn name(&self) -> &str {
        "get_document_info"
    }

    fn description(&self) -> &str {
        "Get the source document's path, total line count, and size in bytes. \
         Call this first to plan your reading."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let metadata = tokio::fs::metadata(&ctx.source_path).await?;
        let lines = source_lines(ctx).await?;
        let percent = ctx.tracker.lock().await.percent_complete();

        Ok(ToolOutput::Json(serde_json::json!({
            "path": ctx.source_path.display().to_string(),
            "total_lines": lines.len(),
            "size_bytes": metadata.len(),
            "percent_read": percent,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct ReadLinesParams {
    start_line: u64,
    /// Omitted means read to end of file
    end_line: Option<u64>,
}

/// Reads an inclusive 1-indexed line range and records it as read
pub struct ReadLines;

#[async_trait]
impl Tool for ReadLines {
    fn name(&self) -> &str {
        "read_lines"
    }

    fn description(&self) -> &str {
        "Read an inclusive range of lines from the source document. Lines are \
         1-indexed. The range you receive is recorded as read, so do not \
         re-read lines you have already seen."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "start_line": {
                    "type": "integer",
                    "description": "First line to read (1-indexed, inclusive)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "Last line to read (inclusive); omit to read to end of file"
                }
            },
            "required": ["start_line"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let params: ReadLinesParams = parse_args(args)?;

        let lines = source_lines(ctx).await?;
        let total = lines.len() as u64;

        let end_line = params.end_line.unwrap_or(total);
        if params.start_line > end_line {
            return Err(ToolError::InvalidArguments(format!(
                "start_line ({}) must not exceed end_line ({end_line})",
                params.start_line
            )));
        }

        // Clamp to the document rather than erroring; the model often
        // overshoots the last chunk
        let lo = params.start_line.max(1);
        let hi = end_line.min(total);
        if total == 0 || lo > hi {
            return Ok(ToolOutput::Text(format!(
                "The requested range is beyond the end of the document ({total} lines)."
            )));
        }

        debug!(lo, hi, "ReadLines::execute: marking range read");
        ctx.tracker.lock().await.mark_read(lo, hi);

        let numbered: Vec<String> = (lo..=hi)
            .map(|n| format!("{n}: {}", lines[(n - 1) as usize]))
            .collect();
        Ok(ToolOutput::Lines(numbered))
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    pattern: String,
    #[serde(default)]
    case_sensitive: bool,
}

/// Substring search over the document
pub struct SearchDocument;

#[async_trait]
impl Tool for SearchDocument {
    fn name(&self) -> &str {
        "search_document"
    }

    fn description(&self) -> &str {
        "Substring search over the source document (case-insensitive unless \
         case_sensitive is true). Returns matching lines with their line \
         numbers. Searching does not mark anything as read."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Text to search for"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Match case exactly (default false)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let params: SearchParams = parse_args(args)?;
        if params.pattern.is_empty() {
            return Err(ToolError::InvalidArguments("pattern must not be empty".to_string()));
        }

        let lines = source_lines(ctx).await?;
        let needle = if params.case_sensitive {
            params.pattern.clone()
        } else {
            params.pattern.to_lowercase()
        };
        let hit = |line: &str| {
            if params.case_sensitive {
                line.contains(&needle)
            } else {
                line.to_lowercase().contains(&needle)
            }
        };

        let mut matches: Vec<String> = Vec::new();
        let mut overflow = 0usize;
        for (idx, line) in lines.iter().enumerate() {
            if hit(line) {
                if matches.len() < MAX_SEARCH_RESULTS {
                    matches.push(format!("{}: {line}", idx + 1));
                } else {
                    overflow += 1;
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolOutput::Text(format!("No matches for \"{}\".", params.pattern)));
        }
        if overflow > 0 {
            matches.push(format!("... ({overflow} more matches not shown)"));
        }
        Ok(ToolOutput::Lines(matches))
    }
}
