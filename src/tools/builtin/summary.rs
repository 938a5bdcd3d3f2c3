//! Tools that read and edit the summary file

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::tools::traits::parse_args;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

async fn read_summary_file(ctx: &ToolContext) -> Result<String, ToolError> {
    tokio::fs::read_to_string(&ctx.output_path).await.map_err(Into::into)
}

/// Returns the current contents of the summary file
pub struct ReadSummary;

#[async_trait]
impl Tool for ReadSummary {
    fn name(&self) -> &str {
        "read_summary"
    }

    fn description(&self) -> &str {
        "Read the current contents of the summary file, including any \
         placeholders still to be filled."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Text(read_summary_file(ctx).await?))
    }
}

#[derive(Debug, Deserialize)]
struct FillSectionParams {
    section: String,
    content: String,
}

/// Replaces a `{{SECTION}}` placeholder with content and records the fill
pub struct FillSection;

#[async_trait]
impl Tool for FillSection {
    fn name(&self) -> &str {
        "fill_section"
    }

    fn description(&self) -> &str {
        "Replace a {{PLACEHOLDER}} in the summary file with your content. The \
         section argument is the placeholder name without braces, e.g. \
         EXECUTIVE_SUMMARY for {{EXECUTIVE_SUMMARY}}."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "section": {
                    "type": "string",
                    "description": "Placeholder name, without the surrounding braces"
                },
                "content": {
                    "type": "string",
                    "description": "Text to put in place of the placeholder"
                }
            },
            "required": ["section", "content"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let params: FillSectionParams = parse_args(args)?;
        if params.section.is_empty() {
            return Err(ToolError::InvalidArguments("section must not be empty".to_string()));
        }

        let placeholder = format!("{{{{{}}}}}", params.section);
        let summary = read_summary_file(ctx).await?;
        if !summary.contains(&placeholder) {
            return Err(ToolError::Failed(format!(
                "Placeholder {placeholder} not found in the summary. Use read_summary \
                 to see which placeholders remain."
            )));
        }

        let updated = summary.replacen(&placeholder, &params.content, 1);
        tokio::fs::write(&ctx.output_path, updated).await?;

        debug!(section = %params.section, "FillSection::execute: section filled");
        ctx.tracker
            .lock()
            .await
            .mark_section_filled(&params.section, &params.content);

        Ok(ToolOutput::None)
    }
}

#[derive(Debug, Deserialize)]
struct EditSummaryParams {
    search_text: String,
    replace_text: String,
}

/// First-occurrence exact text replacement in the summary file
pub struct EditSummary;

#[async_trait]
impl Tool for EditSummary {
    fn name(&self) -> &str {
        "edit_summary"
    }

    fn description(&self) -> &str {
        "Replace the first exact occurrence of a search string in the summary \
         file. Use this to revise text you have already written."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "search_text": {
                    "type": "string",
                    "description": "Exact text to find (must not be empty)"
                },
                "replace_text": {
                    "type": "string",
                    "description": "Replacement text"
                }
            },
            "required": ["search_text", "replace_text"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let params: EditSummaryParams = parse_args(args)?;
        if params.search_text.is_empty() {
            return Err(ToolError::InvalidArguments("search_text must not be empty".to_string()));
        }

        let summary = read_summary_file(ctx).await?;
        if !summary.contains(&params.search_text) {
            return Err(ToolError::Failed(
                "Search text not found in the summary.".to_string(),
            ));
        }

        let updated = summary.replacen(&params.search_text, &params.replace_text, 1);
        tokio::fs::write(&ctx.output_path, updated).await?;

        Ok(ToolOutput::None)
    }
}
