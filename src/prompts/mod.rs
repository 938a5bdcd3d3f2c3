//! Prompt text and template handling
//!
//! The engine writes the template itself (stamping the document metadata)
//! rather than asking the model to create it, so a malformed template is not
//! a possible failure mode.

mod embedded;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

pub use embedded::{SUMMARY_TEMPLATE, SYSTEM_PROMPT};

/// Placeholders the engine stamps when writing the template; everything else
/// is a section for the model
const STAMPED: &[&str] = &["SOURCE_FILE", "TOTAL_LINES", "GENERATION_DATE"];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("placeholder regex is valid"));

/// All distinct `{{NAME}}` placeholders in `content`, in order of first
/// appearance
pub fn find_placeholders(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in PLACEHOLDER_RE.captures_iter(content) {
        let name = cap[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Section placeholders the model is expected to fill
pub fn section_names(template: &str) -> Vec<String> {
    find_placeholders(template)
        .into_iter()
        .filter(|name| !STAMPED.contains(&name.as_str()))
        .collect()
}

/// Render the template for writing: stamp source path, line count, and date
pub fn render_template(
    template: &str,
    source_path: &str,
    total_lines: u64,
    generated_on: DateTime<Utc>,
) -> String {
    template
        .replace("{{SOURCE_FILE}}", source_path)
        .replace("{{TOTAL_LINES}}", &total_lines.to_string())
        .replace("{{GENERATION_DATE}}", &generated_on.format("%Y-%m-%d").to_string())
}

/// Build the initial task message for a run
pub fn task_prompt(source_path: &str, output_path: &str, chunk_size: u64, sections: &[String]) -> String {
    format!(
        "Please create a comprehensive summary of the report.\n\n\
         **Source file:** {source_path}\n\
         **Summary file:** {output_path} (already created from the template)\n\n\
         The summary file contains these placeholders to fill:\n{placeholders}\n\n\
         Instructions:\n\
         1. Call get_document_info to learn the total line count\n\
         2. Read the source file in chunks of about {chunk_size} lines using read_lines\n\
         3. For each chunk, identify relevant information for each section\n\
         4. Use fill_section to replace each placeholder with extracted content\n\
         5. Continue until the ENTIRE source file has been read\n\
         6. Ensure all placeholders are replaced with actual content or \
         \"Information not available in the source document\"\n\n\
         Start now by checking the document info.",
        placeholders = sections
            .iter()
            .map(|s| format!("- {{{{{s}}}}}"))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
