//! docsum - checkpointed LLM loop for summarizing large documents
//!
//! Drives a completion model through a read/fill cycle over a document too
//! large for one context window: the model reads the source in chunks via
//! tools, fills a structured summary template section by section, and the
//! engine keeps the conversation under budget, tracks coverage, and
//! checkpoints progress so interrupted runs can resume.

pub mod checkpoint;
pub mod config;
pub mod context;
pub mod llm;
#[path = "loop/mod.rs"]
pub mod r#loop;
pub mod progress;
pub mod prompts;
pub mod tools;

pub use config::Config;
pub use r#loop::{RunOutcome, RunReport, SummarizeEngine};
