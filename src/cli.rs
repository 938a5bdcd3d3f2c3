//! Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docsum", about = "Summarize large documents with an LLM loop", version)]
pub struct Cli {
    /// Path to a config file (default: .docsum.yml, then ~/.config/docsum/docsum.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize a document into a structured summary file
    Run {
        /// Source document to summarize
        source: PathBuf,

        /// Where to write the summary
        #[arg(short, long, default_value = "summary.md")]
        output: PathBuf,

        /// Custom summary template (defaults to the built-in EIA template)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Override the configured iteration cap
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Resume an interrupted run from its checkpoint
    Resume {
        /// Source document of the interrupted run
        source: PathBuf,

        /// Custom summary template (must match the original run)
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// List saved checkpoints
    Checkpoints,

    /// Delete the checkpoint for a document
    Clean {
        /// Source document whose checkpoint should be removed
        source: PathBuf,
    },
}
