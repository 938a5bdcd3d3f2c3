//! docsum binary entry point

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docsum::checkpoint::CheckpointStore;
use docsum::config::Config;
use docsum::context::ContextManager;
use docsum::llm::OpenAiClient;
use docsum::prompts;
use docsum::tools::ToolRegistry;
use docsum::{RunOutcome, RunReport, SummarizeEngine};

use cli::{Cli, Command};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Load the template: a custom file, or the embedded default
async fn load_template(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Cannot read template {}", path.display())),
        None => Ok(prompts::SUMMARY_TEMPLATE.to_string()),
    }
}

fn build_engine(config: &Config, template: String, max_iterations: Option<u32>) -> Result<SummarizeEngine> {
    let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let mut run_config = config.run.clone();
    if let Some(cap) = max_iterations {
        run_config.max_iterations = cap;
    }

    Ok(SummarizeEngine::new(
        llm,
        ToolRegistry::standard()?,
        ContextManager::new(config.context.to_context_config()),
        CheckpointStore::new(config.checkpoint.resolve_dir())?,
        run_config,
        template,
        config.llm.max_tokens,
    ))
}

fn print_report(report: &RunReport) {
    match report.outcome {
        RunOutcome::Complete => {
            println!("Summarization complete after {} iterations.", report.iterations);
            println!("Read {}/{} lines.", report.units_done, report.total_units);
            println!("Summary written to {}", report.output_path.display());
            if report.unresolved_placeholders.is_empty() {
                println!("All placeholders filled.");
            } else {
                println!(
                    "Warning: {} placeholder(s) remain unfilled:",
                    report.unresolved_placeholders.len()
                );
                for name in &report.unresolved_placeholders {
                    println!("  - {{{{{name}}}}}");
                }
            }
        }
        RunOutcome::IterationsExhausted => {
            println!(
                "Iteration cap reached after {} iterations ({}/{} lines read).",
                report.iterations, report.units_done, report.total_units
            );
            println!("Progress was checkpointed; rerun with `docsum resume` to continue.");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Run {
            source,
            output,
            template,
            max_iterations,
        } => {
            let template = load_template(template.as_deref()).await?;
            let mut engine = build_engine(&config, template, max_iterations)?;
            let report = engine.run(&source, &output).await?;
            print_report(&report);
        }

        Command::Resume { source, template } => {
            let template = load_template(template.as_deref()).await?;
            let mut engine = build_engine(&config, template, None)?;
            let report = engine.resume(&source).await?;
            print_report(&report);
        }

        Command::Checkpoints => {
            let store = CheckpointStore::new(config.checkpoint.resolve_dir())?;
            let checkpoints = store.list()?;
            if checkpoints.is_empty() {
                println!("No checkpoints.");
            } else {
                for cp in checkpoints {
                    println!(
                        "{}  iteration {}  {:.1}% read  saved {}",
                        cp.source_path.display(),
                        cp.iteration,
                        cp.percent_complete,
                        cp.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    );
                }
            }
        }

        Command::Clean { source } => {
            let store = CheckpointStore::new(config.checkpoint.resolve_dir())?;
            let source = source.canonicalize().unwrap_or(source);
            if store.delete(&source)? {
                info!(source = %source.display(), "checkpoint removed");
                println!("Checkpoint removed for {}", source.display());
            } else {
                println!("No checkpoint for {}", source.display());
            }
        }
    }

    Ok(())
}
