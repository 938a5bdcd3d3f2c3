//! Orchestration loop

mod engine;

pub use engine::{RunOutcome, RunReport, SummarizeEngine};
