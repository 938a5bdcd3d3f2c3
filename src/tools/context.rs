//! Shared state handed to every tool invocation

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::progress::ProgressTracker;

/// Execution context shared by all tools in a run
///
/// The tracker is behind a mutex only so the context is `Send + Sync` across
/// await points; tools run sequentially, there is no contention.
#[derive(Clone)]
pub struct ToolContext {
    /// Absolute path of the source document
    pub source_path: PathBuf,
    /// Path of the summary file being filled in
    pub output_path: PathBuf,
    pub tracker: Arc<Mutex<ProgressTracker>>,
    /// Lines per suggested reading chunk
    pub chunk_size: u64,
}

impl ToolContext {
    pub fn new(
        source_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        tracker: Arc<Mutex<ProgressTracker>>,
        chunk_size: u64,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            tracker,
            chunk_size,
        }
    }
}
