//! Crash-resumable run state
//!
//! One JSON file per run, keyed by the sanitized absolute path of the input
//! document. Saves go through a temp file and an atomic rename so a crash
//! mid-write never corrupts an existing checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::progress::ProgressTracker;

/// Errors from checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The parameters a resumed run must agree on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDescriptor {
    /// Absolute path of the source document
    pub source_path: PathBuf,
    /// Path the summary is written to
    pub output_path: PathBuf,
    /// Lines per suggested reading chunk
    pub chunk_size: u64,
}

/// Everything needed to resume an interrupted run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub descriptor: RunDescriptor,
    pub progress: ProgressTracker,
    /// Iterations already consumed
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the summary file, so resume can restore it even if the
    /// output file was deleted in the meantime
    pub output: Option<String>,
}

/// Listing entry for `docsum checkpoints`
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub source_path: PathBuf,
    pub iteration: u32,
    pub percent_complete: f64,
    pub timestamp: DateTime<Utc>,
}

/// Map an absolute document path to a filesystem-safe checkpoint key
///
/// Two runs over the same document (same absolute path) share one
/// checkpoint; different documents never collide on sane filesystems.
pub fn identity_for(source_path: &Path) -> String {
    source_path
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// File-backed checkpoint storage
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open a store rooted at `dir`, creating it if absent
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "CheckpointStore::new: called");
        Ok(Self { dir })
    }

    fn path_for(&self, source_path: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", identity_for(source_path)))
    }

    /// Persist a checkpoint, replacing any previous one for the same document
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(&checkpoint.descriptor.source_path);
        let json = serde_json::to_string_pretty(checkpoint)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        info!(
            path = %path.display(),
            iteration = checkpoint.iteration,
            "CheckpointStore::save: checkpoint written"
        );
        Ok(path)
    }

    /// Load the checkpoint for a document, if one exists
    pub fn load(&self, source_path: &Path) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(source_path);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        let checkpoint = serde_json::from_str(&json)?;
        info!(path = %path.display(), "CheckpointStore::load: checkpoint found");
        Ok(Some(checkpoint))
    }

    /// Remove the checkpoint for a document. Returns true if one was removed.
    pub fn delete(&self, source_path: &Path) -> Result<bool, CheckpointError> {
        let path = self.path_for(source_path);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!(path = %path.display(), "CheckpointStore::delete: checkpoint removed");
        Ok(true)
    }

    /// All checkpoints in the store, oldest first
    pub fn list(&self) -> Result<Vec<CheckpointSummary>, CheckpointError> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            match serde_json::from_str::<Checkpoint>(&json) {
                Ok(cp) => summaries.push(CheckpointSummary {
                    source_path: cp.descriptor.source_path,
                    iteration: cp.iteration,
                    percent_complete: cp.progress.percent_complete(),
                    timestamp: cp.timestamp,
                }),
                Err(e) => {
                    // Unreadable checkpoints are skipped, not fatal
                    warn!(path = %path.display(), error = %e, "CheckpointStore::list: skipping unreadable checkpoint");
                }
            }
        }

        summaries.sort_by_key(|s| s.timestamp);
        Ok(summaries)
    }
}
