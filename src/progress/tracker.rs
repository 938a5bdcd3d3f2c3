//! Read-progress tracking for the summarization loop
//!
//! The tracker is the source of truth for which parts of the source document
//! have been read and which template sections have been filled. It is owned
//! by the orchestration loop and mutated only through these operations, so it
//! can never disagree with itself about coverage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bound on stored section summaries (characters)
pub const SECTION_SUMMARY_MAX_CHARS: usize = 200;

/// Lifecycle phase of a summarization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Run created, nothing written yet
    Init,
    /// Summary template written, no reading started
    Template,
    /// Reading the source document chunk by chunk
    Extraction,
    /// Every unit read, sections being finished
    Finalize,
    /// Completion gate passed
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Template => "template",
            Phase::Extraction => "extraction",
            Phase::Finalize => "finalize",
            Phase::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Fill state of one template section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub filled: bool,
    /// Bounded excerpt of the content written into the section
    pub summary: String,
}

/// Tracks which line ranges of the document have been read
///
/// Ranges are 1-indexed inclusive, kept sorted and merged. All inputs are
/// clamped into `[1, total]` rather than rejected, so no caller can force the
/// tracker into an inconsistent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressTracker {
    total_units: u64,
    /// Sorted, non-overlapping, non-adjacent inclusive ranges
    done: Vec<(u64, u64)>,
    sections: BTreeMap<String, SectionEntry>,
    phase: Phase,
}

impl ProgressTracker {
    /// Create a fresh tracker for a document of `total_units` lines
    pub fn new(total_units: u64) -> Self {
        debug!(total_units, "ProgressTracker::new: called");
        Self {
            total_units,
            done: Vec::new(),
            sections: BTreeMap::new(),
            phase: Phase::Init,
        }
    }

    pub fn total_units(&self) -> u64 {
        self.total_units
    }

    /// Number of units read so far
    pub fn done_units(&self) -> u64 {
        self.done.iter().map(|(s, e)| e - s + 1).sum()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        debug!(%phase, "ProgressTracker::set_phase: called");
        self.phase = phase;
    }

    /// Mark an inclusive line range as read
    ///
    /// Idempotent and order-independent. Out-of-range input is clamped to
    /// `[1, total]`; a range that falls entirely outside (or is inverted
    /// after clamping) is a no-op, never an error.
    pub fn mark_read(&mut self, start: u64, end: u64) {
        let lo = start.max(1);
        let hi = end.min(self.total_units);
        if self.total_units == 0 || lo > hi {
            debug!(start, end, "ProgressTracker::mark_read: empty after clamping, ignoring");
            return;
        }

        self.done.push((lo, hi));
        self.done.sort_unstable();

        // Merge overlapping and adjacent ranges
        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(self.done.len());
        for &(s, e) in &self.done {
            match merged.last_mut() {
                Some(last) if s <= last.1 + 1 => last.1 = last.1.max(e),
                _ => merged.push((s, e)),
            }
        }
        self.done = merged;

        if matches!(self.phase, Phase::Init | Phase::Template) {
            self.phase = Phase::Extraction;
        }
        if self.is_complete() && self.phase == Phase::Extraction {
            self.phase = Phase::Finalize;
        }
    }

    /// The smallest unread contiguous range of at most `chunk_size` units
    ///
    /// Returns the lowest-numbered gap, clipped to the chunk size, or `None`
    /// when the whole document has been read.
    pub fn next_chunk(&self, chunk_size: u64) -> Option<(u64, u64)> {
        if self.total_units == 0 {
            return None;
        }
        let chunk_size = chunk_size.max(1);

        let mut cursor = 1u64;
        for &(s, e) in &self.done {
            if cursor < s {
                let end = (cursor + chunk_size - 1).min(s - 1);
                return Some((cursor, end));
            }
            cursor = cursor.max(e + 1);
        }

        if cursor <= self.total_units {
            let end = (cursor + chunk_size - 1).min(self.total_units);
            Some((cursor, end))
        } else {
            None
        }
    }

    /// Percentage of the document read, `0.0..=100.0`
    ///
    /// Monotonically non-decreasing under `mark_read`-only mutation.
    pub fn percent_complete(&self) -> f64 {
        if self.total_units == 0 {
            return 100.0;
        }
        (self.done_units() as f64 / self.total_units as f64) * 100.0
    }

    /// True iff the read set covers `[1, total]`
    pub fn is_complete(&self) -> bool {
        self.total_units == 0 || self.done == [(1, self.total_units)]
    }

    /// Seed the section registry with a known section name
    pub fn register_section(&mut self, name: impl Into<String>) {
        self.sections.entry(name.into()).or_default();
    }

    /// Record that a template section has been filled
    ///
    /// The summary is truncated to [`SECTION_SUMMARY_MAX_CHARS`] before
    /// storage. Unknown names are inserted rather than rejected.
    pub fn mark_section_filled(&mut self, name: impl Into<String>, summary: &str) {
        let name = name.into();
        debug!(%name, "ProgressTracker::mark_section_filled: called");
        let entry = self.sections.entry(name).or_default();
        entry.filled = true;
        entry.summary = truncate_chars(summary, SECTION_SUMMARY_MAX_CHARS);
    }

    pub fn sections(&self) -> &BTreeMap<String, SectionEntry> {
        &self.sections
    }

    /// Names of sections not yet filled
    pub fn unfilled_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(_, entry)| !entry.filled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of sections already filled
    pub fn filled_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(_, entry)| entry.filled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Compact textual progress report
    ///
    /// Injected into the conversation when the context manager truncates, and
    /// returned by the `get_progress` tool; tells the model exactly where to
    /// pick up.
    pub fn recovery_summary(&self, chunk_size: u64) -> String {
        let mut out = format!(
            "Reading progress: {:.1}% of {} lines ({} read), phase: {}.",
            self.percent_complete(),
            self.total_units,
            self.done_units(),
            self.phase
        );

        let filled = self.filled_sections();
        let unfilled = self.unfilled_sections();
        if !filled.is_empty() {
            out.push_str(&format!("\nFilled sections: {}.", filled.join(", ")));
        }
        if !unfilled.is_empty() {
            out.push_str(&format!("\nUnfilled sections: {}.", unfilled.join(", ")));
        }

        match self.next_chunk(chunk_size) {
            Some((start, end)) => {
                out.push_str(&format!("\nNext unread chunk: lines {start}-{end}."));
            }
            None => out.push_str("\nAll lines have been read."),
        }

        out
    }
}

/// Truncate a string to at most `max` characters, on a char boundary
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
