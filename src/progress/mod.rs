//! Document reading progress
//!
//! The tracker is what lets the loop guarantee no line is double-counted or
//! lost across truncation, crashes, and resumes: the conversation may be cut
//! down aggressively, but coverage state lives here and in checkpoints.

mod tracker;

pub use tracker::{Phase, ProgressTracker, SECTION_SUMMARY_MAX_CHARS, SectionEntry};
