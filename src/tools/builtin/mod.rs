//! Built-in tools for summarization runs

mod document;
mod progress;
mod summary;

pub use document::{GetDocumentInfo, ReadLines, SearchDocument};
pub use progress::GetProgress;
pub use summary::{EditSummary, FillSection, ReadSummary};
