//! Conversation truncation and repair

mod manager;

pub use manager::{ContextConfig, ContextManager, RepairStats};
