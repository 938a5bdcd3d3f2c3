//! Checkpoint persistence

mod store;

pub use store::{
    Checkpoint, CheckpointError, CheckpointStore, CheckpointSummary, RunDescriptor, identity_for,
};
