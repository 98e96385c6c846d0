//! Storage and persistence layer
//!
//! - Chain checkpoint and local block log
//! - User preferences

mod checkpoint;
mod preferences;

pub use checkpoint::{CheckpointStore, FileCheckpointStore};
pub use preferences::Preferences;
