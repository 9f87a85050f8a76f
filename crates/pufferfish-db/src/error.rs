//! Error types for the snapshot layer.

use pufferfish_agents::AgentError;
use pufferfish_types::RecordError;
use pufferfish_world::WorldError;

/// Errors that can occur when saving or loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot file could not be opened or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value in the snapshot was missing or malformed.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// The stored grid is inconsistent.
    #[error("Grid error: {0}")]
    World(#[from] WorldError),

    /// The stored agent is inconsistent.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// The file is not a snapshot this version can read.
    #[error("Unsupported snapshot: {0}")]
    Format(String),
}
