//! Snapshot persistence for the Pufferfish simulation.
//!
//! A snapshot captures everything needed to resume a run: the grid with its
//! checkpoint, the agent's pose, descriptor, event history and learned
//! metamorphs, the autopilot's progress, and the tick counter. Snapshots use
//! the line-oriented record format from `pufferfish-types`.
//!
//! # Modules
//!
//! - [`snapshot`] -- Snapshot reading and writing, plus the file-backed
//!   [`SnapshotStore`]
//! - [`error`] -- Shared error types

pub mod error;
pub mod snapshot;

// Re-export primary types for convenience.
pub use error::SnapshotError;
pub use snapshot::{SNAPSHOT_HEADER, SNAPSHOT_VERSION, SnapshotStore, read_snapshot, write_snapshot};
