//! Error types for the pufferfish-agents crate.
//!
//! Sensor problems are rejected before anything is recorded, so a failed
//! cycle leaves the agent unchanged.

use pufferfish_morphognostic::MorphError;
use pufferfish_types::RecordError;

use crate::classifier::ClassifierError;

/// Errors that can occur during agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The sensor vector has the wrong length.
    #[error("expected {expected} sensor values, got {actual}")]
    SensorCount {
        /// Number of sensors the agent reads.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// A sensor reported an elevation above the grid maximum.
    #[error("sensor {sensor} reported {value}, above maximum elevation {max}")]
    SensorValue {
        /// Sensor index.
        sensor: usize,
        /// Reported value.
        value: u32,
        /// Maximum elevation.
        max: u32,
    },

    /// The agent's home cell lies outside the grid it was built for.
    #[error("home cell ({x}, {y}) is outside a {width}x{height} grid")]
    HomeOutOfBounds {
        /// Home column.
        x: usize,
        /// Home row.
        y: usize,
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },

    /// Descriptor construction or persistence failed.
    #[error("morphognostic error: {source}")]
    Morph {
        /// The underlying descriptor error.
        #[from]
        source: MorphError,
    },

    /// Classifier training failed.
    #[error("classifier error: {source}")]
    Classifier {
        /// The underlying classifier error.
        #[from]
        source: ClassifierError,
    },

    /// Reading or writing persisted agent state failed.
    #[error("agent record error: {source}")]
    Record {
        /// The underlying record error.
        #[from]
        source: RecordError,
    },
}
