//! Error types for the `pufferfish-world` crate.

/// Errors that can occur when building or loading a grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// Width and height must both be at least 2.
    #[error("grid dimensions {width}x{height} are too small (minimum 2x2)")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// A cell buffer does not match `width * height`.
    #[error("expected {expected} cells, got {actual}")]
    CellCountMismatch {
        /// Required number of cells.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// A stored elevation exceeds the grid's maximum.
    #[error("elevation {value} exceeds maximum {max}")]
    ElevationOutOfRange {
        /// Offending value.
        value: u32,
        /// Grid maximum.
        max: u32,
    },
}
