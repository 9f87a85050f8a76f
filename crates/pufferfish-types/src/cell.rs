//! Grid cell coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the toroidal nest grid.
///
/// Coordinates are always in range for the grid that produced them; the
/// grid wraps any signed offset back into `0..width` and `0..height`
/// before constructing a `Cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column, growing east.
    pub x: usize,
    /// Row, growing north.
    pub y: usize,
}

impl Cell {
    /// Create a cell from its coordinates.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}
