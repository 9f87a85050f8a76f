//! The pufferfish's sensor footprint.
//!
//! Nine sensors cover the 3x3 block of cells around the agent, laid out in
//! the agent's own frame so that the same terrain seen from a different
//! heading produces the same vector. Sensor `i` sits at
//! [`SENSOR_OFFSETS`]`[i]`, given as `(lateral, forward)` with positive
//! lateral to the agent's right:
//!
//! ```text
//!   0 1 2     ahead
//!   3 4 5     (4 is the agent's own cell)
//!   6 7 8     behind
//! ```

use pufferfish_types::{Cell, Orientation};

use crate::grid::Grid;

/// Number of elevation sensors.
pub const NUM_SENSORS: usize = 9;

/// Agent-frame `(lateral, forward)` offset of each sensor.
pub const SENSOR_OFFSETS: [(i64, i64); NUM_SENSORS] = [
    (-1, 1),
    (0, 1),
    (1, 1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Read the elevation under each sensor for an agent at `cell` facing `heading`.
pub fn sense(grid: &Grid, cell: Cell, heading: Orientation) -> [u32; NUM_SENSORS] {
    SENSOR_OFFSETS.map(|(lateral, forward)| {
        let (dx, dy) = heading.to_grid(lateral, forward);
        grid.elevation_at(grid.offset(cell, dx, dy))
    })
}
