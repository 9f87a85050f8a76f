//! Toroidal elevation grid.
//!
//! Every coordinate handed to the grid as a signed pair is wrapped modulo
//! the grid size, so the field has no edges. Elevations live in
//! `0..=max_elevation`; all edits clamp into that range.
//!
//! Cells are stored column-major (`x` outer, `y` inner), which is also the
//! order they are written to snapshot files.

use pufferfish_types::{Cell, Orientation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;

/// Number of cells in a forward flank.
pub const FLANK_SIZE: usize = 3;

/// Index of the right-hand cell in a forward flank.
pub const FLANK_RIGHT: usize = 0;
/// Index of the straight-ahead cell in a forward flank.
pub const FLANK_AHEAD: usize = 1;
/// Index of the left-hand cell in a forward flank.
pub const FLANK_LEFT: usize = 2;

/// The nest's elevation field plus its checkpoint copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    max_elevation: u32,
    cells: Vec<u32>,
    restore_cells: Vec<u32>,
}

impl Grid {
    /// Create a flat grid at elevation zero and checkpoint it.
    pub fn new(width: usize, height: usize, max_elevation: u32) -> Result<Self, WorldError> {
        if width < 2 || height < 2 {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        let count = width.saturating_mul(height);
        Ok(Self {
            width,
            height,
            max_elevation,
            cells: vec![0; count],
            restore_cells: vec![0; count],
        })
    }

    /// Rebuild a grid from stored cell and checkpoint buffers.
    pub fn from_parts(
        width: usize,
        height: usize,
        max_elevation: u32,
        cells: Vec<u32>,
        restore_cells: Vec<u32>,
    ) -> Result<Self, WorldError> {
        let mut grid = Self::new(width, height, max_elevation)?;
        for buffer in [&cells, &restore_cells] {
            if buffer.len() != grid.cells.len() {
                return Err(WorldError::CellCountMismatch {
                    expected: grid.cells.len(),
                    actual: buffer.len(),
                });
            }
            if let Some(&value) = buffer.iter().find(|&&v| v > max_elevation) {
                return Err(WorldError::ElevationOutOfRange {
                    value,
                    max: max_elevation,
                });
            }
        }
        grid.cells = cells;
        grid.restore_cells = restore_cells;
        Ok(grid)
    }

    /// Grid width.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Grid height.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Highest allowed elevation.
    pub const fn max_elevation(&self) -> u32 {
        self.max_elevation
    }

    /// The level `smooth` flattens terrain to.
    pub const fn midpoint(&self) -> u32 {
        self.max_elevation / 2
    }

    /// Current elevations in storage order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Checkpointed elevations in storage order.
    pub fn restore_cells(&self) -> &[u32] {
        &self.restore_cells
    }

    /// The cell at the center of the grid.
    pub const fn center(&self) -> Cell {
        Cell::new(self.width / 2, self.height / 2)
    }

    /// Wrap a signed coordinate pair onto the torus.
    pub fn wrap(&self, x: i64, y: i64) -> Cell {
        Cell::new(wrap_axis(x, self.width), wrap_axis(y, self.height))
    }

    /// The cell `(dx, dy)` away from `cell`, wrapped.
    pub fn offset(&self, cell: Cell, dx: i64, dy: i64) -> Cell {
        self.wrap(signed(cell.x).saturating_add(dx), signed(cell.y).saturating_add(dy))
    }

    /// The cell one step ahead of `cell` along `heading`.
    pub fn ahead(&self, cell: Cell, heading: Orientation) -> Cell {
        let (dx, dy) = heading.delta();
        self.offset(cell, dx, dy)
    }

    /// Elevation at a signed coordinate, wrapped.
    pub fn elevation(&self, x: i64, y: i64) -> u32 {
        self.elevation_at(self.wrap(x, y))
    }

    /// Elevation at a cell.
    pub fn elevation_at(&self, cell: Cell) -> u32 {
        self.cells.get(self.index(cell)).copied().unwrap_or_default()
    }

    /// Checkpointed elevation at a cell.
    pub fn restore_elevation_at(&self, cell: Cell) -> u32 {
        self.restore_cells
            .get(self.index(cell))
            .copied()
            .unwrap_or_default()
    }

    /// Set a cell's elevation, clamped to the maximum.
    pub fn set_elevation(&mut self, cell: Cell, value: u32) {
        let max = self.max_elevation;
        let index = self.index(cell);
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = value.min(max);
        }
    }

    /// Raise a cell by one. Returns `false` if it was already at the maximum.
    pub fn raise(&mut self, cell: Cell) -> bool {
        let current = self.elevation_at(cell);
        if current >= self.max_elevation {
            return false;
        }
        self.set_elevation(cell, current.saturating_add(1));
        true
    }

    /// Lower a cell by one. Returns `false` if it was already at zero.
    pub fn lower(&mut self, cell: Cell) -> bool {
        let current = self.elevation_at(cell);
        if current == 0 {
            return false;
        }
        self.set_elevation(cell, current.saturating_sub(1));
        true
    }

    /// Fill every cell with a uniform random elevation and checkpoint.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let max = self.max_elevation;
        for slot in &mut self.cells {
            *slot = rng.random_range(0..=max);
        }
        self.checkpoint();
    }

    /// Copy the current elevations into the checkpoint.
    pub fn checkpoint(&mut self) {
        self.restore_cells.clone_from(&self.cells);
    }

    /// Copy the checkpoint back over the current elevations.
    pub fn restore(&mut self) {
        self.cells.clone_from(&self.restore_cells);
    }

    /// Shortest signed displacement from `from` to `to` on the torus.
    pub fn wrapped_delta(&self, from: Cell, to: Cell) -> (i64, i64) {
        (
            wrapped_axis_delta(from.x, to.x, self.width),
            wrapped_axis_delta(from.y, to.y, self.height),
        )
    }

    /// Heading of a move from `from` to `to`.
    ///
    /// The axis with the larger wrapped displacement wins; ties go to `x`.
    /// Returns `None` when the cells coincide.
    pub fn direction(&self, from: Cell, to: Cell) -> Option<Orientation> {
        let (dx, dy) = self.wrapped_delta(from, to);
        if dx == 0 && dy == 0 {
            return None;
        }
        let heading = if dx.abs() >= dy.abs() {
            if dx > 0 {
                Orientation::East
            } else {
                Orientation::West
            }
        } else if dy > 0 {
            Orientation::North
        } else {
            Orientation::South
        };
        Some(heading)
    }

    /// The three cells on the leading edge of a move into `to`.
    ///
    /// Ordered right, ahead, left relative to the direction of travel. For a
    /// move toward `-x` this is `(to.x, to.y+1), (to.x-1, to.y), (to.x, to.y-1)`.
    pub fn forward_flank_cells(&self, from: Cell, to: Cell) -> Option<[Cell; FLANK_SIZE]> {
        let heading = self.direction(from, to)?;
        let at = |lateral: i64, forward: i64| {
            let (dx, dy) = heading.to_grid(lateral, forward);
            self.offset(to, dx, dy)
        };
        Some([at(1, 0), at(0, 1), at(-1, 0)])
    }

    /// Flatten `from`, `center`, and the lateral flanks of `center` to the
    /// midpoint elevation. No-op if `from == center`.
    pub fn smooth(&mut self, from: Cell, center: Cell) {
        let Some(flanks) = self.forward_flank_cells(from, center) else {
            return;
        };
        let level = self.midpoint();
        for cell in [from, center, flanks[FLANK_RIGHT], flanks[FLANK_LEFT]] {
            self.set_elevation(cell, level);
        }
    }

    /// Push the excess height of `to` over `from` onto the forward flank.
    ///
    /// Units are placed one at a time round-robin from a random starting
    /// flank; units that would exceed the maximum are dropped. Returns the
    /// number of units removed from `to`.
    pub fn plow<R: Rng + ?Sized>(&mut self, from: Cell, to: Cell, rng: &mut R) -> u32 {
        let low = self.elevation_at(from);
        let high = self.elevation_at(to);
        if low >= high {
            return 0;
        }
        let Some(flanks) = self.forward_flank_cells(from, to) else {
            return 0;
        };
        let units = high.saturating_sub(low);
        self.set_elevation(to, low);
        let mut slot = rng.random_range(0..FLANK_SIZE);
        for _ in 0..units {
            if let Some(&cell) = flanks.get(slot) {
                self.raise(cell);
            }
            slot = slot.saturating_add(1) % FLANK_SIZE;
        }
        debug!(from = %from, to = %to, units, "plowed");
        units
    }

    fn index(&self, cell: Cell) -> usize {
        debug_assert!(
            cell.x < self.width && cell.y < self.height,
            "cell {cell} outside {}x{} grid",
            self.width,
            self.height
        );
        let x = cell.x.checked_rem(self.width).unwrap_or(0);
        let y = cell.y.checked_rem(self.height).unwrap_or(0);
        x.saturating_mul(self.height).saturating_add(y)
    }
}

/// Convert an in-range grid coordinate to a signed value.
pub(crate) fn signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn wrap_axis(value: i64, size: usize) -> usize {
    let wrapped = value.rem_euclid(signed(size).max(1));
    usize::try_from(wrapped).unwrap_or(0)
}

/// Shortest signed displacement from `from` to `to` on an axis of `size`
/// cells that wraps around.
pub fn wrapped_axis_delta(from: usize, to: usize, size: usize) -> i64 {
    let size = signed(size);
    let mut delta = signed(to).saturating_sub(signed(from));
    if delta > size / 2 {
        delta = delta.saturating_sub(size);
    } else if delta < (size / 2).saturating_neg() {
        delta = delta.saturating_add(size);
    }
    delta
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn grid(width: usize, height: usize) -> Grid {
        Grid::new(width, height, 9).unwrap()
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(Grid::new(1, 5, 9).is_err());
        assert!(Grid::new(5, 0, 9).is_err());
        assert!(Grid::new(2, 2, 0).is_ok());
    }

    #[test]
    fn elevation_wraps_in_both_axes() {
        let mut g = grid(5, 7);
        g.set_elevation(Cell::new(1, 2), 4);
        for k in -3_i64..=3 {
            assert_eq!(g.elevation(1 + k * 5, 2 + k * 7), 4);
        }
        assert_eq!(g.wrap(-1, -1), Cell::new(4, 6));
    }

    #[test]
    fn raise_and_lower_clamp() {
        let mut g = Grid::new(3, 3, 2).unwrap();
        let c = Cell::new(0, 0);
        assert!(g.raise(c));
        assert!(g.raise(c));
        assert!(!g.raise(c));
        assert_eq!(g.elevation_at(c), 2);
        assert!(g.lower(c));
        assert!(g.lower(c));
        assert!(!g.lower(c));
        assert_eq!(g.elevation_at(c), 0);
    }

    #[test]
    fn flank_moving_west_matches_table() {
        let g = grid(10, 10);
        let from = Cell::new(5, 5);
        let to = Cell::new(4, 5);
        let flanks = g.forward_flank_cells(from, to).unwrap();
        assert_eq!(flanks, [Cell::new(4, 6), Cell::new(3, 5), Cell::new(4, 4)]);
    }

    #[test]
    fn flank_in_other_directions() {
        let g = grid(10, 10);
        let c = Cell::new(5, 5);
        let east = g.forward_flank_cells(c, Cell::new(6, 5)).unwrap();
        assert_eq!(east, [Cell::new(6, 4), Cell::new(7, 5), Cell::new(6, 6)]);
        let north = g.forward_flank_cells(c, Cell::new(5, 6)).unwrap();
        assert_eq!(north, [Cell::new(6, 6), Cell::new(5, 7), Cell::new(4, 6)]);
        let south = g.forward_flank_cells(c, Cell::new(5, 4)).unwrap();
        assert_eq!(south, [Cell::new(4, 4), Cell::new(5, 3), Cell::new(6, 4)]);
        assert!(g.forward_flank_cells(c, c).is_none());
    }

    #[test]
    fn flank_across_the_seam() {
        let g = grid(10, 10);
        // Stepping from x=0 to x=9 is a westward move through the wrap.
        let flanks = g
            .forward_flank_cells(Cell::new(0, 3), Cell::new(9, 3))
            .unwrap();
        assert_eq!(flanks, [Cell::new(9, 4), Cell::new(8, 3), Cell::new(9, 2)]);
    }

    #[test]
    fn smooth_sets_four_cells_to_midpoint() {
        let mut g = grid(8, 8);
        for x in 0..8 {
            for y in 0..8 {
                g.set_elevation(Cell::new(x, y), 9);
            }
        }
        let from = Cell::new(3, 3);
        let to = Cell::new(3, 4);
        g.smooth(from, to);
        for cell in [from, to, Cell::new(4, 4), Cell::new(2, 4)] {
            assert_eq!(g.elevation_at(cell), 4);
        }
        assert_eq!(g.elevation_at(Cell::new(3, 5)), 9);

        let before = g.clone();
        g.smooth(from, from);
        assert_eq!(g, before);
    }

    #[test]
    fn plow_conserves_units_below_the_cap() {
        let mut g = grid(8, 8);
        let from = Cell::new(2, 2);
        let to = Cell::new(3, 2);
        g.set_elevation(from, 1);
        g.set_elevation(to, 6);
        let mut rng = SmallRng::seed_from_u64(7);
        let moved = g.plow(from, to, &mut rng);
        assert_eq!(moved, 5);
        assert_eq!(g.elevation_at(to), 1);
        let flank_total: u32 = g
            .forward_flank_cells(from, to)
            .unwrap()
            .iter()
            .map(|&c| g.elevation_at(c))
            .sum();
        assert_eq!(flank_total, 5);
    }

    #[test]
    fn plow_is_noop_uphill_or_in_place() {
        let mut g = grid(6, 6);
        let a = Cell::new(1, 1);
        let b = Cell::new(1, 2);
        g.set_elevation(a, 5);
        g.set_elevation(b, 2);
        let mut rng = SmallRng::seed_from_u64(1);
        let before = g.clone();
        assert_eq!(g.plow(a, b, &mut rng), 0);
        assert_eq!(g.plow(a, a, &mut rng), 0);
        assert_eq!(g, before);
    }

    #[test]
    fn edits_stay_in_bounds() {
        let mut g = Grid::new(6, 6, 3).unwrap();
        let mut rng = SmallRng::seed_from_u64(99);
        g.randomize(&mut rng);
        for step in 0..500_usize {
            let x = rng.random_range(0..6);
            let y = rng.random_range(0..6);
            let here = Cell::new(x, y);
            let next = g.ahead(here, Orientation::ALL[step % 4]);
            match step % 4 {
                0 => {
                    g.raise(here);
                }
                1 => {
                    g.lower(here);
                }
                2 => {
                    g.plow(here, next, &mut rng);
                }
                _ => g.smooth(here, next),
            }
            assert!(g.cells().iter().all(|&v| v <= 3));
        }
    }

    #[test]
    fn checkpoint_and_restore() {
        let mut g = grid(4, 4);
        let c = Cell::new(2, 1);
        g.set_elevation(c, 3);
        g.checkpoint();
        g.set_elevation(c, 8);
        assert_eq!(g.restore_elevation_at(c), 3);
        g.restore();
        assert_eq!(g.elevation_at(c), 3);
    }

    #[test]
    fn delta_takes_the_short_way_round() {
        let g = grid(10, 6);
        assert_eq!(g.wrapped_delta(Cell::new(0, 0), Cell::new(9, 0)), (-1, 0));
        assert_eq!(g.wrapped_delta(Cell::new(0, 0), Cell::new(5, 3)), (5, 3));
        assert_eq!(g.wrapped_delta(Cell::new(1, 1), Cell::new(1, 5)), (0, -2));
    }

    #[test]
    fn from_parts_validates_buffers() {
        assert!(Grid::from_parts(2, 2, 3, vec![0; 4], vec![0; 3]).is_err());
        assert!(Grid::from_parts(2, 2, 3, vec![0, 1, 2, 4], vec![0; 4]).is_err());
        let g = Grid::from_parts(2, 2, 3, vec![0, 1, 2, 3], vec![3; 4]).unwrap();
        assert_eq!(g.elevation_at(Cell::new(1, 1)), 3);
        assert_eq!(g.restore_elevation_at(Cell::new(0, 0)), 3);
    }

    #[test]
    fn serializes_to_json() {
        let g = grid(2, 2);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains("\"max_elevation\":9"));
    }
}
