//! Lock-guarded grid handle.
//!
//! The simulation mutates the grid while an observer (a display, a trace
//! writer) may be reading it from another thread. Every multi-cell edit runs
//! inside one lock acquisition so readers never see half of a `smooth` or
//! `plow`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::grid::Grid;

/// A cloneable, thread-safe handle to a [`Grid`].
///
/// Clones share the same underlying grid.
#[derive(Debug, Clone)]
pub struct SharedGrid {
    inner: Arc<Mutex<Grid>>,
}

impl SharedGrid {
    /// Wrap a grid for sharing.
    pub fn new(grid: Grid) -> Self {
        Self {
            inner: Arc::new(Mutex::new(grid)),
        }
    }

    /// Run `f` with read access to the grid.
    pub fn read<T>(&self, f: impl FnOnce(&Grid) -> T) -> T {
        f(&self.lock())
    }

    /// Run `f` with write access to the grid.
    pub fn write<T>(&self, f: impl FnOnce(&mut Grid) -> T) -> T {
        f(&mut self.lock())
    }

    /// Clone the current grid state.
    pub fn snapshot(&self) -> Grid {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Grid> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("grid lock poisoned, continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use pufferfish_types::Cell;

    use super::*;

    #[test]
    fn clones_share_state() {
        let shared = SharedGrid::new(Grid::new(4, 4, 9).unwrap());
        let other = shared.clone();
        shared.write(|g| g.set_elevation(Cell::new(1, 1), 6));
        assert_eq!(other.read(|g| g.elevation_at(Cell::new(1, 1))), 6);
    }

    #[test]
    fn reader_thread_never_sees_partial_smooth() {
        let mut grid = Grid::new(8, 8, 8).unwrap();
        for x in 0..8 {
            for y in 0..8 {
                grid.set_elevation(Cell::new(x, y), 8);
            }
        }
        let shared = SharedGrid::new(grid);
        let reader = shared.clone();
        let from = Cell::new(3, 3);
        let to = Cell::new(3, 4);
        let cells = [from, to, Cell::new(4, 4), Cell::new(2, 4)];

        let handle = thread::spawn(move || {
            for _ in 0..200 {
                let values = reader.read(|g| cells.map(|c| g.elevation_at(c)));
                assert!(values.iter().all(|&v| v == values[0]));
            }
        });
        shared.write(|g| g.smooth(from, to));
        handle.join().unwrap();
        assert_eq!(shared.read(|g| g.elevation_at(to)), 4);
    }
}
