//! Whole-simulation snapshots in the linear text record format.
//!
//! A snapshot holds, one value per line:
//!
//! ```text
//! header, version
//! seed, random stream position, tick
//! width, height, max elevation
//! cells (column-major), checkpoint cells
//! agent (see Pufferfish::save)
//! ```
//!
//! Loading restores the grid, the agent, the tick counter and the random
//! stream, so a resumed run draws the same numbers the uninterrupted run
//! would have. Autopilot geometry is configuration and is supplied by the
//! caller.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use pufferfish_agents::{AutopilotConfig, Pufferfish};
use pufferfish_core::Simulation;
use pufferfish_types::{RecordReader, RecordWriter};
use pufferfish_world::Grid;
use tracing::info;

use crate::error::SnapshotError;

/// First line of every snapshot.
pub const SNAPSHOT_HEADER: &str = "pufferfish-snapshot";

/// Format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Snapshot file operations bound to one path.
pub struct SnapshotStore<'a> {
    path: &'a Path,
}

impl<'a> SnapshotStore<'a> {
    /// Create a store for the snapshot at `path`.
    pub const fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Write `simulation` to the file, replacing it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be written.
    pub fn save(&self, simulation: &Simulation) -> Result<(), SnapshotError> {
        let file = File::create(self.path)?;
        let mut out = write_snapshot(simulation, BufWriter::new(file))?;
        out.flush()?;
        info!(
            path = %self.path.display(),
            tick = simulation.tick(),
            metamorphs = simulation.pufferfish().metamorphs().len(),
            "Saved snapshot"
        );
        Ok(())
    }

    /// Read a simulation from the file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file is missing or malformed.
    pub fn load(&self, autopilot: AutopilotConfig) -> Result<Simulation, SnapshotError> {
        let file = File::open(self.path)?;
        let simulation = read_snapshot(BufReader::new(file), autopilot)?;
        info!(
            path = %self.path.display(),
            tick = simulation.tick(),
            metamorphs = simulation.pufferfish().metamorphs().len(),
            "Loaded snapshot"
        );
        Ok(simulation)
    }
}

/// Serialize `simulation` into `out`, returning the stream.
pub fn write_snapshot<W: Write>(simulation: &Simulation, out: W) -> Result<W, SnapshotError> {
    let mut writer = RecordWriter::new(out);
    writer.put(SNAPSHOT_HEADER)?;
    writer.put(SNAPSHOT_VERSION)?;
    writer.put(simulation.seed())?;
    writer.put(simulation.rng_position())?;
    writer.put(simulation.tick())?;

    let grid = simulation.grid().snapshot();
    writer.put(grid.width())?;
    writer.put(grid.height())?;
    writer.put(grid.max_elevation())?;
    writer.put_all(grid.cells())?;
    writer.put_all(grid.restore_cells())?;

    simulation.pufferfish().save(&mut writer)?;
    Ok(writer.finish()?)
}

/// Deserialize a simulation written by [`write_snapshot`].
pub fn read_snapshot<R: BufRead>(input: R, autopilot: AutopilotConfig) -> Result<Simulation, SnapshotError> {
    let mut reader = RecordReader::new(input);
    let header: String = reader.take("header")?;
    if header != SNAPSHOT_HEADER {
        return Err(SnapshotError::Format(format!(
            "expected header {SNAPSHOT_HEADER:?}, found {header:?}"
        )));
    }
    let version: u32 = reader.take("version")?;
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Format(format!(
            "version {version} (this build reads {SNAPSHOT_VERSION})"
        )));
    }
    let seed: u64 = reader.take("seed")?;
    let rng_position: u128 = reader.take("random stream position")?;
    let tick: u64 = reader.take("tick")?;

    let width: usize = reader.take("width")?;
    let height: usize = reader.take("height")?;
    let max_elevation: u32 = reader.take("max elevation")?;
    let count = width
        .checked_mul(height)
        .ok_or_else(|| reader.invalid("height", format!("{width}x{height} grid is too large")))?;
    let cells = reader.take_vec("cell", count)?;
    let restore_cells = reader.take_vec("restore cell", count)?;
    let grid = Grid::from_parts(width, height, max_elevation, cells, restore_cells)?;

    let pufferfish = Pufferfish::load(&mut reader, autopilot, width, height, max_elevation)?;
    Ok(Simulation::from_parts(grid, pufferfish, seed, rng_position, tick))
}
