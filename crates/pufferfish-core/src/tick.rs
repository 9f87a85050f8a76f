//! Tick cycle: sense, cycle the agent, apply the response.
//!
//! Each tick the simulation reads the agent's sensors from the grid, hands
//! them to [`Pufferfish::cycle`], and applies the returned response:
//!
//! - **Movement** -- `forward` steps one cell along the heading; turns
//!   rotate the heading in place.
//! - **Terrain** -- `smooth` and `plow` act on the agent's cell and the
//!   cell ahead; `raise` and `lower` act on the agent's cell.
//! - **Wait** -- nothing.
//!
//! All grid edits for one tick happen under a single lock acquisition on
//! the [`SharedGrid`]. Given the same seed and configuration, a run is
//! fully deterministic, and [`Simulation::rng_position`] lets a saved run
//! resume the same random stream.

use pufferfish_agents::{AgentError, Pufferfish};
use pufferfish_types::{Cell, Orientation, Response};
use pufferfish_world::{Grid, SharedGrid, WorldError, sense};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SimulationConfig, Terrain};

/// Errors that can occur during simulation setup or tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The grid could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// The agent failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A new run was requested without grid dimensions.
    #[error("grid dimensions are required to create a simulation")]
    MissingDimensions,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed, starting at 1.
    pub tick: u64,
    /// Response chosen this tick.
    pub response: Response,
    /// Agent cell after the response was applied.
    pub cell: Cell,
    /// Agent heading after the response was applied.
    pub heading: Orientation,
    /// Elevation under the agent after the response was applied.
    pub elevation: u32,
    /// Metamorphs learned so far.
    pub metamorphs: usize,
}

/// The grid, the agent, and the random source that drives both.
#[derive(Debug)]
pub struct Simulation {
    grid: SharedGrid,
    pufferfish: Pufferfish,
    seed: u64,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Simulation {
    /// Build a fresh simulation: a checkpointed grid and an agent at its
    /// center facing north, using the run's driver.
    pub fn new(config: &SimulationConfig) -> Result<Self, TickError> {
        let (Some(width), Some(height)) = (config.world.width, config.world.height) else {
            return Err(TickError::MissingDimensions);
        };
        let seed = config.world.seed;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut grid = Grid::new(width, height, config.world.max_elevation)?;
        if config.world.terrain == Terrain::Random {
            grid.randomize(&mut rng);
        }
        grid.checkpoint();

        let mut pufferfish = Pufferfish::new(
            config.pufferfish_config(),
            grid.center(),
            Orientation::North,
            width,
            height,
            config.world.max_elevation,
        )?;
        pufferfish.set_driver(config.run.driver);

        info!(
            width,
            height,
            max_elevation = config.world.max_elevation,
            seed,
            driver = %config.run.driver,
            "simulation created"
        );
        Ok(Self {
            grid: SharedGrid::new(grid),
            pufferfish,
            seed,
            rng,
            tick: 0,
        })
    }

    /// Assemble a simulation from restored parts. The random source is
    /// seeded from `seed` and advanced to `rng_position`, as returned by
    /// [`Simulation::rng_position`] when the parts were saved.
    pub fn from_parts(
        grid: Grid,
        pufferfish: Pufferfish,
        seed: u64,
        rng_position: u128,
        tick: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_word_pos(rng_position);
        Self {
            grid: SharedGrid::new(grid),
            pufferfish,
            seed,
            rng,
            tick,
        }
    }

    /// Shared handle on the grid.
    pub const fn grid(&self) -> &SharedGrid {
        &self.grid
    }

    /// The agent.
    pub const fn pufferfish(&self) -> &Pufferfish {
        &self.pufferfish
    }

    /// The agent, mutably (driver switching, manual responses, training).
    pub const fn pufferfish_mut(&mut self) -> &mut Pufferfish {
        &mut self.pufferfish
    }

    /// Ticks executed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Seed of the random source.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Words consumed from the random stream since it was seeded.
    pub fn rng_position(&self) -> u128 {
        self.rng.get_word_pos()
    }

    /// Run one tick.
    pub fn step(&mut self) -> Result<TickSummary, TickError> {
        let cell = self.pufferfish.cell();
        let heading = self.pufferfish.heading();
        let sensors = self.grid.read(|g| sense(g, cell, heading));
        let response = self.pufferfish.cycle(&sensors, &mut self.rng)?;

        let rng = &mut self.rng;
        let (next_cell, elevation) = self.grid.write(|g| {
            let ahead = g.ahead(cell, heading);
            let next = match response {
                Response::Forward => ahead,
                Response::Smooth => {
                    g.smooth(cell, ahead);
                    cell
                }
                Response::Plow => {
                    g.plow(cell, ahead, rng);
                    cell
                }
                Response::Raise => {
                    g.raise(cell);
                    cell
                }
                Response::Lower => {
                    g.lower(cell);
                    cell
                }
                Response::Wait | Response::TurnLeft | Response::TurnRight => cell,
            };
            (next, g.elevation_at(next))
        });

        let next_heading = match response {
            Response::TurnLeft => heading.turn_left(),
            Response::TurnRight => heading.turn_right(),
            _ => heading,
        };
        self.pufferfish.set_cell(next_cell);
        self.pufferfish.set_heading(next_heading);
        self.tick = self.tick.saturating_add(1);

        let summary = TickSummary {
            tick: self.tick,
            response,
            cell: next_cell,
            heading: next_heading,
            elevation,
            metamorphs: self.pufferfish.metamorphs().len(),
        };
        debug!(
            tick = summary.tick,
            response = %response,
            cell = %next_cell,
            heading = %next_heading,
            "tick"
        );
        Ok(summary)
    }

    /// Restore the grid checkpoint, reset the agent, reseed the random
    /// source, and rewind the tick counter. Learned metamorphs survive.
    pub fn reset(&mut self) {
        self.grid.write(Grid::restore);
        self.pufferfish.reset();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.tick = 0;
        info!(seed = self.seed, "simulation reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pufferfish_types::DriverKind;

    use super::*;
    use crate::config::SimulationConfig;

    fn config(driver: &str) -> SimulationConfig {
        let yaml = format!(
            "world:\n  width: 11\n  height: 11\n  max_elevation: 9\nrun:\n  steps: 10\n  driver: {driver}\nmorphognostic:\n  num_neighborhoods: 2\n"
        );
        SimulationConfig::parse(&yaml).unwrap()
    }

    #[test]
    fn starts_at_center_facing_north() {
        let sim = Simulation::new(&config("autopilot")).unwrap();
        assert_eq!(sim.pufferfish().cell(), Cell::new(5, 5));
        assert_eq!(sim.pufferfish().heading(), Orientation::North);
        assert_eq!(sim.pufferfish().driver_kind(), DriverKind::Autopilot);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn missing_dimensions_is_an_error() {
        let config = SimulationConfig::default();
        assert!(matches!(
            Simulation::new(&config),
            Err(TickError::MissingDimensions)
        ));
    }

    #[test]
    fn manual_responses_move_and_edit() {
        let mut sim = Simulation::new(&config("manual")).unwrap();
        let start = sim.pufferfish().cell();

        sim.pufferfish_mut().set_manual_response(Response::Raise);
        let summary = sim.step().unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.elevation, 1);
        assert_eq!(sim.grid().read(|g| g.elevation_at(start)), 1);

        sim.pufferfish_mut().set_manual_response(Response::Forward);
        let summary = sim.step().unwrap();
        assert_eq!(summary.cell, Cell::new(5, 6));

        sim.pufferfish_mut().set_manual_response(Response::TurnRight);
        let summary = sim.step().unwrap();
        assert_eq!(summary.heading, Orientation::East);
        assert_eq!(summary.cell, Cell::new(5, 6));

        sim.pufferfish_mut().set_manual_response(Response::Lower);
        sim.step().unwrap();
        assert_eq!(sim.grid().read(|g| g.elevation_at(Cell::new(5, 6))), 0);
    }

    #[test]
    fn forward_wraps_around() {
        let mut sim = Simulation::new(&config("manual")).unwrap();
        sim.pufferfish_mut().set_manual_response(Response::Forward);
        for _ in 0..11 {
            sim.step().unwrap();
        }
        assert_eq!(sim.pufferfish().cell(), Cell::new(5, 5));
    }

    #[test]
    fn reset_restores_grid_and_agent() {
        let mut sim = Simulation::new(&config("manual")).unwrap();
        sim.pufferfish_mut().set_manual_response(Response::Raise);
        sim.step().unwrap();
        sim.pufferfish_mut().set_manual_response(Response::Forward);
        sim.step().unwrap();
        let learned = sim.pufferfish().metamorphs().len();

        sim.reset();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.pufferfish().cell(), Cell::new(5, 5));
        assert_eq!(sim.grid().read(|g| g.elevation_at(Cell::new(5, 5))), 0);
        assert_eq!(sim.pufferfish().metamorphs().len(), learned);
    }

    #[test]
    fn runs_are_deterministic() {
        let run = || {
            let mut config = config("metamorph_db");
            config.world.terrain = Terrain::Random;
            let mut sim = Simulation::new(&config).unwrap();
            (0..30).map(|_| sim.step().unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn summary_serializes_with_names() {
        let mut sim = Simulation::new(&config("autopilot")).unwrap();
        let summary = sim.step().unwrap();
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["tick"], 1);
        assert_eq!(json["response"], "smooth");
        assert_eq!(json["heading"], "north");
        assert_eq!(json["cell"]["x"], 5);
    }
}
