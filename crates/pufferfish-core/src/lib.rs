//! Configuration, tick cycle, and run loop for the Pufferfish simulation.
//!
//! This crate wires the grid and the agent together: it reads the
//! configuration, builds a [`Simulation`], applies each tick's response to
//! the world, and drives batch runs.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `pufferfish-config.yaml` into
//!   strongly-typed structs.
//! - [`runner`] -- Batch run loop with [`TickCallback`] hooks.
//! - [`tick`] -- The per-tick sense, cycle, apply sequence.
//!
//! [`Simulation`]: tick::Simulation
//! [`TickCallback`]: runner::TickCallback

pub mod config;
pub mod runner;
pub mod tick;

// Re-export primary types at crate root.
pub use config::{ConfigError, SimulationConfig, Terrain};
pub use runner::{
    NoOpCallback, RunnerError, SimulationResult, TickCallback, log_simulation_end, run_simulation,
};
pub use tick::{Simulation, TickError, TickSummary};
