//! The nest: a toroidal elevation field the pufferfish senses and reshapes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid construction.
//! - [`grid`] -- [`Grid`] with wrap-around addressing, checkpoint/restore,
//!   and the `smooth`/`plow` terrain edits.
//! - [`sensors`] -- The 3x3 oriented sensor footprint around the agent.
//! - [`shared`] -- [`SharedGrid`], a lock-guarded handle for readers on
//!   other threads.

pub mod error;
pub mod grid;
pub mod sensors;
pub mod shared;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::{Grid, wrapped_axis_delta};
pub use sensors::{NUM_SENSORS, SENSOR_OFFSETS, sense};
pub use shared::SharedGrid;
