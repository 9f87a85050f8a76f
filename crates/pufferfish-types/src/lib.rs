//! Shared type definitions for the Pufferfish morphognosis simulation.
//!
//! This crate holds the small vocabulary every other crate speaks: grid
//! coordinates, headings, the agent's response alphabet, driver selection,
//! and the line-oriented record codec used by snapshot files.
//!
//! # Modules
//!
//! - [`cell`] -- Grid cell coordinates
//! - [`enums`] -- Orientation, response, and driver enumerations
//! - [`record`] -- Line-per-value text record reader and writer

pub mod cell;
pub mod enums;
pub mod record;

// Re-export all public types at crate root for convenience.
pub use cell::Cell;
pub use enums::{DriverKind, NUM_RESPONSES, Orientation, ParseResponseError, Response};
pub use record::{RecordError, RecordReader, RecordWriter};
