//! Morphognostics: multi-scale, multi-epoch event-density descriptors.
//!
//! A [`Morphognostic`] summarizes what an agent has recently sensed around
//! its position as a stack of [`Neighborhood`]s. Each level covers a wider
//! square of cells and an older slice of time than the one below it, and
//! each cell of a level (a [`Sector`]) holds a normalized histogram of the
//! event values observed there during the level's time window.
//!
//! A [`Metamorph`] pairs a frozen descriptor with the response taken in that
//! context; the [`MetamorphStore`] keeps the distinct ones and answers
//! nearest-neighbor queries across the four rotations.
//!
//! # Modules
//!
//! - [`error`] -- Error types for descriptor construction and persistence.
//! - [`event`] -- [`Event`], the bounded-age [`EventHistory`], and the
//!   dense [`EventTensor`] built from it each tick.
//! - [`neighborhood`] -- [`Neighborhood`] and [`Sector`].
//! - [`morphognostic`] -- Shape parameters, update, rotation-aware compare,
//!   flattening, and save/load.
//! - [`metamorph`] -- [`Metamorph`] and the deduplicating [`MetamorphStore`].

pub mod error;
pub mod event;
pub mod metamorph;
pub mod morphognostic;
pub mod neighborhood;

// Re-export primary types at crate root.
pub use error::MorphError;
pub use event::{Event, EventHistory, EventTensor};
pub use metamorph::{Metamorph, MetamorphStore};
pub use morphognostic::{Morphognostic, MorphognosticParams, compare_rotated};
pub use neighborhood::{Neighborhood, Sector};
