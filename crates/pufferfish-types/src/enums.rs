//! Enumeration types for the Pufferfish simulation.
//!
//! Every enum here carries a stable integer code. Codes are written into
//! snapshot files and used as classifier labels, so they must never be
//! renumbered.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// A cardinal heading. North points toward increasing `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Facing `+y`.
    North,
    /// Facing `+x`.
    East,
    /// Facing `-y`.
    South,
    /// Facing `-x`.
    West,
}

impl Orientation {
    /// All four headings in code order.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Stable integer code (North = 0, clockwise).
    pub const fn code(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::North),
            1 => Some(Self::East),
            2 => Some(Self::South),
            3 => Some(Self::West),
            _ => None,
        }
    }

    /// Heading after a quarter turn counter-clockwise (N -> W -> S -> E).
    pub const fn turn_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
        }
    }

    /// Heading after a quarter turn clockwise (N -> E -> S -> W).
    pub const fn turn_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Unit step `(dx, dy)` taken by a forward move.
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// Convert an agent-frame offset into a grid offset.
    ///
    /// `lateral` is positive to the agent's right, `forward` positive ahead.
    // Offsets are bounded by the grid size, far from i64::MIN.
    #[allow(clippy::arithmetic_side_effects)]
    pub const fn to_grid(self, lateral: i64, forward: i64) -> (i64, i64) {
        match self {
            Self::North => (lateral, forward),
            Self::East => (forward, -lateral),
            Self::South => (-lateral, -forward),
            Self::West => (-forward, lateral),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Number of distinct agent responses.
pub const NUM_RESPONSES: usize = 8;

/// An action the agent emits at the end of a sense-act cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Do nothing this tick.
    #[default]
    Wait,
    /// Move one cell along the current heading.
    Forward,
    /// Rotate a quarter turn counter-clockwise.
    TurnLeft,
    /// Rotate a quarter turn clockwise.
    TurnRight,
    /// Flatten the current cell, the cell ahead, and its lateral flanks.
    Smooth,
    /// Push the higher cell ahead down to the current cell's level.
    Plow,
    /// Raise the current cell by one.
    Raise,
    /// Lower the current cell by one.
    Lower,
}

impl Response {
    /// All responses in code order.
    pub const ALL: [Self; NUM_RESPONSES] = [
        Self::Wait,
        Self::Forward,
        Self::TurnLeft,
        Self::TurnRight,
        Self::Smooth,
        Self::Plow,
        Self::Raise,
        Self::Lower,
    ];

    /// Stable integer code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Wait => 0,
            Self::Forward => 1,
            Self::TurnLeft => 2,
            Self::TurnRight => 3,
            Self::Smooth => 4,
            Self::Plow => 5,
            Self::Raise => 6,
            Self::Lower => 7,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Wait),
            1 => Some(Self::Forward),
            2 => Some(Self::TurnLeft),
            3 => Some(Self::TurnRight),
            4 => Some(Self::Smooth),
            5 => Some(Self::Plow),
            6 => Some(Self::Raise),
            7 => Some(Self::Lower),
            _ => None,
        }
    }

    /// Code as a dense index, for per-response tables.
    pub const fn index(self) -> usize {
        self.code() as usize
    }

    /// Whether the response changes the agent's position or heading.
    pub const fn is_movement(self) -> bool {
        matches!(self, Self::Forward | Self::TurnLeft | Self::TurnRight)
    }

    /// Whether the response edits terrain.
    pub const fn is_terrain_edit(self) -> bool {
        matches!(self, Self::Smooth | Self::Plow | Self::Raise | Self::Lower)
    }

    /// Lowercase name used in logs and the console.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Forward => "forward",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
            Self::Smooth => "smooth",
            Self::Plow => "plow",
            Self::Raise => "raise",
            Self::Lower => "lower",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no known [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown response: {0:?}")]
pub struct ParseResponseError(pub String);

impl FromStr for Response {
    type Err = ParseResponseError;

    /// Accepts the lowercase name, a one-letter shorthand, or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code).ok_or(ParseResponseError(trimmed));
        }
        let response = match trimmed.as_str() {
            "wait" | "w" => Self::Wait,
            "forward" | "f" => Self::Forward,
            "turn_left" | "left" | "l" => Self::TurnLeft,
            "turn_right" | "right" | "r" => Self::TurnRight,
            "smooth" | "s" => Self::Smooth,
            "plow" | "p" => Self::Plow,
            "raise" | "+" => Self::Raise,
            "lower" | "-" => Self::Lower,
            _ => return Err(ParseResponseError(trimmed)),
        };
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Which decision procedure produces the agent's responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Nearest neighbor over stored metamorphs.
    #[default]
    MetamorphDb,
    /// Trained classifier over flattened descriptor densities.
    MetamorphNn,
    /// Deterministic spiral-then-spokes terrain shaping.
    Autopilot,
    /// Whatever response was last injected from outside.
    Manual,
}

impl DriverKind {
    /// Stable integer code.
    pub const fn code(self) -> u8 {
        match self {
            Self::MetamorphDb => 0,
            Self::MetamorphNn => 1,
            Self::Autopilot => 2,
            Self::Manual => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::MetamorphDb),
            1 => Some(Self::MetamorphNn),
            2 => Some(Self::Autopilot),
            3 => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MetamorphDb => "metamorph_db",
            Self::MetamorphNn => "metamorph_nn",
            Self::Autopilot => "autopilot",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}
