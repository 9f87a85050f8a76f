//! Tunables for the agent and its drivers.
//!
//! These correspond to the `morphognostic`, `metamorphs`, `autopilot`, and
//! `classifier` sections of `pufferfish-config.yaml`. The simulation core
//! deserializes them there and hands them to [`Pufferfish::new`].
//!
//! [`Pufferfish::new`]: crate::Pufferfish::new

use pufferfish_morphognostic::MorphognosticParams;
use serde::{Deserialize, Serialize};

/// Everything needed to construct a [`Pufferfish`](crate::Pufferfish).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PufferfishConfig {
    /// Descriptor shape.
    pub morphognostic: MorphognosticParams,
    /// Record the previous response as an extra event channel.
    pub include_response_channel: bool,
    /// Metamorph equivalence tolerance (default: 0.0).
    pub equivalent_distance: f32,
    /// Autopilot geometry.
    pub autopilot: AutopilotConfig,
}

/// Geometry of the autopilot's coverage pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutopilotConfig {
    /// Upper bound on the spiral radius (default: 2).
    #[serde(default = "default_center_radius")]
    pub center_radius: usize,

    /// Number of radial spokes walked after the spiral (default: 28).
    #[serde(default = "default_num_spokes")]
    pub num_spokes: usize,

    /// Spoke length beyond the center radius (default: 4).
    #[serde(default = "default_spoke_length")]
    pub spoke_length: usize,

    /// Length of the rippled tip; half of it is marked (default: 4).
    #[serde(default = "default_spoke_ripple_length")]
    pub spoke_ripple_length: usize,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            center_radius: default_center_radius(),
            num_spokes: default_num_spokes(),
            spoke_length: default_spoke_length(),
            spoke_ripple_length: default_spoke_ripple_length(),
        }
    }
}

/// Training parameters for the reference perceptron.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Hidden layer width (default: 20).
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,

    /// Gradient step size (default: 0.1).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Fraction of the previous weight update carried forward (default: 0.2).
    #[serde(default = "default_momentum")]
    pub momentum: f32,

    /// Passes over the training set (default: 2000).
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Seed for weight initialization and sample shuffling (default: 0).
    #[serde(default)]
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            hidden_units: default_hidden_units(),
            learning_rate: default_learning_rate(),
            momentum: default_momentum(),
            epochs: default_epochs(),
            seed: 0,
        }
    }
}

const fn default_center_radius() -> usize {
    2
}

const fn default_num_spokes() -> usize {
    28
}

const fn default_spoke_length() -> usize {
    4
}

const fn default_spoke_ripple_length() -> usize {
    4
}

const fn default_hidden_units() -> usize {
    20
}

const fn default_learning_rate() -> f32 {
    0.1
}

const fn default_momentum() -> f32 {
    0.2
}

const fn default_epochs() -> usize {
    2000
}
