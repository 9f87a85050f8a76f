//! Configuration loading and typed config structures for the Pufferfish simulation.
//!
//! The canonical configuration lives in `pufferfish-config.yaml` at the
//! project root. Every section is optional and every field has a default,
//! except the grid dimensions, which a new run must supply. Call
//! [`SimulationConfig::validate`] before building anything from the result.

use std::path::{Path, PathBuf};

use pufferfish_agents::{AutopilotConfig, ClassifierConfig, PufferfishConfig};
use pufferfish_morphognostic::{MorphError, MorphognosticParams};
use pufferfish_types::DriverKind;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The settings are individually valid but do not make sense together.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },

    /// The descriptor shape is invalid.
    #[error("invalid morphognostic shape: {source}")]
    Morphognostic {
        /// The underlying shape error.
        #[from]
        source: MorphError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `pufferfish-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid and seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// How long to run, with which driver, and where state goes.
    #[serde(default)]
    pub run: RunConfig,

    /// Descriptor shape.
    #[serde(default)]
    pub morphognostic: MorphognosticConfig,

    /// Metamorph store settings.
    #[serde(default)]
    pub metamorphs: MetamorphConfig,

    /// Autopilot geometry.
    #[serde(default)]
    pub autopilot: AutopilotConfig,

    /// Classifier training parameters for the metamorph-nn driver.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Reject combinations that cannot start a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.load_path.is_some() {
            if self.world.width.is_some() || self.world.height.is_some() {
                return Err(invalid("grid dimensions come from the loaded file"));
            }
            if self.morphognostic.has_shape() {
                return Err(invalid("morphognostic shape comes from the loaded file"));
            }
        } else {
            let (Some(width), Some(height)) = (self.world.width, self.world.height) else {
                return Err(invalid("world.width and world.height are required for a new run"));
            };
            if width < 2 || height < 2 {
                return Err(invalid(format!(
                    "grid must be at least 2x2, got {width}x{height}"
                )));
            }
            self.morphognostic.params().validate()?;
        }

        match (self.run.steps, self.run.interactive) {
            (Some(_), true) => {
                return Err(invalid("run.steps and run.interactive are mutually exclusive"));
            }
            (None, false) => return Err(invalid("one of run.steps or run.interactive is required")),
            _ => {}
        }
        if self.run.driver == DriverKind::Manual && !self.run.interactive {
            return Err(invalid("the manual driver requires run.interactive"));
        }

        let distance = self.metamorphs.equivalent_distance;
        if !distance.is_finite() || distance < 0.0 {
            return Err(invalid(format!(
                "metamorphs.equivalent_distance must be a non-negative number, got {distance}"
            )));
        }
        Ok(())
    }

    /// Agent construction parameters.
    pub fn pufferfish_config(&self) -> PufferfishConfig {
        PufferfishConfig {
            morphognostic: self.morphognostic.params(),
            include_response_channel: self.morphognostic.include_response_channel,
            equivalent_distance: self.metamorphs.equivalent_distance,
            autopilot: self.autopilot,
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// How a new grid is initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Every cell at zero.
    #[default]
    Flat,
    /// Every cell uniformly random in `0..=max_elevation`.
    Random,
}

/// Grid and seed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Random seed for reproducibility (default: 4517).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Grid width. Required for a new run.
    #[serde(default)]
    pub width: Option<usize>,

    /// Grid height. Required for a new run.
    #[serde(default)]
    pub height: Option<usize>,

    /// Highest elevation a cell can hold (default: 99).
    #[serde(default = "default_max_elevation")]
    pub max_elevation: u32,

    /// Initial terrain (default: flat).
    #[serde(default)]
    pub terrain: Terrain,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            width: None,
            height: None,
            max_elevation: default_max_elevation(),
            terrain: Terrain::default(),
        }
    }
}

/// Run control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of ticks to run in batch mode.
    #[serde(default)]
    pub steps: Option<u64>,

    /// Read responses from the console instead of running a fixed number
    /// of ticks.
    #[serde(default)]
    pub interactive: bool,

    /// Driver for the run (default: `metamorph_db`).
    #[serde(default)]
    pub driver: DriverKind,

    /// Snapshot to resume from.
    #[serde(default)]
    pub load_path: Option<PathBuf>,

    /// Where to write a snapshot when the run ends.
    #[serde(default)]
    pub save_path: Option<PathBuf>,

    /// Where to write one JSON line per tick.
    #[serde(default)]
    pub trace_path: Option<PathBuf>,
}

/// Descriptor shape. Unset fields take the descriptor defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MorphognosticConfig {
    /// Number of levels.
    #[serde(default)]
    pub num_neighborhoods: Option<usize>,

    /// Side of the innermost level; odd, at least 3.
    #[serde(default)]
    pub initial_dimension: Option<usize>,

    /// Added to the side at each level.
    #[serde(default)]
    pub dimension_stride: Option<usize>,

    /// Multiplies the side at each level.
    #[serde(default)]
    pub dimension_multiplier: Option<usize>,

    /// Added to the epoch duration at each level.
    #[serde(default)]
    pub epoch_interval_stride: Option<usize>,

    /// Multiplies the epoch duration at each level.
    #[serde(default)]
    pub epoch_interval_multiplier: Option<usize>,

    /// Record the previous response as an extra event channel (default: false).
    #[serde(default)]
    pub include_response_channel: bool,
}

impl MorphognosticConfig {
    /// Whether any shape parameter was given.
    pub const fn has_shape(&self) -> bool {
        self.num_neighborhoods.is_some()
            || self.initial_dimension.is_some()
            || self.dimension_stride.is_some()
            || self.dimension_multiplier.is_some()
            || self.epoch_interval_stride.is_some()
            || self.epoch_interval_multiplier.is_some()
    }

    /// The shape with defaults filled in.
    pub fn params(&self) -> MorphognosticParams {
        let d = MorphognosticParams::default();
        MorphognosticParams {
            num_neighborhoods: self.num_neighborhoods.unwrap_or(d.num_neighborhoods),
            initial_dimension: self.initial_dimension.unwrap_or(d.initial_dimension),
            dimension_stride: self.dimension_stride.unwrap_or(d.dimension_stride),
            dimension_multiplier: self.dimension_multiplier.unwrap_or(d.dimension_multiplier),
            epoch_interval_stride: self.epoch_interval_stride.unwrap_or(d.epoch_interval_stride),
            epoch_interval_multiplier: self
                .epoch_interval_multiplier
                .unwrap_or(d.epoch_interval_multiplier),
        }
    }
}

/// Metamorph store configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MetamorphConfig {
    /// Descriptors at most this far apart are the same context (default: 0.0).
    #[serde(default)]
    pub equivalent_distance: f32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log a progress line every N ticks; 0 disables it (default: 100).
    #[serde(default = "default_summary_interval_ticks")]
    pub summary_interval_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            summary_interval_ticks: default_summary_interval_ticks(),
        }
    }
}

const fn default_seed() -> u64 {
    4517
}

const fn default_max_elevation() -> u32 {
    99
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_summary_interval_ticks() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(yaml: &str) -> SimulationConfig {
        SimulationConfig::parse(yaml)
            .ok()
            .unwrap_or_else(SimulationConfig::default)
    }

    #[test]
    fn default_config_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.seed, 4517);
        assert_eq!(config.world.max_elevation, 99);
        assert_eq!(config.world.terrain, Terrain::Flat);
        assert_eq!(config.run.driver, DriverKind::MetamorphDb);
        assert_eq!(config.autopilot.num_spokes, 28);
        assert_eq!(config.classifier.hidden_units, 20);
        assert_eq!(config.morphognostic.params(), MorphognosticParams::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
world:
  seed: 99
  width: 21
  height: 15
  max_elevation: 9
  terrain: random

run:
  steps: 500
  driver: autopilot
  save_path: out.txt
  trace_path: trace.jsonl

morphognostic:
  num_neighborhoods: 2
  initial_dimension: 5
  dimension_stride: 4
  include_response_channel: true

metamorphs:
  equivalent_distance: 0.5

autopilot:
  center_radius: 3
  num_spokes: 12

classifier:
  epochs: 50
  seed: 3

logging:
  level: debug
  summary_interval_ticks: 10
";
        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_else(SimulationConfig::default);

        assert_eq!(config.world.width, Some(21));
        assert_eq!(config.world.terrain, Terrain::Random);
        assert_eq!(config.run.steps, Some(500));
        assert_eq!(config.run.driver, DriverKind::Autopilot);
        assert_eq!(config.run.trace_path, Some(PathBuf::from("trace.jsonl")));
        assert_eq!(config.morphognostic.params().initial_dimension, 5);
        assert_eq!(config.morphognostic.params().dimension_multiplier, 1);
        assert!(config.morphognostic.include_response_channel);
        assert_eq!(config.autopilot.center_radius, 3);
        assert_eq!(config.autopilot.spoke_length, 4);
        assert_eq!(config.classifier.epochs, 50);
        assert_eq!(config.logging.summary_interval_ticks, 10);
        assert!(config.validate().is_ok());

        let agent = config.pufferfish_config();
        assert!(agent.include_response_channel);
        assert!((agent.equivalent_distance - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = batch("world:\n  seed: 7\n");
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.max_elevation, 99);
        assert!(!config.morphognostic.has_shape());
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn new_run_needs_dimensions() {
        let config = batch("run:\n  steps: 10\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let config = batch("world:\n  width: 1\n  height: 8\nrun:\n  steps: 10\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_excludes_dimensions_and_shape() {
        let ok = batch("run:\n  steps: 10\n  load_path: state.txt\n");
        assert!(ok.validate().is_ok());

        let dims = batch("world:\n  width: 8\n  height: 8\nrun:\n  steps: 10\n  load_path: s.txt\n");
        assert!(dims.validate().is_err());

        let shape = batch("morphognostic:\n  num_neighborhoods: 2\nrun:\n  steps: 10\n  load_path: s.txt\n");
        assert!(shape.validate().is_err());
    }

    #[test]
    fn run_mode_must_be_exactly_one() {
        let base = "world:\n  width: 8\n  height: 8\n";
        let neither = batch(base);
        assert!(neither.validate().is_err());

        let both = batch(&format!("{base}run:\n  steps: 5\n  interactive: true\n"));
        assert!(both.validate().is_err());

        let interactive = batch(&format!("{base}run:\n  interactive: true\n  driver: manual\n"));
        assert!(interactive.validate().is_ok());

        let manual_batch = batch(&format!("{base}run:\n  steps: 5\n  driver: manual\n"));
        assert!(manual_batch.validate().is_err());
    }

    #[test]
    fn rejects_bad_shape_and_tolerance() {
        let base = "world:\n  width: 8\n  height: 8\nrun:\n  steps: 5\n";
        let even = batch(&format!("{base}morphognostic:\n  initial_dimension: 4\n"));
        assert!(matches!(
            even.validate(),
            Err(ConfigError::Morphognostic { .. })
        ));

        let negative = batch(&format!("{base}metamorphs:\n  equivalent_distance: -1.0\n"));
        assert!(matches!(negative.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("pufferfish-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            if let Ok(config) = config {
                assert!(config.validate().is_ok(), "{:?}", config.validate());
            }
        }
    }
}
