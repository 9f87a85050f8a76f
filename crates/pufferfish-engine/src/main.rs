//! Engine binary for the Pufferfish simulation.
//!
//! This is the main entry point that wires together configuration, the
//! simulation, snapshots, and the optional console. It runs either a fixed
//! number of ticks or an interactive session, then saves if asked to.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `pufferfish-config.yaml` (or `PUFFERFISH_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the configuration
//! 4. Build a new simulation or load one from `run.load_path`
//! 5. Train the classifier when the `metamorph_nn` driver is selected
//! 6. Run the batch loop or the console
//! 7. Save to `run.save_path` and log the result

mod console;
mod error;
mod trace;

use std::path::{Path, PathBuf};

use pufferfish_agents::MlpTrainer;
use pufferfish_core::{NoOpCallback, Simulation, SimulationConfig, TickCallback, runner};
use pufferfish_db::SnapshotStore;
use pufferfish_types::DriverKind;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::trace::TraceWriter;

/// Environment variable that overrides the configuration file path.
const CONFIG_ENV: &str = "PUFFERFISH_CONFIG";

/// Configuration file looked up in the working directory by default.
const DEFAULT_CONFIG_PATH: &str = "pufferfish-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("pufferfish-engine starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Validate.
    config.validate().map_err(EngineError::from)?;

    // 4. Build or load the simulation.
    let mut simulation = build_simulation(&config)?;

    // 5. Train the classifier.
    if config.run.driver == DriverKind::MetamorphNn {
        let trainer = MlpTrainer::new(config.classifier);
        if let Err(e) = simulation.pufferfish_mut().train_classifier(&trainer) {
            warn!(error = %e, "Classifier training failed, metamorph_nn driver will wait");
        }
    }

    // 6. Run.
    let mut trace = config
        .run
        .trace_path
        .as_deref()
        .map(TraceWriter::create)
        .transpose()
        .map_err(EngineError::from)?;
    let mut no_op = NoOpCallback;
    let callback: &mut dyn TickCallback = match trace.as_mut() {
        Some(writer) => writer,
        None => &mut no_op,
    };

    if let Some(steps) = config.run.steps {
        let result = runner::run_simulation(
            &mut simulation,
            steps,
            config.logging.summary_interval_ticks,
            callback,
        )
        .map_err(EngineError::from)?;
        runner::log_simulation_end(&result);
    } else {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        console::run_console(&mut simulation, stdin.lock(), stdout.lock(), callback)?;
    }

    if let Some(writer) = trace {
        writer.finish().map_err(EngineError::from)?;
    }

    // 7. Save.
    if let Some(path) = config.run.save_path.as_deref() {
        SnapshotStore::new(path)
            .save(&simulation)
            .map_err(EngineError::from)?;
    }

    info!(
        tick = simulation.tick(),
        metamorphs = simulation.pufferfish().metamorphs().len(),
        "pufferfish-engine shutdown complete"
    );

    Ok(())
}

/// Path of the configuration file, honoring `PUFFERFISH_CONFIG`.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist. The flag reports whether the file was found.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Create a fresh simulation, or resume the one at `run.load_path` with
/// the configured driver.
fn build_simulation(config: &SimulationConfig) -> Result<Simulation, EngineError> {
    let Some(path) = config.run.load_path.as_deref() else {
        return Ok(Simulation::new(config)?);
    };
    let mut simulation = SnapshotStore::new(path).load(config.autopilot)?;
    simulation.pufferfish_mut().set_driver(config.run.driver);
    Ok(simulation)
}
