//! Batch run loop.
//!
//! [`run_simulation`] steps a [`Simulation`] a fixed number of ticks,
//! calling a [`TickCallback`] after each one. Progress lines are logged at
//! a configurable interval.

use tracing::{info, warn};

use crate::tick::{Simulation, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed by this run.
    pub total_ticks: u64,
    /// Metamorphs known when the run ended.
    pub metamorphs: usize,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to write traces or update a display. The
/// callback receives the tick summary and the simulation.
pub trait TickCallback {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) {}
}

/// Run `steps` ticks.
///
/// Every `summary_interval` ticks (0 disables) a progress line is logged.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails; ticks already run stay applied.
pub fn run_simulation(
    simulation: &mut Simulation,
    steps: u64,
    summary_interval: u64,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut final_summary = None;
    let mut total_ticks: u64 = 0;

    info!(
        steps,
        start_tick = simulation.tick(),
        driver = %simulation.pufferfish().driver_kind(),
        "Simulation starting"
    );

    for _ in 0..steps {
        let summary = simulation.step()?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, simulation);

        if summary.tick.checked_rem(summary_interval) == Some(0) {
            info!(
                tick = summary.tick,
                cell = %summary.cell,
                metamorphs = summary.metamorphs,
                "progress"
            );
        }
        final_summary = Some(summary);
    }

    Ok(SimulationResult {
        final_summary,
        total_ticks,
        metamorphs: simulation.pufferfish().metamorphs().len(),
    })
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        metamorphs = result.metamorphs,
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            cell = %summary.cell,
            heading = %summary.heading,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
