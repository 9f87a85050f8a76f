//! Line-oriented console for interactive runs.
//!
//! Each input line is one command:
//!
//! - a response name, shorthand, or code (`forward`, `f`, `1`, ...) sets the
//!   manual response and runs one tick; only accepted with the manual driver
//! - an empty line or `step` runs one tick with the current driver
//! - `reset` restores the grid checkpoint and the agent's starting pose
//! - `status` prints the agent's pose
//! - `quit` or `q` ends the session (end of input does too)

use std::io::{BufRead, Write};

use pufferfish_core::{Simulation, TickCallback};
use pufferfish_types::{DriverKind, ParseResponseError, Response};
use tracing::{debug, info};

use crate::error::EngineError;

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run one tick with the manual driver answering `Response`.
    Respond(Response),
    /// Run one tick with whatever driver is active.
    Step,
    /// Restore the starting state.
    Reset,
    /// Print the agent's pose.
    Status,
    /// End the session.
    Quit,
}

/// Parse one console line.
pub fn parse_command(line: &str) -> Result<Command, ParseResponseError> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "step" => Ok(Command::Step),
        "reset" => Ok(Command::Reset),
        "status" => Ok(Command::Status),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => other.parse().map(Command::Respond),
    }
}

/// Read commands from `input` until it ends or a quit command arrives.
///
/// Returns the number of ticks run.
pub fn run_console<R: BufRead, W: Write>(
    simulation: &mut Simulation,
    input: R,
    mut output: W,
    callback: &mut dyn TickCallback,
) -> Result<u64, EngineError> {
    let mut ticks: u64 = 0;
    info!(driver = %simulation.pufferfish().driver_kind(), "Console session starting");
    write_status(simulation, &mut output)?;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{e}")?;
                continue;
            }
        };
        debug!(?command, "console command");

        match command {
            Command::Quit => break,
            Command::Status => write_status(simulation, &mut output)?,
            Command::Reset => {
                simulation.reset();
                writeln!(output, "reset")?;
                write_status(simulation, &mut output)?;
            }
            Command::Respond(response) => {
                let driver = simulation.pufferfish().driver_kind();
                if driver != DriverKind::Manual {
                    writeln!(output, "driver is {driver}; press enter to step")?;
                    continue;
                }
                simulation.pufferfish_mut().set_manual_response(response);
                step(simulation, &mut output, callback)?;
                ticks = ticks.saturating_add(1);
            }
            Command::Step => {
                step(simulation, &mut output, callback)?;
                ticks = ticks.saturating_add(1);
            }
        }
        output.flush()?;
    }

    info!(ticks, final_tick = simulation.tick(), "Console session ended");
    Ok(ticks)
}

fn step<W: Write>(
    simulation: &mut Simulation,
    output: &mut W,
    callback: &mut dyn TickCallback,
) -> Result<(), EngineError> {
    let summary = simulation.step()?;
    callback.on_tick(&summary, simulation);
    writeln!(
        output,
        "tick {}: {} -> {} facing {}, elevation {}, metamorphs {}",
        summary.tick,
        summary.response,
        summary.cell,
        summary.heading,
        summary.elevation,
        summary.metamorphs
    )?;
    Ok(())
}

fn write_status<W: Write>(simulation: &Simulation, output: &mut W) -> Result<(), EngineError> {
    let agent = simulation.pufferfish();
    writeln!(
        output,
        "tick {}: at {} facing {}, driver {}, metamorphs {}",
        simulation.tick(),
        agent.cell(),
        agent.heading(),
        agent.driver_kind(),
        agent.metamorphs().len()
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pufferfish_core::{NoOpCallback, SimulationConfig};
    use pufferfish_types::Cell;

    use super::*;

    fn manual_simulation() -> Simulation {
        let config = SimulationConfig::parse(
            "world:\n  width: 9\n  height: 9\nrun:\n  interactive: true\n  driver: manual\nmorphognostic:\n  num_neighborhoods: 1\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        Simulation::new(&config).unwrap()
    }

    fn run(simulation: &mut Simulation, script: &str) -> (u64, String) {
        let mut output = Vec::new();
        let ticks = run_console(simulation, script.as_bytes(), &mut output, &mut NoOpCallback).unwrap();
        (ticks, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command(""), Ok(Command::Step));
        assert_eq!(parse_command(" Reset "), Ok(Command::Reset));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(parse_command("f"), Ok(Command::Respond(Response::Forward)));
        assert_eq!(parse_command("6"), Ok(Command::Respond(Response::Raise)));
        assert!(parse_command("jump").is_err());
    }

    #[test]
    fn manual_responses_move_the_agent() {
        let mut sim = manual_simulation();
        let (ticks, text) = run(&mut sim, "forward\nforward\nright\nforward\n");
        assert_eq!(ticks, 4);
        assert_eq!(sim.pufferfish().cell(), Cell::new(5, 6));
        assert!(text.contains("tick 4: forward -> (5, 6)"), "{text}");
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let mut sim = manual_simulation();
        let (ticks, text) = run(&mut sim, "jump\nraise\n");
        assert_eq!(ticks, 1);
        assert!(text.contains("unknown response"), "{text}");
        assert_eq!(sim.grid().read(|g| g.elevation_at(Cell::new(4, 4))), 1);
    }

    #[test]
    fn quit_stops_reading() {
        let mut sim = manual_simulation();
        let (ticks, _) = run(&mut sim, "f\nquit\nf\nf\n");
        assert_eq!(ticks, 1);
        assert_eq!(sim.tick(), 1);
    }

    #[test]
    fn reset_returns_home() {
        let mut sim = manual_simulation();
        run(&mut sim, "f\nf\nreset\n");
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.pufferfish().cell(), Cell::new(4, 4));
    }

    #[test]
    fn responses_need_the_manual_driver() {
        let mut sim = manual_simulation();
        sim.pufferfish_mut().set_driver(DriverKind::MetamorphDb);
        let (ticks, text) = run(&mut sim, "forward\n");
        assert_eq!(ticks, 0);
        assert!(text.contains("driver is metamorph_db"), "{text}");
    }
}
