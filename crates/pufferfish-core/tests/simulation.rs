//! End-to-end tick cycle tests: autopilot coverage on a real grid and
//! replay of learned behavior through the metamorph-db driver.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use pufferfish_agents::Phase;
use pufferfish_core::{NoOpCallback, Simulation, SimulationConfig, run_simulation};
use pufferfish_types::{Cell, DriverKind, Response};

const CENTER: Cell = Cell::new(10, 10);

fn autopilot_config() -> SimulationConfig {
    let yaml = "
world:
  width: 21
  height: 21
  max_elevation: 9
run:
  steps: 1
  driver: autopilot
morphognostic:
  num_neighborhoods: 2
autopilot:
  center_radius: 2
  num_spokes: 28
  spoke_length: 4
";
    SimulationConfig::parse(yaml).unwrap()
}

fn ring(cell: Cell) -> usize {
    cell.x.abs_diff(CENTER.x).max(cell.y.abs_diff(CENTER.y))
}

#[test]
fn spiral_covers_rings_in_order() {
    let config = autopilot_config();
    assert!(config.validate().is_ok());
    let mut sim = Simulation::new(&config).unwrap();
    assert_eq!(sim.pufferfish().cell(), CENTER);

    let mut forwards = [0_usize; 3];
    let mut last_ring = 0;
    let mut smooths = 0;
    let mut moves = 0;
    while sim.pufferfish().autopilot().phase() == Phase::Spiral {
        let summary = sim.step().unwrap();
        match summary.response {
            Response::Smooth => smooths += 1,
            Response::Forward => {
                moves += 1;
                let r = ring(summary.cell);
                assert!(r >= last_ring, "ring went from {last_ring} to {r}");
                last_ring = r;
                forwards[r] += 1;
            }
            Response::TurnLeft => moves += 1,
            other => assert_eq!(other, Response::Smooth, "unexpected {other}"),
        }
    }

    assert_eq!(forwards, [0, 8, 16]);
    assert_eq!(smooths, moves);

    let midpoint = sim.grid().read(|g| g.midpoint());
    let leveled = sim.grid().read(|g| {
        (8..=12).all(|x| (8..=12).all(|y| g.elevation_at(Cell::new(x, y)) == midpoint))
    });
    assert!(leveled);
}

#[test]
fn autopilot_program_finishes_at_home() {
    let mut sim = Simulation::new(&autopilot_config()).unwrap();
    let mut max_ring = 0;
    let mut raises = 0;
    let mut lowers = 0;
    for _ in 0..5000 {
        if sim.pufferfish().autopilot().phase() == Phase::Done {
            break;
        }
        let summary = sim.step().unwrap();
        max_ring = max_ring.max(ring(summary.cell));
        match summary.response {
            Response::Raise => raises += 1,
            Response::Lower => lowers += 1,
            _ => {}
        }
    }
    assert_eq!(sim.pufferfish().autopilot().phase(), Phase::Done);
    assert_eq!(sim.pufferfish().cell(), CENTER);
    assert_eq!(raises, 28);
    assert_eq!(lowers, 28);
    assert!((4..=6).contains(&max_ring));

    let summary = sim.step().unwrap();
    assert_eq!(summary.response, Response::Wait);
}

fn run_to_done(width: usize, height: usize) -> Simulation {
    let yaml = format!(
        "world:\n  width: {width}\n  height: {height}\nrun:\n  steps: 1\n  driver: autopilot\nmorphognostic:\n  num_neighborhoods: 2\n"
    );
    let config = SimulationConfig::parse(&yaml).unwrap();
    assert!(config.validate().is_ok());
    let mut sim = Simulation::new(&config).unwrap();
    for _ in 0..20_000 {
        if sim.pufferfish().autopilot().phase() == Phase::Done {
            break;
        }
        sim.step().unwrap();
    }
    sim
}

#[test]
fn autopilot_finishes_on_grids_smaller_than_its_spokes() {
    let sim = run_to_done(11, 11);
    assert_eq!(sim.pufferfish().autopilot().phase(), Phase::Done);
    assert_eq!(sim.pufferfish().autopilot().reach(), 5);
    assert_eq!(sim.pufferfish().cell(), sim.pufferfish().reset_cell());
}

#[test]
fn autopilot_finishes_on_the_smallest_odd_grid() {
    let mut sim = run_to_done(3, 3);
    assert_eq!(sim.pufferfish().autopilot().phase(), Phase::Done);
    assert_eq!(sim.pufferfish().cell(), Cell::new(1, 1));
    assert_eq!(sim.step().unwrap().response, Response::Wait);
}

#[test]
fn learned_behavior_replays_from_reset() {
    let mut sim = Simulation::new(&autopilot_config()).unwrap();
    run_simulation(&mut sim, 40, 0, &mut NoOpCallback).unwrap();
    let learned = sim.pufferfish().metamorphs().len();
    assert!(learned > 0);

    sim.reset();
    sim.pufferfish_mut().set_driver(DriverKind::MetamorphDb);
    let first = sim.step().unwrap();
    assert_eq!(first.response, Response::Smooth);
    assert_eq!(sim.pufferfish().metamorphs().len(), learned);
}
