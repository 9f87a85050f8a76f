//! Autopilot scenarios driven through the public agent API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::cast_precision_loss)]

use pufferfish_agents::spokes::spoke_path;
use pufferfish_agents::{Autopilot, AutopilotConfig, Phase, Pufferfish, PufferfishConfig};
use pufferfish_morphognostic::MorphognosticParams;
use pufferfish_types::{Cell, DriverKind, Orientation, Response};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn scenario_config() -> AutopilotConfig {
    AutopilotConfig {
        center_radius: 2,
        num_spokes: 28,
        spoke_length: 4,
        spoke_ripple_length: 4,
    }
}

#[test]
fn spoke_zero_reaches_the_outer_radius() {
    let config = scenario_config();
    let path = spoke_path(0, &config);
    let distances: Vec<f64> = path
        .cells
        .iter()
        .map(|&(x, y)| (x as f64).hypot(y as f64))
        .collect();
    assert_eq!(path.cells[0], (0, 0));
    assert!(distances.windows(2).all(|w| w[1] >= w[0]));
    assert!(distances[distances.len() - 1] >= 6.0);
}

#[test]
fn every_spoke_is_distinct() {
    let config = scenario_config();
    let tips: Vec<(i64, i64)> = (0..config.num_spokes)
        .map(|s| *spoke_path(s, &config).cells.last().unwrap())
        .collect();
    for (i, a) in tips.iter().enumerate() {
        assert!(tips[i + 1..].iter().all(|b| b != a), "duplicate tip {a:?}");
    }
}

#[test]
fn agent_follows_spiral_without_a_grid() {
    // The agent only needs sensor vectors; feed it flat terrain and apply
    // movement responses by hand.
    let config = PufferfishConfig {
        morphognostic: MorphognosticParams {
            num_neighborhoods: 1,
            ..MorphognosticParams::default()
        },
        autopilot: scenario_config(),
        ..PufferfishConfig::default()
    };
    let mut agent = Pufferfish::new(config, Cell::new(10, 10), Orientation::North, 21, 21, 9).unwrap();
    agent.set_driver(DriverKind::Autopilot);
    let mut rng = SmallRng::seed_from_u64(4517);

    let mut forwards = 0;
    while agent.autopilot().phase() == Phase::Spiral {
        match agent.cycle(&[0; 9], &mut rng).unwrap() {
            Response::Forward => {
                forwards += 1;
                let (dx, dy) = agent.heading().delta();
                let cell = agent.cell();
                let x = (cell.x as i64 + dx).rem_euclid(21) as usize;
                let y = (cell.y as i64 + dy).rem_euclid(21) as usize;
                agent.set_cell(Cell::new(x, y));
            }
            Response::TurnLeft => agent.set_heading(agent.heading().turn_left()),
            _ => {}
        }
    }
    assert_eq!(forwards, 24);
    assert_eq!(agent.cell(), Cell::new(12, 12));
    // A flat, featureless world looks the same everywhere, so only a
    // handful of contexts are learned.
    assert!(agent.metamorphs().len() < 10);
}

#[test]
fn autopilot_radius_respects_small_grids() {
    let autopilot = Autopilot::new(scenario_config(), Cell::new(1, 1), 3, 3);
    assert_eq!(autopilot.radius(), 1);
    assert_eq!(autopilot.reach(), 1);
    assert_eq!(autopilot.phase(), Phase::Spiral);
}
