//! Save and resume scenarios for whole simulations.

#![allow(clippy::unwrap_used)]

use pufferfish_agents::AutopilotConfig;
use pufferfish_core::{NoOpCallback, Simulation, SimulationConfig, TickSummary, run_simulation};
use pufferfish_db::{SnapshotStore, read_snapshot, write_snapshot};
use pufferfish_types::DriverKind;

const CONFIG: &str = "
world:
  width: 15
  height: 15
  max_elevation: 9
  terrain: random
run:
  steps: 60
  driver: autopilot
morphognostic:
  num_neighborhoods: 2
autopilot:
  center_radius: 2
  num_spokes: 8
  spoke_length: 3
";

fn config() -> SimulationConfig {
    SimulationConfig::parse(CONFIG).unwrap()
}

fn next_ticks(sim: &mut Simulation, count: usize) -> Vec<TickSummary> {
    (0..count).map(|_| sim.step().unwrap()).collect()
}

#[test]
fn resumed_autopilot_run_matches_uninterrupted_run() {
    let config = config();
    let mut original = Simulation::new(&config).unwrap();
    run_simulation(&mut original, 60, 0, &mut NoOpCallback).unwrap();

    let bytes = write_snapshot(&original, Vec::new()).unwrap();
    let mut resumed = read_snapshot(bytes.as_slice(), config.autopilot).unwrap();

    assert_eq!(resumed.tick(), 60);
    assert_eq!(resumed.pufferfish().cell(), original.pufferfish().cell());
    assert_eq!(resumed.pufferfish().heading(), original.pufferfish().heading());
    assert_eq!(
        resumed.pufferfish().metamorphs().len(),
        original.pufferfish().metamorphs().len()
    );
    assert_eq!(resumed.pufferfish().autopilot(), original.pufferfish().autopilot());

    let expected = next_ticks(&mut original, 40);
    let actual = next_ticks(&mut resumed, 40);
    assert_eq!(actual, expected);
    assert_eq!(resumed.grid().snapshot(), original.grid().snapshot());
}

#[test]
fn resumed_metamorph_run_continues_the_random_stream() {
    let config = config();
    let mut original = Simulation::new(&config).unwrap();
    run_simulation(&mut original, 200, 0, &mut NoOpCallback).unwrap();
    assert!(!original.pufferfish().metamorphs().is_empty());
    original.pufferfish_mut().set_driver(DriverKind::MetamorphDb);
    run_simulation(&mut original, 20, 0, &mut NoOpCallback).unwrap();

    let bytes = write_snapshot(&original, Vec::new()).unwrap();
    let mut resumed = read_snapshot(bytes.as_slice(), config.autopilot).unwrap();
    assert_eq!(resumed.pufferfish().driver_kind(), DriverKind::MetamorphDb);
    assert_eq!(resumed.rng_position(), original.rng_position());

    let expected = next_ticks(&mut original, 60);
    let actual = next_ticks(&mut resumed, 60);
    assert_eq!(actual, expected);
    assert_eq!(resumed.rng_position(), original.rng_position());
    assert_eq!(resumed.grid().snapshot(), original.grid().snapshot());
}

#[test]
fn resumed_run_restores_the_checkpoint() {
    let config = config();
    let mut sim = Simulation::new(&config).unwrap();
    let initial = sim.grid().snapshot();
    run_simulation(&mut sim, 30, 0, &mut NoOpCallback).unwrap();

    let bytes = write_snapshot(&sim, Vec::new()).unwrap();
    let mut resumed = read_snapshot(bytes.as_slice(), AutopilotConfig::default()).unwrap();
    resumed.reset();

    assert_eq!(resumed.tick(), 0);
    assert_eq!(resumed.pufferfish().cell(), resumed.pufferfish().reset_cell());
    assert_eq!(
        resumed.grid().read(|g| g.cells().to_vec()),
        initial.cells().to_vec()
    );
    assert_eq!(
        resumed.pufferfish().metamorphs().len(),
        sim.pufferfish().metamorphs().len()
    );
}

#[test]
fn snapshot_file_round_trip() {
    let path = std::env::temp_dir().join(format!("pufferfish-snapshot-{}.txt", std::process::id()));
    let config = config();
    let mut sim = Simulation::new(&config).unwrap();
    run_simulation(&mut sim, 10, 0, &mut NoOpCallback).unwrap();

    let store = SnapshotStore::new(&path);
    store.save(&sim).unwrap();
    let loaded = store.load(config.autopilot).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.tick(), 10);
    assert_eq!(loaded.seed(), sim.seed());
    assert_eq!(loaded.pufferfish().events().len(), sim.pufferfish().events().len());
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("pufferfish-snapshot-does-not-exist.txt");
    let err = SnapshotStore::new(&path)
        .load(AutopilotConfig::default())
        .unwrap_err();
    assert!(matches!(err, pufferfish_db::SnapshotError::Io(_)));
}
