//! Spoke path generation for the autopilot.
//!
//! A spoke is a 4-connected line of cells from the home cell outward along
//! a fixed angle. Offsets are relative to home, with `+y` north.

use pufferfish_types::Response;

use crate::config::AutopilotConfig;

/// Angle of spoke 0, in degrees. Spoke 0 points due north.
const BASE_ANGLE_DEG: f64 = 90.0;

/// Parameter step along the ray. Half a cell keeps consecutive rounded
/// points at most one cell apart on each axis.
const RAY_STEP: f64 = 0.5;

/// One outbound path and the terrain edits due at its tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokePath {
    /// Offsets from home, starting at `(0, 0)`.
    pub cells: Vec<(i64, i64)>,
    /// Edit due on arrival at the cell with the same index, if any.
    pub marks: Vec<Option<Response>>,
}

impl SpokePath {
    /// Index of the outermost cell.
    pub fn tip(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }
}

/// Generate the path for spoke `spoke` of `config.num_spokes`.
///
/// The path starts at home, steps one cell at a time (a diagonal move is
/// split into an x step then a y step), and stops at the first cell whose
/// Euclidean distance from home reaches `center_radius + spoke_length`.
/// The last `spoke_ripple_length / 2` cells are marked alternately
/// [`Response::Raise`] and [`Response::Lower`], starting with a raise.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn spoke_path(spoke: usize, config: &AutopilotConfig) -> SpokePath {
    let spokes = config.num_spokes.max(1);
    let radius = config.center_radius.saturating_add(config.spoke_length) as f64;
    let angle = (BASE_ANGLE_DEG + spoke as f64 * 360.0 / spokes as f64).to_radians();
    let (sin, cos) = angle.sin_cos();

    let mut cells = vec![(0_i64, 0_i64)];
    let mut t = 0.0_f64;
    // Every half-step advances at least one axis within a few iterations;
    // the bound only guards against a degenerate radius.
    let max_steps = ((radius / RAY_STEP).ceil() as usize)
        .saturating_mul(4)
        .saturating_add(4);
    for _ in 0..max_steps {
        let Some(&last) = cells.last() else { break };
        if distance(last) >= radius {
            break;
        }
        t += RAY_STEP;
        let next = ((t * cos).round() as i64, (t * sin).round() as i64);
        if next == last {
            continue;
        }
        if next.0 != last.0 && next.1 != last.1 {
            cells.push((next.0, last.1));
        }
        cells.push(next);
    }

    let ripple = (config.spoke_ripple_length / 2).min(cells.len().saturating_sub(1));
    let first_marked = cells.len().saturating_sub(ripple);
    let marks = (0..cells.len())
        .map(|i| {
            i.checked_sub(first_marked).map(|k| {
                if k % 2 == 0 {
                    Response::Raise
                } else {
                    Response::Lower
                }
            })
        })
        .collect();

    SpokePath { cells, marks }
}

#[allow(clippy::cast_precision_loss)]
fn distance((x, y): (i64, i64)) -> f64 {
    (x as f64).hypot(y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spoke_zero_points_north() {
        let path = spoke_path(0, &AutopilotConfig::default());
        let expected: Vec<(i64, i64)> = (0..=6).map(|y| (0, y)).collect();
        assert_eq!(path.cells, expected);
    }

    #[test]
    fn distance_never_decreases_and_reaches_radius() {
        let config = AutopilotConfig::default();
        let limit = (config.center_radius + config.spoke_length) as f64;
        for spoke in 0..config.num_spokes {
            let path = spoke_path(spoke, &config);
            let distances: Vec<f64> = path.cells.iter().map(|&c| distance(c)).collect();
            assert!(distances.windows(2).all(|w| w[1] >= w[0]), "spoke {spoke}");
            assert!(distances.last().copied().unwrap_or(0.0) >= limit, "spoke {spoke}");
        }
    }

    #[test]
    fn consecutive_cells_are_adjacent() {
        let config = AutopilotConfig::default();
        for spoke in 0..config.num_spokes {
            let path = spoke_path(spoke, &config);
            for w in path.cells.windows(2) {
                let step = (w[1].0 - w[0].0).abs() + (w[1].1 - w[0].1).abs();
                assert_eq!(step, 1, "spoke {spoke}: {:?} -> {:?}", w[0], w[1]);
            }
        }
    }

    #[test]
    fn tip_is_rippled() {
        let path = spoke_path(0, &AutopilotConfig::default());
        assert_eq!(path.tip(), 6);
        assert_eq!(path.marks[5], Some(Response::Raise));
        assert_eq!(path.marks[6], Some(Response::Lower));
        assert!(path.marks[..5].iter().all(Option::is_none));
    }

    #[test]
    fn opposite_spoke_points_south() {
        let config = AutopilotConfig::default();
        let path = spoke_path(config.num_spokes / 2, &config);
        assert_eq!(path.cells.last(), Some(&(0, -6)));
    }
}
