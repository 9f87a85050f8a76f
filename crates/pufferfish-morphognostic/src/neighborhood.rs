//! Neighborhood levels and their sectors.

use std::ops::Range;

use pufferfish_types::Orientation;
use serde::{Deserialize, Serialize};

/// One spatial cell of a neighborhood level.
///
/// Holds one density histogram per event channel. A histogram sums to one
/// when its channel saw at least one event in the level's time window, and
/// is all zeros otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    type_densities: Vec<Vec<f32>>,
}

impl Sector {
    /// Create a sector with zeroed histograms sized by `num_event_types`.
    pub fn new(num_event_types: &[usize]) -> Self {
        Self {
            type_densities: num_event_types.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Number of event channels.
    pub fn channels(&self) -> usize {
        self.type_densities.len()
    }

    /// Histogram for one channel. Empty if the channel does not exist.
    pub fn densities(&self, channel: usize) -> &[f32] {
        self.type_densities.get(channel).map_or(&[], Vec::as_slice)
    }

    /// Density of one event type on one channel.
    pub fn density(&self, channel: usize, event_type: usize) -> f32 {
        self.densities(channel)
            .get(event_type)
            .copied()
            .unwrap_or_default()
    }

    /// All histograms, channel by channel.
    pub fn histograms(&self) -> impl Iterator<Item = &[f32]> {
        self.type_densities.iter().map(Vec::as_slice)
    }

    /// Replace one channel's histogram from raw counts.
    ///
    /// Counts are divided by their total; an all-zero count vector leaves
    /// the histogram zeroed.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn set_from_counts(&mut self, channel: usize, counts: &[u32]) {
        let Some(histogram) = self.type_densities.get_mut(channel) else {
            return;
        };
        let total: u32 = counts.iter().sum();
        for (slot, &count) in histogram.iter_mut().zip(counts) {
            *slot = if total == 0 {
                0.0
            } else {
                count as f32 / total as f32
            };
        }
    }

    pub(crate) fn histograms_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.type_densities.iter_mut()
    }

    pub(crate) fn clear(&mut self) {
        for histogram in &mut self.type_densities {
            histogram.fill(0.0);
        }
    }

    /// L1 distance to another sector, or `None` on shape mismatch.
    pub(crate) fn distance(&self, other: &Self) -> Option<f32> {
        if self.type_densities.len() != other.type_densities.len() {
            return None;
        }
        let mut sum = 0.0_f32;
        for (a, b) in self.type_densities.iter().zip(&other.type_densities) {
            if a.len() != b.len() {
                return None;
            }
            sum += a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>();
        }
        Some(sum)
    }
}

/// One scale level of a morphognostic.
///
/// A `dimension x dimension` square of sectors centered on the agent,
/// summarizing events whose age falls in `[epoch, epoch + duration)`.
/// Each sector is a `sector_dimension` square of cells; sector `(x, y)` is
/// centered on the cell offset
/// `((x - dimension/2) * sector_dimension, (y - dimension/2) * sector_dimension)`
/// from the agent, in grid orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    dimension: usize,
    sector_dimension: usize,
    epoch: usize,
    duration: usize,
    sectors: Vec<Sector>,
}

impl Neighborhood {
    /// Create a level with zeroed sectors.
    pub fn new(
        dimension: usize,
        sector_dimension: usize,
        epoch: usize,
        duration: usize,
        num_event_types: &[usize],
    ) -> Self {
        let count = dimension.saturating_mul(dimension);
        Self {
            dimension,
            sector_dimension: sector_dimension.max(1),
            epoch,
            duration,
            sectors: vec![Sector::new(num_event_types); count],
        }
    }

    /// Side length in sectors.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Side length of one sector, in cells.
    pub const fn sector_dimension(&self) -> usize {
        self.sector_dimension
    }

    /// Youngest event age covered.
    pub const fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of ages covered.
    pub const fn duration(&self) -> usize {
        self.duration
    }

    /// Ages covered, `epoch..epoch + duration`.
    pub const fn ages(&self) -> Range<usize> {
        self.epoch..self.epoch.saturating_add(self.duration)
    }

    /// Sector at `(x, y)`.
    pub fn sector(&self, x: usize, y: usize) -> Option<&Sector> {
        self.sector_index(x, y).and_then(|i| self.sectors.get(i))
    }

    /// Sectors in `x`-outer, `y`-inner order.
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Cell offsets from the agent covered by sector `(x, y)`, as an `x`
    /// range and a `y` range.
    pub fn sector_span(&self, x: usize, y: usize) -> (Range<i64>, Range<i64>) {
        let side = signed(self.sector_dimension);
        let half_side = side / 2;
        let half = signed(self.dimension / 2);
        let axis = |index: usize| {
            let start = signed(index)
                .saturating_sub(half)
                .saturating_mul(side)
                .saturating_sub(half_side);
            start..start.saturating_add(side)
        };
        (axis(x), axis(y))
    }

    pub(crate) fn sector_mut(&mut self, x: usize, y: usize) -> Option<&mut Sector> {
        self.sector_index(x, y).and_then(|i| self.sectors.get_mut(i))
    }

    pub(crate) fn sectors_mut(&mut self) -> &mut [Sector] {
        &mut self.sectors
    }

    /// Where sector `(x, y)` of a descriptor lands after rotating it by
    /// `rotation` (a quarter turn clockwise per step from north).
    pub const fn rotate_index(&self, x: usize, y: usize, rotation: Orientation) -> (usize, usize) {
        let last = self.dimension.saturating_sub(1);
        match rotation {
            Orientation::North => (x, y),
            Orientation::East => (y, last.saturating_sub(x)),
            Orientation::South => (last.saturating_sub(x), last.saturating_sub(y)),
            Orientation::West => (last.saturating_sub(y), x),
        }
    }

    fn sector_index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.dimension || y >= self.dimension {
            return None;
        }
        x.checked_mul(self.dimension)?.checked_add(y)
    }
}

fn signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
