//! The morphognostic descriptor.
//!
//! Level 0 covers an `initial_dimension` square of single-cell sectors over
//! the most recent `epoch_interval_stride` ticks. Each further level grows
//! both ways, and its sectors are squares whose side is the previous
//! level's dimension:
//!
//! ```text
//! dimension_i = dimension_{i-1} * dimension_multiplier + dimension_stride
//! sector_i    = dimension_{i-1}                      (sector_0 = 1)
//! epoch_i     = epoch_{i-1} + duration_{i-1}
//! duration_i  = duration_{i-1} * epoch_interval_multiplier + epoch_interval_stride
//! ```
//!
//! so the stack looks farther out and further back at coarser resolution.
//! The oldest age any level reads, `epoch_last + duration_last - 1`, bounds
//! how long events stay in the history.

use std::io::{BufRead, Write};

use pufferfish_types::{Cell, Orientation, RecordReader, RecordWriter};
use serde::{Deserialize, Serialize};

use crate::error::MorphError;
use crate::event::EventTensor;
use crate::neighborhood::Neighborhood;

/// Shape parameters of a morphognostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphognosticParams {
    /// Number of levels.
    #[serde(default = "default_num_neighborhoods")]
    pub num_neighborhoods: usize,
    /// Side of level 0, odd and at least 3.
    #[serde(default = "default_initial_dimension")]
    pub initial_dimension: usize,
    /// Added to the side at each level.
    #[serde(default = "default_dimension_stride")]
    pub dimension_stride: usize,
    /// Multiplies the side at each level.
    #[serde(default = "default_dimension_multiplier")]
    pub dimension_multiplier: usize,
    /// Added to the time window at each level; also level 0's window.
    #[serde(default = "default_epoch_interval_stride")]
    pub epoch_interval_stride: usize,
    /// Multiplies the time window at each level.
    #[serde(default = "default_epoch_interval_multiplier")]
    pub epoch_interval_multiplier: usize,
}

impl Default for MorphognosticParams {
    fn default() -> Self {
        Self {
            num_neighborhoods: default_num_neighborhoods(),
            initial_dimension: default_initial_dimension(),
            dimension_stride: default_dimension_stride(),
            dimension_multiplier: default_dimension_multiplier(),
            epoch_interval_stride: default_epoch_interval_stride(),
            epoch_interval_multiplier: default_epoch_interval_multiplier(),
        }
    }
}

const fn default_num_neighborhoods() -> usize {
    3
}

const fn default_initial_dimension() -> usize {
    3
}

const fn default_dimension_stride() -> usize {
    2
}

const fn default_dimension_multiplier() -> usize {
    1
}

const fn default_epoch_interval_stride() -> usize {
    1
}

const fn default_epoch_interval_multiplier() -> usize {
    1
}

/// Derived shape of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelShape {
    /// Side length in sectors.
    pub dimension: usize,
    /// Side length of one sector, in cells.
    pub sector_dimension: usize,
    /// Youngest age covered.
    pub epoch: usize,
    /// Number of ages covered.
    pub duration: usize,
}

impl MorphognosticParams {
    /// Check the parameters and derive every level's shape.
    pub fn levels(&self) -> Result<Vec<LevelShape>, MorphError> {
        if self.num_neighborhoods == 0 {
            return Err(invalid("at least one neighborhood is required"));
        }
        if self.initial_dimension < 3 || self.initial_dimension % 2 == 0 {
            return Err(invalid(format!(
                "initial dimension must be odd and at least 3, got {}",
                self.initial_dimension
            )));
        }
        if self.epoch_interval_stride == 0 {
            return Err(invalid("epoch interval stride must be at least 1"));
        }

        let mut levels = Vec::with_capacity(self.num_neighborhoods);
        let mut shape = LevelShape {
            dimension: self.initial_dimension,
            sector_dimension: 1,
            epoch: 0,
            duration: self.epoch_interval_stride,
        };
        levels.push(shape);
        for level in 1..self.num_neighborhoods {
            let dimension = shape
                .dimension
                .checked_mul(self.dimension_multiplier)
                .and_then(|d| d.checked_add(self.dimension_stride))
                .ok_or_else(|| invalid("neighborhood dimension overflows"))?;
            if dimension <= shape.dimension {
                return Err(invalid(format!(
                    "dimension must grow with level, level {level} has {dimension} after {}",
                    shape.dimension
                )));
            }
            if dimension % 2 == 0 {
                return Err(invalid(format!(
                    "dimension must stay odd, level {level} has {dimension}"
                )));
            }
            let epoch = shape
                .epoch
                .checked_add(shape.duration)
                .ok_or_else(|| invalid("epoch overflows"))?;
            let duration = shape
                .duration
                .checked_mul(self.epoch_interval_multiplier)
                .and_then(|d| d.checked_add(self.epoch_interval_stride))
                .ok_or_else(|| invalid("epoch duration overflows"))?;
            shape = LevelShape {
                dimension,
                sector_dimension: shape.dimension,
                epoch,
                duration,
            };
            levels.push(shape);
        }
        Ok(levels)
    }

    /// Check the parameters without keeping the derived shapes.
    pub fn validate(&self) -> Result<(), MorphError> {
        self.levels().map(|_| ())
    }

    /// Oldest event age read by the top level.
    pub fn max_event_age(&self) -> Result<usize, MorphError> {
        let levels = self.levels()?;
        let top = levels.last().ok_or_else(|| invalid("no levels"))?;
        Ok(top
            .epoch
            .saturating_add(top.duration)
            .saturating_sub(1))
    }

    fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), MorphError> {
        writer.put(self.num_neighborhoods)?;
        writer.put(self.initial_dimension)?;
        writer.put(self.dimension_stride)?;
        writer.put(self.dimension_multiplier)?;
        writer.put(self.epoch_interval_stride)?;
        writer.put(self.epoch_interval_multiplier)?;
        Ok(())
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>) -> Result<Self, MorphError> {
        Ok(Self {
            num_neighborhoods: reader.take("num neighborhoods")?,
            initial_dimension: reader.take("initial dimension")?,
            dimension_stride: reader.take("dimension stride")?,
            dimension_multiplier: reader.take("dimension multiplier")?,
            epoch_interval_stride: reader.take("epoch interval stride")?,
            epoch_interval_multiplier: reader.take("epoch interval multiplier")?,
        })
    }
}

fn invalid(reason: impl Into<String>) -> MorphError {
    MorphError::InvalidParams {
        reason: reason.into(),
    }
}

/// A multi-scale event-density descriptor.
///
/// `Clone` is a deep copy; metamorphs keep clones so the live descriptor
/// can keep changing underneath them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Morphognostic {
    params: MorphognosticParams,
    num_event_types: Vec<usize>,
    neighborhoods: Vec<Neighborhood>,
}

impl Morphognostic {
    /// Build a zeroed descriptor. `num_event_types[d]` is the alphabet size
    /// of event channel `d`.
    pub fn new(params: MorphognosticParams, num_event_types: Vec<usize>) -> Result<Self, MorphError> {
        if num_event_types.is_empty() {
            return Err(invalid("at least one event channel is required"));
        }
        if num_event_types.contains(&0) {
            return Err(invalid("every event channel needs at least one type"));
        }
        let neighborhoods = params
            .levels()?
            .into_iter()
            .map(|shape| {
                Neighborhood::new(
                    shape.dimension,
                    shape.sector_dimension,
                    shape.epoch,
                    shape.duration,
                    &num_event_types,
                )
            })
            .collect();
        Ok(Self {
            params,
            num_event_types,
            neighborhoods,
        })
    }

    /// Shape parameters.
    pub const fn params(&self) -> &MorphognosticParams {
        &self.params
    }

    /// Number of parallel event channels.
    pub fn event_dimensions(&self) -> usize {
        self.num_event_types.len()
    }

    /// Alphabet size of each channel.
    pub fn num_event_types(&self) -> &[usize] {
        &self.num_event_types
    }

    /// Levels, innermost first.
    pub fn neighborhoods(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    /// Oldest event age read by any level.
    pub fn max_event_age(&self) -> usize {
        self.neighborhoods
            .last()
            .map_or(0, |n| n.epoch().saturating_add(n.duration()).saturating_sub(1))
    }

    /// Zero every density.
    pub fn clear(&mut self) {
        for neighborhood in &mut self.neighborhoods {
            for sector in neighborhood.sectors_mut() {
                sector.clear();
            }
        }
    }

    /// Recompute every sector from the event window around `center`.
    ///
    /// A sector counts every cell of its sub-grid at every age in its
    /// level's window. Missing entries and values outside a channel's
    /// alphabet do not count toward that sector's total.
    pub fn update(&mut self, events: &EventTensor, center: Cell) {
        let cx = i64::try_from(center.x).unwrap_or(i64::MAX);
        let cy = i64::try_from(center.y).unwrap_or(i64::MAX);
        let num_event_types = &self.num_event_types;
        let max_types = num_event_types.iter().copied().max().unwrap_or(0);
        let mut counts = vec![0_u32; max_types];

        for neighborhood in &mut self.neighborhoods {
            let dimension = neighborhood.dimension();
            let ages = neighborhood.ages();
            for sx in 0..dimension {
                for sy in 0..dimension {
                    let (xs, ys) = neighborhood.sector_span(sx, sy);
                    let Some(sector) = neighborhood.sector_mut(sx, sy) else {
                        continue;
                    };
                    for (channel, &types) in num_event_types.iter().enumerate() {
                        let Some(counts) = counts.get_mut(..types) else {
                            continue;
                        };
                        counts.fill(0);
                        for dx in xs.clone() {
                            let x = cx.saturating_add(dx);
                            for dy in ys.clone() {
                                let y = cy.saturating_add(dy);
                                for age in ages.clone() {
                                    if let Some(value) = events.get(x, y, channel, age)
                                        && let Some(count) = usize::try_from(value)
                                            .ok()
                                            .and_then(|v| counts.get_mut(v))
                                    {
                                        *count = count.saturating_add(1);
                                    }
                                }
                            }
                        }
                        sector.set_from_counts(channel, counts);
                    }
                }
            }
        }
    }

    /// Orientation-naive L1 distance. Infinite if the shapes differ.
    pub fn compare(&self, other: &Self) -> f32 {
        compare_rotated(self, other, Orientation::North)
    }

    /// Smallest distance to `other` over the four rotations.
    pub fn min_rotated_distance(&self, other: &Self) -> f32 {
        self.min_rotated_distance_within(other, f32::INFINITY)
    }

    /// Like [`min_rotated_distance`](Self::min_rotated_distance), but
    /// abandons a rotation as soon as its partial sum exceeds `bound`.
    ///
    /// The result is exact whenever it is at most `bound`.
    pub fn min_rotated_distance_within(&self, other: &Self, bound: f32) -> f32 {
        let mut best = f32::INFINITY;
        for rotation in Orientation::ALL {
            let limit = best.min(bound);
            let distance = bounded_distance(self, other, rotation, limit);
            if distance < best {
                best = distance;
            }
        }
        best
    }

    /// Densities in classifier attribute order: level, sector (`x` outer,
    /// `y` inner), channel, type.
    pub fn flatten(&self) -> Vec<f32> {
        let mut features = Vec::with_capacity(self.feature_len());
        for neighborhood in &self.neighborhoods {
            for sector in neighborhood.sectors() {
                for histogram in sector.histograms() {
                    features.extend_from_slice(histogram);
                }
            }
        }
        features
    }

    /// Length of [`flatten`](Self::flatten)'s output.
    pub fn feature_len(&self) -> usize {
        let per_sector: usize = self.num_event_types.iter().sum();
        self.neighborhoods
            .iter()
            .map(|n| n.sectors().len().saturating_mul(per_sector))
            .sum()
    }

    /// Write parameters, channel alphabet sizes, then every density.
    pub fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), MorphError> {
        self.params.save(writer)?;
        writer.put(self.num_event_types.len())?;
        writer.put_all(&self.num_event_types)?;
        for neighborhood in &self.neighborhoods {
            for sector in neighborhood.sectors() {
                for histogram in sector.histograms() {
                    writer.put_all(histogram)?;
                }
            }
        }
        Ok(())
    }

    /// Read a descriptor written by [`save`](Self::save).
    pub fn load<R: BufRead>(reader: &mut RecordReader<R>) -> Result<Self, MorphError> {
        let params = MorphognosticParams::load(reader)?;
        let channels: usize = reader.take("event dimensions")?;
        let num_event_types = reader.take_vec("num event types", channels)?;
        let mut descriptor = Self::new(params, num_event_types)?;
        for neighborhood in &mut descriptor.neighborhoods {
            for sector in neighborhood.sectors_mut() {
                for histogram in sector.histograms_mut() {
                    for slot in histogram.iter_mut() {
                        *slot = reader.take("density")?;
                    }
                }
            }
        }
        Ok(descriptor)
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.params == other.params && self.num_event_types == other.num_event_types
    }
}

/// Distance between `a` and `b` with `b`'s sectors rotated by `rotation`.
///
/// Rotation is a quarter turn clockwise per step from north, so
/// `compare_rotated(a, b, North)` is the plain sector-by-sector L1 sum.
/// Infinite if the shapes differ.
pub fn compare_rotated(a: &Morphognostic, b: &Morphognostic, rotation: Orientation) -> f32 {
    bounded_distance(a, b, rotation, f32::INFINITY)
}

fn bounded_distance(a: &Morphognostic, b: &Morphognostic, rotation: Orientation, bound: f32) -> f32 {
    if !a.same_shape(b) {
        return f32::INFINITY;
    }
    let mut sum = 0.0_f32;
    for (na, nb) in a.neighborhoods.iter().zip(&b.neighborhoods) {
        let dimension = na.dimension();
        for x in 0..dimension {
            for y in 0..dimension {
                let (rx, ry) = nb.rotate_index(x, y, rotation);
                let distance = na
                    .sector(x, y)
                    .zip(nb.sector(rx, ry))
                    .and_then(|(sa, sb)| sa.distance(sb));
                let Some(distance) = distance else {
                    return f32::INFINITY;
                };
                sum += distance;
            }
            if sum > bound {
                return sum;
            }
        }
    }
    sum
}
