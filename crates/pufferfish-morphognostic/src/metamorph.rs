//! Metamorphs and the deduplicating store that holds them.
//!
//! The store only grows. A new (descriptor, response) pair is kept only when
//! no stored descriptor lies within the equivalence tolerance under any of
//! the four rotations, so its size tracks the number of distinct contexts
//! the agent has met rather than the length of the run.

use std::cmp::Ordering;
use std::io::{BufRead, Write};

use pufferfish_types::{RecordReader, RecordWriter, Response};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MorphError;
use crate::morphognostic::Morphognostic;

/// A learned association between a context and a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metamorph {
    /// Frozen descriptor snapshot.
    pub morphognostic: Morphognostic,
    /// Response taken in that context.
    pub response: Response,
}

impl Metamorph {
    /// Pair a descriptor snapshot with a response.
    pub const fn new(morphognostic: Morphognostic, response: Response) -> Self {
        Self {
            morphognostic,
            response,
        }
    }

    fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), MorphError> {
        self.morphognostic.save(writer)?;
        writer.put(self.response.code())?;
        Ok(())
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>) -> Result<Self, MorphError> {
        let morphognostic = Morphognostic::load(reader)?;
        let code: u8 = reader.take("response")?;
        let response = Response::from_code(code)
            .ok_or_else(|| reader.invalid("response", format!("unknown response code {code}")))?;
        Ok(Self::new(morphognostic, response))
    }
}

/// Append-only, rotation-aware deduplicated metamorph collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetamorphStore {
    entries: Vec<Metamorph>,
    equivalent_distance: f32,
}

impl MetamorphStore {
    /// Create an empty store. Two descriptors within `equivalent_distance`
    /// of each other (under some rotation) are treated as the same context.
    pub fn new(equivalent_distance: f32) -> Result<Self, MorphError> {
        if !equivalent_distance.is_finite() || equivalent_distance < 0.0 {
            return Err(MorphError::InvalidTolerance {
                value: equivalent_distance,
            });
        }
        Ok(Self {
            entries: Vec::new(),
            equivalent_distance,
        })
    }

    /// Equivalence tolerance.
    pub const fn equivalent_distance(&self) -> f32 {
        self.equivalent_distance
    }

    /// Number of stored metamorphs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored metamorphs in insertion order.
    pub fn entries(&self) -> &[Metamorph] {
        &self.entries
    }

    /// Forget everything learned.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_novel(&self, descriptor: &Morphognostic) -> bool {
        let tolerance = self.equivalent_distance;
        !self
            .entries
            .iter()
            .any(|m| descriptor.min_rotated_distance_within(&m.morphognostic, tolerance) <= tolerance)
    }

    /// Store a snapshot of `descriptor` with `response` unless an equivalent
    /// context is already known. The response plays no part in the check.
    ///
    /// Returns `true` if the pair was inserted.
    pub fn insert_if_novel(&mut self, descriptor: &Morphognostic, response: Response) -> bool {
        if !self.is_novel(descriptor) {
            return false;
        }
        self.entries.push(Metamorph::new(descriptor.clone(), response));
        debug!(count = self.entries.len(), response = %response, "new metamorph");
        true
    }

    /// The stored metamorph closest to `descriptor` and its distance.
    ///
    /// Exact ties are settled by reservoir sampling: the `k`-th entry tied
    /// at the best distance replaces the winner with probability `1/k`, so
    /// every tied entry is equally likely.
    pub fn nearest<R: Rng + ?Sized>(
        &self,
        descriptor: &Morphognostic,
        rng: &mut R,
    ) -> Option<(&Metamorph, f32)> {
        let mut best: Option<(&Metamorph, f32)> = None;
        let mut ties: u32 = 0;
        for metamorph in &self.entries {
            let bound = best.map_or(f32::INFINITY, |(_, d)| d);
            let distance = descriptor.min_rotated_distance_within(&metamorph.morphognostic, bound);
            let replace = match best {
                None => {
                    ties = 1;
                    true
                }
                Some((_, current)) => match distance.total_cmp(&current) {
                    Ordering::Less => {
                        ties = 1;
                        true
                    }
                    Ordering::Equal => {
                        ties = ties.saturating_add(1);
                        rng.random_ratio(1, ties)
                    }
                    Ordering::Greater => false,
                },
            };
            if replace {
                best = Some((metamorph, distance));
            }
        }
        best
    }

    /// Response of the nearest metamorph, or [`Response::Wait`] when empty.
    pub fn nearest_response<R: Rng + ?Sized>(&self, descriptor: &Morphognostic, rng: &mut R) -> Response {
        self.nearest(descriptor, rng)
            .map_or(Response::Wait, |(m, _)| m.response)
    }

    /// Append a metamorph without the novelty check, as when loading.
    pub fn push(&mut self, metamorph: Metamorph) {
        self.entries.push(metamorph);
    }

    /// Write the tolerance, the count, and every metamorph.
    pub fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), MorphError> {
        writer.put(self.equivalent_distance)?;
        writer.put(self.entries.len())?;
        for metamorph in &self.entries {
            metamorph.save(writer)?;
        }
        Ok(())
    }

    /// Read a store written by [`save`](Self::save).
    pub fn load<R: BufRead>(reader: &mut RecordReader<R>) -> Result<Self, MorphError> {
        let mut store = Self::new(reader.take("equivalent distance")?)?;
        let count: usize = reader.take("metamorph count")?;
        store.entries.reserve(count);
        for _ in 0..count {
            store.entries.push(Metamorph::load(reader)?);
        }
        Ok(store)
    }
}
