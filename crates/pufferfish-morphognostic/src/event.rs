//! Sensor events and the rolling window they are kept in.
//!
//! Every tick the agent records one [`Event`]: the value on each channel,
//! where it stood, and when. [`EventHistory`] keeps events no older than the
//! descriptor's maximum event age, and [`EventTensor`] lays the live window
//! out densely by cell, channel, and age for the descriptor update.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use pufferfish_types::{Cell, RecordReader, RecordWriter};
use serde::{Deserialize, Serialize};

use crate::error::MorphError;

/// One tick's observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Value on each channel, in channel order.
    pub values: Vec<u32>,
    /// Where the agent stood.
    pub cell: Cell,
    /// Tick at which the event was recorded.
    pub time: u64,
}

impl Event {
    /// Create an event.
    pub const fn new(values: Vec<u32>, cell: Cell, time: u64) -> Self {
        Self { values, cell, time }
    }
}

/// FIFO of recent events bounded by age.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventHistory {
    events: VecDeque<Event>,
    max_event_age: usize,
}

impl EventHistory {
    /// Create an empty history retaining events up to `max_event_age` ticks old.
    pub const fn new(max_event_age: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_event_age,
        }
    }

    /// Oldest age an event may reach before eviction.
    pub const fn max_event_age(&self) -> usize {
        self.max_event_age
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Append an event and evict everything older than the age bound,
    /// measured from the new event's time.
    pub fn push(&mut self, event: Event) {
        let now = event.time;
        self.events.push_back(event);
        while let Some(front) = self.events.front() {
            if age_of(front.time, now) > self.max_event_age {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Lay the window out densely for a `width x height` grid at time `now`.
    pub fn tensor(&self, width: usize, height: usize, channels: usize, now: u64) -> EventTensor {
        let mut tensor = EventTensor::new(width, height, channels, self.max_event_age);
        for event in &self.events {
            let age = age_of(event.time, now);
            for (channel, &value) in event.values.iter().enumerate().take(channels) {
                tensor.set(event.cell, channel, age, value);
            }
        }
        tensor
    }

    /// Write the age bound and every retained event.
    pub fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), MorphError> {
        writer.put(self.max_event_age)?;
        writer.put(self.events.len())?;
        for event in &self.events {
            writer.put(event.time)?;
            writer.put(event.cell.x)?;
            writer.put(event.cell.y)?;
            writer.put(event.values.len())?;
            writer.put_all(&event.values)?;
        }
        Ok(())
    }

    /// Read a history written by [`save`](Self::save).
    pub fn load<R: BufRead>(reader: &mut RecordReader<R>) -> Result<Self, MorphError> {
        let mut history = Self::new(reader.take("max event age")?);
        let count: usize = reader.take("event count")?;
        for _ in 0..count {
            let time = reader.take("event time")?;
            let x = reader.take("event x")?;
            let y = reader.take("event y")?;
            let len = reader.take("event value count")?;
            let values = reader.take_vec("event value", len)?;
            history.events.push_back(Event::new(values, Cell::new(x, y), time));
        }
        Ok(history)
    }
}

fn age_of(time: u64, now: u64) -> usize {
    usize::try_from(now.saturating_sub(time)).unwrap_or(usize::MAX)
}

/// Dense `cell x channel x age` view of the event window.
///
/// Entries with no event are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTensor {
    width: usize,
    height: usize,
    channels: usize,
    ages: usize,
    values: Vec<Option<u32>>,
}

impl EventTensor {
    /// Create an empty tensor covering ages `0..=max_event_age`.
    pub fn new(width: usize, height: usize, channels: usize, max_event_age: usize) -> Self {
        let ages = max_event_age.saturating_add(1);
        let len = width
            .saturating_mul(height)
            .saturating_mul(channels)
            .saturating_mul(ages);
        Self {
            width,
            height,
            channels,
            ages,
            values: vec![None; len],
        }
    }

    /// Number of age slots (`max_event_age + 1`).
    pub const fn ages(&self) -> usize {
        self.ages
    }

    /// Number of channels.
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Value at a wrapped coordinate, channel, and age.
    pub fn get(&self, x: i64, y: i64, channel: usize, age: usize) -> Option<u32> {
        let cell = Cell::new(wrap(x, self.width), wrap(y, self.height));
        self.index(cell, channel, age)
            .and_then(|i| self.values.get(i).copied().flatten())
    }

    /// Record a value. Out-of-range channel or age is ignored.
    pub fn set(&mut self, cell: Cell, channel: usize, age: usize, value: u32) {
        if let Some(slot) = self
            .index(cell, channel, age)
            .and_then(|i| self.values.get_mut(i))
        {
            *slot = Some(value);
        }
    }

    fn index(&self, cell: Cell, channel: usize, age: usize) -> Option<usize> {
        if cell.x >= self.width || cell.y >= self.height || channel >= self.channels || age >= self.ages {
            return None;
        }
        let spatial = cell.x.checked_mul(self.height)?.checked_add(cell.y)?;
        spatial
            .checked_mul(self.channels)?
            .checked_add(channel)?
            .checked_mul(self.ages)?
            .checked_add(age)
    }
}

fn wrap(value: i64, size: usize) -> usize {
    let size = i64::try_from(size).unwrap_or(i64::MAX).max(1);
    usize::try_from(value.rem_euclid(size)).unwrap_or(0)
}
