//! The pufferfish agent.
//!
//! Each call to [`Pufferfish::cycle`] records the sensor vector as an event,
//! rebuilds the descriptor from the event window, asks the active driver for
//! a response, and learns the (descriptor, response) pair if the context is
//! new. The caller applies the response to the world and reports the new
//! pose back through [`Pufferfish::set_cell`] and [`Pufferfish::set_heading`].

use std::io::{BufRead, Write};

use pufferfish_morphognostic::{Event, EventHistory, MetamorphStore, MorphError, Morphognostic};
use pufferfish_types::{
    Cell, DriverKind, NUM_RESPONSES, Orientation, RecordReader, RecordWriter, Response,
};
use pufferfish_world::{NUM_SENSORS, wrapped_axis_delta};
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::autopilot::Autopilot;
use crate::classifier::{Classifier, ClassifierTrainer, TrainingSample};
use crate::config::{AutopilotConfig, PufferfishConfig};
use crate::driver::{ClassifierDriver, Driver, DriverContext, ManualDriver, MetamorphDbDriver};
use crate::error::AgentError;

/// An agent that senses, learns, and reshapes its nest.
#[derive(Debug)]
pub struct Pufferfish {
    config: PufferfishConfig,
    width: usize,
    height: usize,
    max_elevation: u32,

    cell: Cell,
    heading: Orientation,
    reset_cell: Cell,
    reset_heading: Orientation,

    driver_kind: DriverKind,
    morphognostic: Morphognostic,
    events: EventHistory,
    metamorphs: MetamorphStore,
    event_time: u64,
    last_response: Response,

    autopilot: Autopilot,
    classifier: ClassifierDriver,
    manual: ManualDriver,
}

impl Pufferfish {
    /// Create an agent at `home` on a `width` x `height` grid whose
    /// elevations range over `0..=max_elevation`.
    ///
    /// `home` and `heading` become the reset pose.
    pub fn new(
        config: PufferfishConfig,
        home: Cell,
        heading: Orientation,
        width: usize,
        height: usize,
        max_elevation: u32,
    ) -> Result<Self, AgentError> {
        check_home(home, width, height)?;
        let morphognostic = Morphognostic::new(
            config.morphognostic,
            channel_types(max_elevation, config.include_response_channel),
        )?;
        let events = EventHistory::new(morphognostic.max_event_age());
        let metamorphs = MetamorphStore::new(config.equivalent_distance)?;
        let autopilot = Autopilot::new(config.autopilot, home, width, height);
        info!(
            x = home.x,
            y = home.y,
            channels = morphognostic.event_dimensions(),
            max_event_age = morphognostic.max_event_age(),
            "pufferfish created"
        );
        Ok(Self {
            config,
            width,
            height,
            max_elevation,
            cell: home,
            heading,
            reset_cell: home,
            reset_heading: heading,
            driver_kind: DriverKind::default(),
            morphognostic,
            events,
            metamorphs,
            event_time: 0,
            last_response: Response::Wait,
            autopilot,
            classifier: ClassifierDriver::new(),
            manual: ManualDriver::default(),
        })
    }

    /// Current cell.
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Current heading.
    pub const fn heading(&self) -> Orientation {
        self.heading
    }

    /// Cell restored by [`reset`](Self::reset).
    pub const fn reset_cell(&self) -> Cell {
        self.reset_cell
    }

    /// Heading restored by [`reset`](Self::reset).
    pub const fn reset_heading(&self) -> Orientation {
        self.reset_heading
    }

    /// Move the agent. Coordinates wrap.
    // `check_home` on construction guarantees a nonzero width and height.
    #[allow(clippy::arithmetic_side_effects)]
    pub const fn set_cell(&mut self, cell: Cell) {
        self.cell = Cell::new(cell.x % self.width, cell.y % self.height);
    }

    /// Turn the agent.
    pub const fn set_heading(&mut self, heading: Orientation) {
        self.heading = heading;
    }

    /// Active driver.
    pub const fn driver_kind(&self) -> DriverKind {
        self.driver_kind
    }

    /// Switch drivers. Learned state is kept.
    pub fn set_driver(&mut self, kind: DriverKind) {
        if kind != self.driver_kind {
            info!(from = %self.driver_kind, to = %kind, "driver changed");
        }
        if kind == DriverKind::MetamorphNn && !self.classifier.is_trained() {
            warn!("metamorph_nn driver has no trained classifier, the agent will wait");
        }
        self.driver_kind = kind;
    }

    /// Response the manual driver will return.
    pub const fn manual_response(&self) -> Response {
        self.manual.response()
    }

    /// Inject the response the manual driver returns from now on.
    pub const fn set_manual_response(&mut self, response: Response) {
        self.manual.set_response(response);
    }

    /// The live descriptor.
    pub const fn morphognostic(&self) -> &Morphognostic {
        &self.morphognostic
    }

    /// The event window.
    pub const fn events(&self) -> &EventHistory {
        &self.events
    }

    /// Learned metamorphs.
    pub const fn metamorphs(&self) -> &MetamorphStore {
        &self.metamorphs
    }

    /// Autopilot state.
    pub const fn autopilot(&self) -> &Autopilot {
        &self.autopilot
    }

    /// Number of completed cycles since creation or the last reset.
    pub const fn event_time(&self) -> u64 {
        self.event_time
    }

    /// Response returned by the most recent cycle.
    pub const fn last_response(&self) -> Response {
        self.last_response
    }

    /// Construction parameters.
    pub const fn config(&self) -> &PufferfishConfig {
        &self.config
    }

    /// Run one sense-act cycle.
    ///
    /// `sensors` holds [`NUM_SENSORS`] elevations in sensor order. Invalid
    /// input is rejected before anything is recorded.
    pub fn cycle<R: RngCore>(&mut self, sensors: &[u32], rng: &mut R) -> Result<Response, AgentError> {
        self.check_sensors(sensors)?;

        let mut values = sensors.to_vec();
        if self.config.include_response_channel {
            values.push(u32::from(self.last_response.code()));
        }
        let channels = values.len();
        self.events
            .push(Event::new(values, self.cell, self.event_time));
        let tensor = self
            .events
            .tensor(self.width, self.height, channels, self.event_time);
        self.morphognostic.update(&tensor, self.cell);

        let offset = self.offset_from_home();
        let mut ctx = DriverContext {
            descriptor: &self.morphognostic,
            metamorphs: &self.metamorphs,
            offset,
            heading: self.heading,
            rng,
        };
        let response = match self.driver_kind {
            DriverKind::MetamorphDb => MetamorphDbDriver.decide(&mut ctx),
            DriverKind::MetamorphNn => self.classifier.decide(&mut ctx),
            DriverKind::Autopilot => self.autopilot.decide(&mut ctx),
            DriverKind::Manual => self.manual.decide(&mut ctx),
        };

        self.metamorphs
            .insert_if_novel(&self.morphognostic, response);
        debug!(
            time = self.event_time,
            cell = %self.cell,
            heading = %self.heading,
            response = %response,
            metamorphs = self.metamorphs.len(),
            "cycle"
        );
        self.event_time = self.event_time.saturating_add(1);
        self.last_response = response;
        Ok(response)
    }

    /// Return to the reset pose and forget the event window and descriptor.
    /// Learned metamorphs survive; see [`clear_metamorphs`](Self::clear_metamorphs).
    pub fn reset(&mut self) {
        self.cell = self.reset_cell;
        self.heading = self.reset_heading;
        self.events.clear();
        self.morphognostic.clear();
        self.event_time = 0;
        self.last_response = Response::Wait;
        self.autopilot = Autopilot::new(self.config.autopilot, self.reset_cell, self.width, self.height);
        debug!(cell = %self.cell, "pufferfish reset");
    }

    /// Forget every learned metamorph.
    pub fn clear_metamorphs(&mut self) {
        info!(count = self.metamorphs.len(), "clearing metamorphs");
        self.metamorphs.clear();
    }

    /// One training sample per stored metamorph.
    pub fn training_samples(&self) -> Vec<TrainingSample> {
        self.metamorphs
            .entries()
            .iter()
            .map(|m| TrainingSample {
                features: m.morphognostic.flatten(),
                response: m.response,
            })
            .collect()
    }

    /// Train a classifier on the stored metamorphs and install it for the
    /// metamorph-nn driver.
    pub fn train_classifier(&mut self, trainer: &dyn ClassifierTrainer) -> Result<(), AgentError> {
        let samples = self.training_samples();
        let classifier = trainer.train(&samples)?;
        self.classifier.set_classifier(classifier);
        Ok(())
    }

    /// Install an already trained classifier.
    pub fn set_classifier(&mut self, classifier: Box<dyn Classifier>) {
        self.classifier.set_classifier(classifier);
    }

    /// Whether the metamorph-nn driver has a classifier.
    pub const fn has_classifier(&self) -> bool {
        self.classifier.is_trained()
    }

    /// Write the agent: pose, reset pose, descriptor, event-age bound,
    /// metamorphs, then the resume state (clock, last response, driver,
    /// channel layout, event window, autopilot).
    pub fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), AgentError> {
        writer.put(self.cell.x)?;
        writer.put(self.cell.y)?;
        writer.put(self.heading.code())?;
        writer.put(self.reset_cell.x)?;
        writer.put(self.reset_cell.y)?;
        writer.put(self.reset_heading.code())?;
        self.morphognostic.save(writer)?;
        writer.put(self.events.max_event_age())?;
        self.metamorphs.save(writer)?;

        writer.put(self.event_time)?;
        writer.put(self.last_response.code())?;
        writer.put(self.driver_kind.code())?;
        writer.put(u8::from(self.config.include_response_channel))?;
        self.events.save(writer)?;
        self.autopilot.save(writer)?;
        Ok(())
    }

    /// Read an agent written by [`save`](Self::save) for a grid of the given
    /// shape. Autopilot geometry is not persisted and comes from `autopilot`.
    pub fn load<R: BufRead>(
        reader: &mut RecordReader<R>,
        autopilot: AutopilotConfig,
        width: usize,
        height: usize,
        max_elevation: u32,
    ) -> Result<Self, AgentError> {
        let cell = Cell::new(reader.take("x")?, reader.take("y")?);
        let heading = take_orientation(reader, "orientation")?;
        let reset_cell = Cell::new(reader.take("reset x")?, reader.take("reset y")?);
        let reset_heading = take_orientation(reader, "reset orientation")?;
        check_home(cell, width, height)?;
        check_home(reset_cell, width, height)?;

        let morphognostic = Morphognostic::load(reader)?;
        let max_event_age: usize = reader.take("max event age")?;
        if max_event_age != morphognostic.max_event_age() {
            return Err(reader
                .invalid(
                    "max event age",
                    format!(
                        "{max_event_age} does not match descriptor age {}",
                        morphognostic.max_event_age()
                    ),
                )
                .into());
        }
        let metamorphs = MetamorphStore::load(reader)?;

        let event_time: u64 = reader.take("event time")?;
        let code: u8 = reader.take("last response")?;
        let last_response = Response::from_code(code)
            .ok_or_else(|| reader.invalid("last response", format!("unknown response code {code}")))?;
        let code: u8 = reader.take("driver")?;
        let driver_kind = DriverKind::from_code(code)
            .ok_or_else(|| reader.invalid("driver", format!("unknown driver code {code}")))?;
        let include_response_channel = match reader.take::<u8>("response channel")? {
            0 => false,
            1 => true,
            other => {
                return Err(reader
                    .invalid("response channel", format!("expected 0 or 1, got {other}"))
                    .into());
            }
        };
        let expected = channel_types(max_elevation, include_response_channel);
        if morphognostic.num_event_types() != expected.as_slice() {
            return Err(MorphError::ChannelMismatch {
                expected: expected.len(),
                actual: morphognostic.event_dimensions(),
            }
            .into());
        }
        let events = EventHistory::load(reader)?;
        let autopilot_state = Autopilot::load(reader, autopilot)?;

        let config = PufferfishConfig {
            morphognostic: *morphognostic.params(),
            include_response_channel,
            equivalent_distance: metamorphs.equivalent_distance(),
            autopilot,
        };
        info!(
            x = cell.x,
            y = cell.y,
            metamorphs = metamorphs.len(),
            event_time,
            "pufferfish loaded"
        );
        Ok(Self {
            config,
            width,
            height,
            max_elevation,
            cell,
            heading,
            reset_cell,
            reset_heading,
            driver_kind,
            morphognostic,
            events,
            metamorphs,
            event_time,
            last_response,
            autopilot: autopilot_state,
            classifier: ClassifierDriver::new(),
            manual: ManualDriver::default(),
        })
    }

    fn check_sensors(&self, sensors: &[u32]) -> Result<(), AgentError> {
        if sensors.len() != NUM_SENSORS {
            return Err(AgentError::SensorCount {
                expected: NUM_SENSORS,
                actual: sensors.len(),
            });
        }
        if let Some((sensor, &value)) = sensors
            .iter()
            .enumerate()
            .find(|&(_, &v)| v > self.max_elevation)
        {
            return Err(AgentError::SensorValue {
                sensor,
                value,
                max: self.max_elevation,
            });
        }
        Ok(())
    }

    fn offset_from_home(&self) -> (i64, i64) {
        (
            wrapped_axis_delta(self.reset_cell.x, self.cell.x, self.width),
            wrapped_axis_delta(self.reset_cell.y, self.cell.y, self.height),
        )
    }
}

/// Alphabet size of each event channel: one per sensor, plus the previous
/// response when that channel is enabled.
fn channel_types(max_elevation: u32, include_response_channel: bool) -> Vec<usize> {
    let elevations = usize::try_from(max_elevation)
        .unwrap_or(usize::MAX)
        .saturating_add(1);
    let mut types = vec![elevations; NUM_SENSORS];
    if include_response_channel {
        types.push(NUM_RESPONSES);
    }
    types
}

const fn check_home(cell: Cell, width: usize, height: usize) -> Result<(), AgentError> {
    if cell.x >= width || cell.y >= height {
        return Err(AgentError::HomeOutOfBounds {
            x: cell.x,
            y: cell.y,
            width,
            height,
        });
    }
    Ok(())
}

fn take_orientation<R: BufRead>(
    reader: &mut RecordReader<R>,
    field: &'static str,
) -> Result<Orientation, AgentError> {
    let code: u8 = reader.take(field)?;
    Orientation::from_code(code)
        .ok_or_else(|| reader.invalid(field, format!("unknown orientation code {code}")).into())
}
