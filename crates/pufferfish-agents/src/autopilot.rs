//! Deterministic terrain-shaping driver.
//!
//! The autopilot walks an outward square spiral around the home cell,
//! smoothing before every step, then returns home and walks each spoke out
//! and back, rippling the spoke tips with raises and lowers. When the last
//! spoke is done it answers [`Response::Wait`] forever.
//!
//! All positions are offsets from home (`+y` north). The autopilot never
//! touches the grid; it only steers by the offset and heading it is given,
//! so its output is a pure function of its state and those two inputs.

use std::io::{BufRead, Write};

use pufferfish_types::{Cell, Orientation, RecordReader, RecordWriter, Response};
use tracing::{debug, info};

use crate::config::AutopilotConfig;
use crate::driver::{Driver, DriverContext};
use crate::error::AgentError;
use crate::spokes::{SpokePath, spoke_path};

/// Where the autopilot is in its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Walking the square spiral.
    Spiral,
    /// Returning to the home cell after the spiral.
    Homing,
    /// Walking spokes.
    Spokes,
    /// Finished; waits forever.
    Done,
}

impl Phase {
    /// Numeric code used in persisted state.
    pub const fn code(self) -> u8 {
        match self {
            Self::Spiral => 0,
            Self::Homing => 1,
            Self::Spokes => 2,
            Self::Done => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Spiral),
            1 => Some(Self::Homing),
            2 => Some(Self::Spokes),
            3 => Some(Self::Done),
            _ => None,
        }
    }
}

/// Spiral-then-spokes state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autopilot {
    config: AutopilotConfig,
    radius: usize,
    reach: usize,
    phase: Phase,
    plan: Vec<Response>,
    step: usize,
    smoothed: bool,
    paths: Vec<SpokePath>,
    spoke: usize,
    cursor: usize,
    outbound: bool,
    edited: bool,
}

impl Autopilot {
    /// Create an autopilot for an agent whose home is `home` on a
    /// `width` x `height` grid.
    ///
    /// The spiral radius is `center_radius` clamped so the spiral stays
    /// clear of the grid edges. Spoke reach, `center_radius + spoke_length`,
    /// is clamped to half the shorter grid side so every spoke cell has a
    /// distinct offset from home on the torus.
    pub fn new(config: AutopilotConfig, home: Cell, width: usize, height: usize) -> Self {
        let radius = [
            config.center_radius,
            home.x,
            width.saturating_sub(home.x).saturating_sub(1),
            home.y,
            height.saturating_sub(home.y).saturating_sub(1),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);
        let reach = config
            .center_radius
            .saturating_add(config.spoke_length)
            .min(width.min(height).saturating_sub(1) / 2);
        Self::with_geometry(config, radius, reach)
    }

    fn with_geometry(config: AutopilotConfig, radius: usize, reach: usize) -> Self {
        let plan = spiral_plan(radius);
        let center_radius = config.center_radius.min(reach);
        let spokes = AutopilotConfig {
            center_radius,
            spoke_length: reach.saturating_sub(center_radius),
            ..config
        };
        let paths = (0..config.num_spokes).map(|s| spoke_path(s, &spokes)).collect();
        let phase = if plan.is_empty() {
            Phase::Homing
        } else {
            Phase::Spiral
        };
        Self {
            config,
            radius,
            reach,
            phase,
            plan,
            step: 0,
            smoothed: false,
            paths,
            spoke: 0,
            cursor: 0,
            outbound: true,
            edited: false,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective spiral radius.
    pub const fn radius(&self) -> usize {
        self.radius
    }

    /// Effective spoke reach from home.
    pub const fn reach(&self) -> usize {
        self.reach
    }

    /// Index of the spoke being walked.
    pub const fn spoke(&self) -> usize {
        self.spoke
    }

    /// Geometry this autopilot was built with.
    pub const fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    /// Choose the next response for an agent at `offset` from home facing
    /// `heading`.
    pub fn next_response(&mut self, offset: (i64, i64), heading: Orientation) -> Response {
        match self.phase {
            Phase::Spiral => self.spiral(),
            Phase::Homing => self.homing(offset, heading),
            Phase::Spokes => self.spokes(offset, heading),
            Phase::Done => Response::Wait,
        }
    }

    fn spiral(&mut self) -> Response {
        if !self.smoothed {
            self.smoothed = true;
            return Response::Smooth;
        }
        self.smoothed = false;
        let response = self.plan.get(self.step).copied().unwrap_or(Response::Wait);
        self.step = self.step.saturating_add(1);
        if self.step >= self.plan.len() {
            debug!(radius = self.radius, "spiral complete");
            self.phase = Phase::Homing;
        }
        response
    }

    fn homing(&mut self, offset: (i64, i64), heading: Orientation) -> Response {
        match steer(offset, (0, 0), heading) {
            Some(response) => response,
            None => {
                info!(spokes = self.paths.len(), "starting spokes");
                self.phase = Phase::Spokes;
                self.spoke = 0;
                self.cursor = 0;
                self.outbound = true;
                self.smoothed = false;
                self.edited = false;
                self.spokes(offset, heading)
            }
        }
    }

    fn spokes(&mut self, offset: (i64, i64), heading: Orientation) -> Response {
        loop {
            let Some(path) = self.paths.get(self.spoke) else {
                info!("autopilot finished");
                self.phase = Phase::Done;
                return Response::Wait;
            };

            if let Some(target) = self.target()
                && path.cells.get(target) == Some(&offset)
            {
                self.cursor = target;
                self.smoothed = false;
                self.edited = false;
            }

            let mark = path.marks.get(self.cursor).copied().flatten();
            if self.outbound {
                if !self.edited
                    && let Some(edit) = mark
                {
                    self.edited = true;
                    return edit;
                }
                if self.cursor >= path.tip() {
                    self.outbound = false;
                    continue;
                }
            } else if self.cursor == 0 {
                debug!(spoke = self.spoke, "spoke complete");
                self.spoke = self.spoke.saturating_add(1);
                self.outbound = true;
                self.smoothed = false;
                self.edited = false;
                continue;
            }

            let Some(&goal) = self.target().and_then(|t| path.cells.get(t)) else {
                return Response::Wait;
            };
            return match steer(offset, goal, heading) {
                Some(Response::Forward) if self.outbound && !self.smoothed && mark.is_none() => {
                    self.smoothed = true;
                    Response::Smooth
                }
                Some(response) => response,
                None => Response::Wait,
            };
        }
    }

    fn target(&self) -> Option<usize> {
        if self.outbound {
            self.cursor.checked_add(1)
        } else {
            self.cursor.checked_sub(1)
        }
    }

    /// Write the mutable state. Geometry comes from configuration.
    pub fn save<W: Write>(&self, writer: &mut RecordWriter<W>) -> Result<(), AgentError> {
        writer.put(self.radius)?;
        writer.put(self.reach)?;
        writer.put(self.phase.code())?;
        writer.put(self.step)?;
        writer.put(u8::from(self.smoothed))?;
        writer.put(self.spoke)?;
        writer.put(self.cursor)?;
        writer.put(u8::from(self.outbound))?;
        writer.put(u8::from(self.edited))?;
        Ok(())
    }

    /// Read state written by [`save`](Self::save).
    pub fn load<R: BufRead>(
        reader: &mut RecordReader<R>,
        config: AutopilotConfig,
    ) -> Result<Self, AgentError> {
        let radius: usize = reader.take("autopilot radius")?;
        let reach: usize = reader.take("autopilot reach")?;
        let mut autopilot = Self::with_geometry(config, radius, reach);
        let code: u8 = reader.take("autopilot phase")?;
        autopilot.phase = Phase::from_code(code)
            .ok_or_else(|| reader.invalid("autopilot phase", format!("unknown phase {code}")))?;
        autopilot.step = reader.take("autopilot step")?;
        autopilot.smoothed = take_flag(reader, "autopilot smoothed")?;
        autopilot.spoke = reader.take("autopilot spoke")?;
        autopilot.cursor = reader.take("autopilot cursor")?;
        autopilot.outbound = take_flag(reader, "autopilot outbound")?;
        autopilot.edited = take_flag(reader, "autopilot edited")?;
        Ok(autopilot)
    }
}

impl Driver for Autopilot {
    fn decide(&mut self, ctx: &mut DriverContext<'_>) -> Response {
        self.next_response(ctx.offset, ctx.heading)
    }
}

/// Moves for a square spiral of the given radius, starting at the center.
///
/// Ring `r` is entered with one forward step, then walked with a left turn
/// and `2r - 1` steps followed by three left turns each with `2r` steps,
/// ending at the ring's corner ahead and right of the center. Each ring
/// therefore takes `8r` forward steps.
fn spiral_plan(radius: usize) -> Vec<Response> {
    let mut plan = Vec::new();
    for ring in 1..=radius {
        let side = ring.saturating_mul(2);
        plan.push(Response::Forward);
        plan.push(Response::TurnLeft);
        plan.extend(std::iter::repeat_n(Response::Forward, side.saturating_sub(1)));
        for _ in 0..3 {
            plan.push(Response::TurnLeft);
            plan.extend(std::iter::repeat_n(Response::Forward, side));
        }
    }
    plan
}

/// The move that brings an agent at `from` facing `heading` closer to
/// `to`, closing the x gap first. `None` when already there.
fn steer(from: (i64, i64), to: (i64, i64), heading: Orientation) -> Option<Response> {
    let (dx, dy) = (to.0.saturating_sub(from.0), to.1.saturating_sub(from.1));
    let desired = if dx > 0 {
        Orientation::East
    } else if dx < 0 {
        Orientation::West
    } else if dy > 0 {
        Orientation::North
    } else if dy < 0 {
        Orientation::South
    } else {
        return None;
    };
    Some(if heading == desired {
        Response::Forward
    } else if heading.turn_left() == desired {
        Response::TurnLeft
    } else {
        Response::TurnRight
    })
}

fn take_flag<R: BufRead>(reader: &mut RecordReader<R>, field: &'static str) -> Result<bool, AgentError> {
    let value: u8 = reader.take(field)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(reader.invalid(field, format!("expected 0 or 1, got {other}")).into()),
    }
}
