//! JSON-lines tick trace.
//!
//! [`TraceWriter`] is a [`TickCallback`] that appends one serialized
//! [`TickSummary`] per line. A write failure is logged once and further
//! ticks are dropped so the run itself keeps going.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use pufferfish_core::{Simulation, TickCallback, TickSummary};
use tracing::{info, warn};

/// Tick callback writing JSON lines to `W`.
pub struct TraceWriter<W: Write> {
    out: W,
    written: u64,
    failed: bool,
}

impl TraceWriter<BufWriter<File>> {
    /// Create (or truncate) the trace file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        info!(path = %path.display(), "Tick trace enabled");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceWriter<W> {
    /// Wrap an arbitrary writer.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            failed: false,
        }
    }

    /// Flush the trace and hand back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        info!(lines = self.written, "Tick trace closed");
        Ok(self.out)
    }

    fn write_line(&mut self, summary: &TickSummary) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, summary)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write> TickCallback for TraceWriter<W> {
    fn on_tick(&mut self, summary: &TickSummary, _simulation: &Simulation) {
        if self.failed {
            return;
        }
        match self.write_line(summary) {
            Ok(()) => self.written = self.written.saturating_add(1),
            Err(e) => {
                warn!(tick = summary.tick, error = %e, "Tick trace write failed, trace disabled");
                self.failed = true;
            }
        }
    }
}
