//! Line-per-value text records.
//!
//! Snapshot files are a flat sequence of scalar values, one per line, in a
//! fixed field order. The format has no framing beyond that order, so the
//! reader is told which field it expects and reports it on failure.
//!
//! Floats are written with Rust's shortest round-trip formatting, which
//! parses back to the identical bit pattern.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Errors produced while reading or writing a record stream.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The underlying stream failed.
    #[error("record i/o error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The stream ended before the named field.
    #[error("unexpected end of record at line {line}, expected {field}")]
    UnexpectedEnd {
        /// Field that was expected.
        field: &'static str,
        /// One-based line number where the field should have been.
        line: u64,
    },

    /// A token could not be parsed as the named field.
    #[error("cannot parse {field} from {token:?} at line {line}")]
    Parse {
        /// Field that was expected.
        field: &'static str,
        /// Offending text.
        token: String,
        /// One-based line number of the token.
        line: u64,
    },

    /// A field parsed but its value is not acceptable.
    #[error("invalid {field} at line {line}: {reason}")]
    Invalid {
        /// Field that was rejected.
        field: &'static str,
        /// One-based line number of the value.
        line: u64,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Writes scalar values one per line.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap an output stream.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Append a single value.
    pub fn put<T: Display>(&mut self, value: T) -> Result<(), RecordError> {
        writeln!(self.inner, "{value}")?;
        Ok(())
    }

    /// Append every value of a slice, in order.
    pub fn put_all<T: Display>(&mut self, values: &[T]) -> Result<(), RecordError> {
        for value in values {
            self.put(value)?;
        }
        Ok(())
    }

    /// Flush and return the underlying stream.
    pub fn finish(mut self) -> Result<W, RecordError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads scalar values one per line.
#[derive(Debug)]
pub struct RecordReader<R: BufRead> {
    inner: R,
    line: u64,
    buf: String,
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap an input stream.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }

    /// Line number of the most recently read value.
    pub const fn line(&self) -> u64 {
        self.line
    }

    /// Read the next value as `T`, naming it `field` in any error.
    pub fn take<T: FromStr>(&mut self, field: &'static str) -> Result<T, RecordError> {
        self.buf.clear();
        let read = self.inner.read_line(&mut self.buf)?;
        self.line = self.line.saturating_add(1);
        if read == 0 {
            return Err(RecordError::UnexpectedEnd {
                field,
                line: self.line,
            });
        }
        let token = self.buf.trim();
        token.parse().map_err(|_parse_err| RecordError::Parse {
            field,
            token: token.to_owned(),
            line: self.line,
        })
    }

    /// Read `count` consecutive values of the same field.
    pub fn take_vec<T: FromStr>(
        &mut self,
        field: &'static str,
        count: usize,
    ) -> Result<Vec<T>, RecordError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.take(field)?);
        }
        Ok(values)
    }

    /// Build an [`RecordError::Invalid`] for the value just read.
    pub fn invalid(&self, field: &'static str, reason: impl Into<String>) -> RecordError {
        RecordError::Invalid {
            field,
            line: self.line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn floats_survive_text_form() {
        let values = [0.1_f32, 1.0 / 3.0, 0.0, 1.0e-7, 0.999_999_9];
        let mut writer = RecordWriter::new(Vec::new());
        writer.put_all(&values).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = RecordReader::new(bytes.as_slice());
        let back: Vec<f32> = reader.take_vec("density", values.len()).unwrap();
        for (a, b) in values.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn reports_field_and_line_on_bad_token() {
        let mut reader = RecordReader::new("3\nabc\n".as_bytes());
        assert_eq!(reader.take::<u32>("width").unwrap(), 3);
        let err = reader.take::<u32>("height").unwrap_err();
        assert!(matches!(
            err,
            RecordError::Parse { field: "height", ref token, line: 2 } if token == "abc"
        ));
    }

    #[test]
    fn truncated_stream_is_unexpected_end() {
        let mut reader = RecordReader::new("1\n".as_bytes());
        let _ = reader.take::<i32>("x").unwrap();
        let err = reader.take::<i32>("y").unwrap_err();
        assert!(matches!(err, RecordError::UnexpectedEnd { field: "y", .. }));
    }
}
