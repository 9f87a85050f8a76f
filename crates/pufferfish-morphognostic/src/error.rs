//! Error types for the `pufferfish-morphognostic` crate.

use pufferfish_types::RecordError;

/// Errors that can occur building, updating, or persisting descriptors.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// Shape parameters are out of range or produce an invalid level stack.
    #[error("invalid morphognostic parameters: {reason}")]
    InvalidParams {
        /// What was wrong.
        reason: String,
    },

    /// An event does not have one value per channel.
    #[error("event has {actual} values, descriptor expects {expected}")]
    ChannelMismatch {
        /// Channels the descriptor was built with.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },

    /// An event value is outside its channel's alphabet.
    #[error("value {value} on channel {channel} exceeds {types} event types")]
    ValueOutOfRange {
        /// Channel index.
        channel: usize,
        /// Offending value.
        value: u32,
        /// Alphabet size of the channel.
        types: usize,
    },

    /// The metamorph equivalence tolerance must be a finite, non-negative number.
    #[error("invalid equivalent distance {value}")]
    InvalidTolerance {
        /// Offending tolerance.
        value: f32,
    },

    /// Reading or writing a persisted descriptor failed.
    #[error("morphognostic record error: {source}")]
    Record {
        /// The underlying record error.
        #[from]
        source: RecordError,
    },
}
