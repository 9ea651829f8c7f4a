//! Error types for lyso-core.

use thiserror::Error;

/// Result type alias for lyso operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for lyso operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid analysis configuration (fatal, raised before any event).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Estimation failure local to one channel, estimator or event.
    #[error("estimation error: {0}")]
    Estimation(#[from] EstimationError),

    /// Invalid geometry table.
    #[error("geometry error: {0}")]
    Geometry(String),
}

/// Configuration errors, detected once at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A bin window whose lower edge is not strictly below its upper edge.
    #[error("invalid {name} window: low bin {low} must be below high bin {high}")]
    InvalidWindow {
        name: &'static str,
        low: usize,
        high: usize,
    },

    /// A bin window that does not fit in a waveform.
    #[error("{name} window [{low}, {high}] exceeds the {samplings} available samples")]
    WindowOutOfBounds {
        name: &'static str,
        low: usize,
        high: usize,
        samplings: usize,
    },

    /// A constant fraction outside (0, 1).
    #[error("constant fraction {0} must be in (0, 1)")]
    InvalidFraction(f64),

    /// A configuration value that could not be parsed.
    #[error("invalid value {value:?} for parameter {key}")]
    InvalidValue { key: String, value: String },
}

/// Recoverable estimation errors.
///
/// These are local to a channel or to one aggregate: callers log them and
/// store a sentinel instead of aborting the event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// A threshold-crossing search exhausted its range.
    #[error("crossing point not found for threshold {threshold} searching bins {start} to {end}")]
    CrossingNotFound {
        threshold: f64,
        start: usize,
        end: usize,
    },

    /// An aggregate was requested over an empty or zero-weight selection.
    #[error("empty selection for {0}")]
    EmptySelection(&'static str),

    /// A bin window that does not fit in this particular waveform.
    #[error("bin window [{low}, {high}] is outside a waveform of {len} samples")]
    WindowOutOfRange { low: usize, high: usize, len: usize },

    /// Time and sample sequences of different lengths.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// A waveform without samples.
    #[error("waveform has no samples")]
    EmptyWaveform,

    /// Sample times that are not finite and strictly increasing.
    #[error("sample time at bin {bin} is not finite or not after the previous one")]
    NonIncreasingTimes { bin: usize },

    /// A channel index outside the photosensor array.
    #[error("channel {channel} does not exist (array has {channels})")]
    UnknownChannel { channel: usize, channels: usize },

    /// An event record without exactly one waveform per channel.
    #[error("expected {expected} channels, got {found}")]
    ChannelCount { expected: usize, found: usize },
}
