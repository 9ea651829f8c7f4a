//! lyso-core: Core types and single-channel estimators for LYSO bar waveforms.
//!
//! This crate provides the data model shared by the whole workspace
//! (waveforms, channel and event estimates), the fixed photosensor geometry,
//! the immutable analysis configuration, and the channel estimator that
//! turns one digitized waveform into baseline, amplitude, charge, trigger
//! and constant-fraction times.
//!

pub mod config;
pub mod error;
pub mod estimate;
pub mod estimator;
pub mod event;
pub mod geometry;
pub mod waveform;

pub use config::{AnalysisConfig, BinWindow, NeighborScheme, TimingScheme, CANONICAL_FRACTIONS};
pub use error::{ConfigError, Error, EstimationError, Result};
pub use estimate::{Centroid, ChannelEstimate, EventEstimate, FaceEstimate, TimingEstimates};
pub use estimator::{ChannelContext, ChannelEstimator, Crossing};
pub use event::EventWaveforms;
pub use geometry::{GeometryEntry, GeometryTable, PITCH_X, PITCH_Y};
pub use waveform::{Face, Waveform, WaveformSource};

/// Number of photosensor channels on each face of the bar.
pub const CHANNELS: usize = 115;

/// Number of digitized samples in one waveform.
pub const SAMPLINGS: usize = 1024;

/// Value stored for a time estimator that could not be computed.
pub const TIME_SENTINEL: f64 = -1.0;
