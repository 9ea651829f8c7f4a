//! lyso-algorithms: event-level analysis of LYSO bar waveforms.
//!
//! This crate provides:
//! - **Neighbor search** - ring-count or k-nearest channel neighborhoods
//! - **Waveform combiner** - baseline-aware coherent sums of channels
//! - **Event aggregator** - charges, centroids and timing estimators per face
//! - **Processing** - sequential, parallel and streaming batch helpers
//!
#![warn(missing_docs)]

mod aggregator;
mod combiner;
mod neighbors;
mod processing;

pub use aggregator::{
    cluster_mean_time, cluster_weighted_mean_time, earliest_time, max_charge_channel,
    peak_channel, EventAggregator, RadiusOrigin,
};
pub use combiner::{CombinedWaveform, CombinerInput, WaveformCombiner, TIME_TOLERANCE};
pub use neighbors::{NeighborFinder, RING_TOLERANCE};
pub use processing::{process_events, process_events_parallel, process_stream};

// Re-export core configuration types
pub use lyso_core::{AnalysisConfig, NeighborScheme, TimingScheme};
