//! Batch helpers running the aggregator over many events.

use crate::aggregator::EventAggregator;
use lyso_core::{AnalysisConfig, EventEstimate, EventWaveforms, GeometryTable, Result};
use rayon::prelude::*;

impl EventAggregator<'_> {
    /// Processes events one after another.
    #[must_use]
    pub fn process_all(&self, events: &[EventWaveforms]) -> Vec<EventEstimate> {
        let estimates: Vec<EventEstimate> = events.iter().map(|e| self.process(e)).collect();
        log::info!("processed {} events", estimates.len());
        estimates
    }

    /// Processes independent events on the rayon thread pool.
    ///
    /// Output order matches input order.
    #[must_use]
    pub fn process_all_parallel(&self, events: &[EventWaveforms]) -> Vec<EventEstimate> {
        let estimates: Vec<EventEstimate> = events.par_iter().map(|e| self.process(e)).collect();
        log::info!(
            "processed {} events on {} threads",
            estimates.len(),
            rayon::current_num_threads()
        );
        estimates
    }

    /// Processes a stream of events, handing each estimate to `sink` as it
    /// is produced. Returns the number of events processed.
    ///
    /// Stops at the first error from the stream or the sink.
    pub fn process_stream<I, E, F>(&self, events: I, mut sink: F) -> std::result::Result<usize, E>
    where
        I: IntoIterator<Item = std::result::Result<EventWaveforms, E>>,
        F: FnMut(EventEstimate) -> std::result::Result<(), E>,
    {
        let mut count = 0;
        for event in events {
            sink(self.process(&event?))?;
            count += 1;
        }
        log::info!("processed {count} events");
        Ok(count)
    }
}

/// Process events one after another.
pub fn process_events(
    events: &[EventWaveforms],
    config: &AnalysisConfig,
    geometry: &GeometryTable,
) -> Result<Vec<EventEstimate>> {
    Ok(EventAggregator::new(config, geometry)?.process_all(events))
}

/// Process independent events in parallel with rayon.
pub fn process_events_parallel(
    events: &[EventWaveforms],
    config: &AnalysisConfig,
    geometry: &GeometryTable,
) -> Result<Vec<EventEstimate>> {
    Ok(EventAggregator::new(config, geometry)?.process_all_parallel(events))
}

/// Process a fallible stream of events with a fresh aggregator.
///
/// The configuration is validated before the first event is read.
pub fn process_stream<I, E, F>(
    events: I,
    config: &AnalysisConfig,
    geometry: &GeometryTable,
    sink: F,
) -> std::result::Result<usize, E>
where
    I: IntoIterator<Item = std::result::Result<EventWaveforms, E>>,
    E: From<lyso_core::Error>,
    F: FnMut(EventEstimate) -> std::result::Result<(), E>,
{
    EventAggregator::new(config, geometry)?.process_stream(events, sink)
}
