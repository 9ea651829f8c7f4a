//! Face-level aggregation of channel estimates.
//!
//! For every event the aggregator runs the channel estimator on all 230
//! waveforms, then combines the results per face:
//!
//! - total charge over per-face channel subsets (all channels by default)
//! - charge-weighted centroid of the cluster around the max-amplitude channel
//! - charge-weighted mean radius of the face
//! - five competing time estimators per fraction
//!
//! Failed aggregates are logged and reported as sentinels (`-1` for times,
//! NaN for positions); no single time estimator is preferred.
#![allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]

use crate::combiner::{CombinedWaveform, CombinerInput, WaveformCombiner};
use crate::neighbors::NeighborFinder;
use lyso_core::{
    AnalysisConfig, Centroid, ChannelContext, ChannelEstimate, ChannelEstimator, EstimationError,
    EventEstimate, EventWaveforms, Face, FaceEstimate, GeometryTable, Result, TimingEstimates,
    Waveform, CHANNELS, TIME_SENTINEL,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Origin used for the mean radius of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RadiusOrigin {
    /// Position of the max-amplitude channel.
    #[default]
    PeakChannel,
    /// Charge-weighted mean position of the whole face.
    ChargeMean,
}

/// Turns one event's waveforms into an [`EventEstimate`].
///
/// Holds only shared references to the configuration and geometry, so one
/// aggregator can serve many threads.
#[derive(Debug, Clone)]
pub struct EventAggregator<'a> {
    config: &'a AnalysisConfig,
    geometry: &'a GeometryTable,
    channel_estimator: ChannelEstimator,
    sum_estimator: ChannelEstimator,
    combiner: WaveformCombiner,
    radius_origin: RadiusOrigin,
    /// Front and back subsets for the charge sums.
    charge_channels: Option<(Vec<usize>, Vec<usize>)>,
}

impl<'a> EventAggregator<'a> {
    /// Creates an aggregator after validating `config`.
    pub fn new(config: &'a AnalysisConfig, geometry: &'a GeometryTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            geometry,
            channel_estimator: ChannelEstimator::new(config),
            sum_estimator: ChannelEstimator::for_sums(config),
            combiner: WaveformCombiner::new(),
            radius_origin: RadiusOrigin::default(),
            charge_channels: None,
        })
    }

    /// Set mean radius origin.
    #[must_use]
    pub fn with_radius_origin(mut self, origin: RadiusOrigin) -> Self {
        self.radius_origin = origin;
        self
    }

    /// Restrict the front and back charge sums to the given channels.
    ///
    /// Fails with [`EstimationError::UnknownChannel`] on an index outside
    /// the photosensor array.
    pub fn with_charge_channels(mut self, front: Vec<usize>, back: Vec<usize>) -> Result<Self> {
        check_channels(&front)?;
        check_channels(&back)?;
        self.charge_channels = Some((front, back));
        Ok(self)
    }

    /// Estimates every channel and aggregates both faces.
    #[must_use]
    pub fn process(&self, event: &EventWaveforms) -> EventEstimate {
        let front = self.estimate_channels(event, Face::Front);
        let back = self.estimate_channels(event, Face::Back);

        let charge_front = self.face_charge(Face::Front, &front);
        let charge_back = self.face_charge(Face::Back, &back);

        let front_face = self.aggregate_face(event, Face::Front, &front);
        let back_face = self.aggregate_face(event, Face::Back, &back);

        log::debug!(
            "event {}: charge F={charge_front:.4} B={charge_back:.4}, peak F{} B{}",
            event.event_id,
            front_face.peak_channel,
            back_face.peak_channel
        );

        EventEstimate {
            event_id: event.event_id,
            front,
            back,
            charge_front,
            charge_back,
            charge_total: charge_front + charge_back,
            front_face,
            back_face,
        }
    }

    /// Channel estimates of one face, indexed by channel.
    #[must_use]
    pub fn estimate_channels(&self, event: &EventWaveforms, face: Face) -> Vec<ChannelEstimate> {
        event
            .face(face)
            .iter()
            .enumerate()
            .map(|(channel, wave)| {
                self.channel_estimator
                    .estimate(wave, &ChannelContext::new(event.event_id, face, channel))
            })
            .collect()
    }

    /// Sum of channel charges over the subset configured for `face`.
    #[must_use]
    pub fn face_charge(&self, face: Face, estimates: &[ChannelEstimate]) -> f64 {
        let channels = match (&self.charge_channels, face) {
            (None, _) => return estimates.iter().map(|e| e.charge).sum(),
            (Some((front, _)), Face::Front) => front,
            (Some((_, back)), Face::Back) => back,
        };
        channels
            .iter()
            .filter_map(|&c| estimates.get(c))
            .map(|e| e.charge)
            .sum()
    }

    /// Aggregates for one face.
    #[must_use]
    pub fn aggregate_face(
        &self,
        event: &EventWaveforms,
        face: Face,
        estimates: &[ChannelEstimate],
    ) -> FaceEstimate {
        let peak = peak_channel(estimates);
        let finder = NeighborFinder::new(self.geometry);

        let position_cluster = finder.find(peak, self.config.neighbors, self.config.rings_position);
        let centroid = self
            .centroid(estimates, &position_cluster)
            .unwrap_or_else(|err| {
                log::warn!("event {} face {}: centroid: {err}", event.event_id, face.label());
                Centroid::undefined(position_cluster.len())
            });

        let mean_radius = self.mean_radius(estimates, peak).unwrap_or_else(|err| {
            log::warn!("event {} face {}: mean radius: {err}", event.event_id, face.label());
            f64::NAN
        });

        let time_cluster = finder.find(peak, self.config.neighbors, self.config.rings_time);
        let timing = self.timing(event, face, estimates, peak, &time_cluster);

        FaceEstimate {
            face,
            peak_channel: peak,
            max_charge_channel: max_charge_channel(estimates),
            centroid,
            mean_radius,
            timing,
        }
    }

    /// Charge-weighted centroid and population spread of `cluster`.
    pub fn centroid(
        &self,
        estimates: &[ChannelEstimate],
        cluster: &[usize],
    ) -> std::result::Result<Centroid, EstimationError> {
        let members: Vec<(f64, f64, f64)> = cluster
            .iter()
            .filter_map(|&c| estimates.get(c))
            .map(|e| (e.charge, self.geometry.x(e.channel), self.geometry.y(e.channel)))
            .collect();

        let total: f64 = members.iter().map(|m| m.0).sum();
        if total.is_nan() || total.abs() <= 0.0 {
            return Err(EstimationError::EmptySelection("centroid cluster"));
        }

        let x = members.iter().map(|(q, x, _)| q * x).sum::<f64>() / total;
        let y = members.iter().map(|(q, _, y)| q * y).sum::<f64>() / total;
        let var_x = members.iter().map(|(q, mx, _)| q * (mx - x).powi(2)).sum::<f64>() / total;
        let var_y = members.iter().map(|(q, _, my)| q * (my - y).powi(2)).sum::<f64>() / total;

        Ok(Centroid {
            x,
            y,
            sigma_x: var_x.max(0.0).sqrt(),
            sigma_y: var_y.max(0.0).sqrt(),
            n_channels: cluster.len(),
        })
    }

    /// Charge-weighted mean distance of every channel of the face from the
    /// configured origin.
    pub fn mean_radius(
        &self,
        estimates: &[ChannelEstimate],
        peak: usize,
    ) -> std::result::Result<f64, EstimationError> {
        let total: f64 = estimates.iter().map(|e| e.charge).sum();
        if total.is_nan() || total.abs() <= 0.0 {
            return Err(EstimationError::EmptySelection("face charge"));
        }

        let (x0, y0) = match self.radius_origin {
            RadiusOrigin::PeakChannel => (self.geometry.x(peak), self.geometry.y(peak)),
            RadiusOrigin::ChargeMean => {
                let x = estimates
                    .iter()
                    .map(|e| e.charge * self.geometry.x(e.channel))
                    .sum::<f64>();
                let y = estimates
                    .iter()
                    .map(|e| e.charge * self.geometry.y(e.channel))
                    .sum::<f64>();
                (x / total, y / total)
            }
        };

        let weighted: f64 = estimates
            .iter()
            .map(|e| e.charge * self.geometry.entry(e.channel).distance_squared_to(x0, y0).sqrt())
            .sum();
        Ok(weighted / total)
    }

    fn timing(
        &self,
        event: &EventWaveforms,
        face: Face,
        estimates: &[ChannelEstimate],
        peak: usize,
        cluster: &[usize],
    ) -> Vec<TimingEstimates> {
        let report = |what: &str, fraction: f64, err: &EstimationError| {
            log::warn!(
                "event {} face {} fraction {fraction}: {what}: {err}",
                event.event_id,
                face.label()
            );
            TIME_SENTINEL
        };

        let sum_times = self
            .sum_waveform_times(event, face, estimates, peak, cluster)
            .unwrap_or_else(|err| {
                log::warn!("event {} face {}: sum waveform: {err}", event.event_id, face.label());
                vec![TIME_SENTINEL; self.sum_estimator.fractions().len()]
            });

        self.channel_estimator
            .fractions()
            .iter()
            .enumerate()
            .map(|(idx, &fraction)| TimingEstimates {
                fraction,
                earliest: earliest_time(estimates, idx)
                    .unwrap_or_else(|err| report("earliest", fraction, &err)),
                peak: estimates
                    .get(peak)
                    .and_then(|e| e.time(idx))
                    .unwrap_or(TIME_SENTINEL),
                cluster_mean: cluster_mean_time(estimates, cluster, idx)
                    .unwrap_or_else(|err| report("cluster mean", fraction, &err)),
                cluster_weighted_mean: cluster_weighted_mean_time(estimates, cluster, idx)
                    .unwrap_or_else(|err| report("weighted cluster mean", fraction, &err)),
                sum_waveform: sum_times.get(idx).copied().unwrap_or(TIME_SENTINEL),
            })
            .collect()
    }

    /// Constant-fraction times of the coherent sum of the triggered
    /// `cluster` waveforms, one per sum fraction.
    ///
    /// An all-quiet cluster gives [`EstimationError::EmptySelection`].
    pub fn sum_waveform_times(
        &self,
        event: &EventWaveforms,
        face: Face,
        estimates: &[ChannelEstimate],
        peak: usize,
        cluster: &[usize],
    ) -> std::result::Result<Vec<f64>, EstimationError> {
        let waves: &[Waveform] = event.face(face);
        let inputs: Vec<CombinerInput<'_>> = cluster
            .iter()
            .filter_map(|&c| Some((waves.get(c)?, estimates.get(c)?)))
            .filter(|(_, e)| e.triggered && e.baseline.is_finite())
            .map(|(w, e)| CombinerInput::new(w, e.baseline))
            .collect();

        let sum = self.combiner.combine(&inputs)?;
        let estimate = self
            .sum_estimator
            .estimate(&sum.waveform, &ChannelContext::new(event.event_id, face, peak));
        Ok(estimate.cf_times)
    }

    /// Coherent sum of selected channels from both faces.
    ///
    /// Baselines come from `estimate`; channels without a usable baseline
    /// are left out.
    pub fn detector_sum(
        &self,
        event: &EventWaveforms,
        estimate: &EventEstimate,
        front: &[usize],
        back: &[usize],
    ) -> std::result::Result<CombinedWaveform, EstimationError> {
        check_channels(front)?;
        check_channels(back)?;

        let mut inputs = Vec::with_capacity(front.len() + back.len());
        for (face, channels) in Face::ALL.into_iter().zip([front, back]) {
            let waves = event.face(face);
            let estimates = estimate.channels(face);
            inputs.extend(
                channels
                    .iter()
                    .filter_map(|&c| Some((waves.get(c)?, estimates.get(c)?)))
                    .filter(|(_, e)| e.baseline.is_finite())
                    .map(|(w, e)| CombinerInput::new(w, e.baseline)),
            );
        }
        self.combiner.combine(&inputs)
    }
}

fn check_channels(channels: &[usize]) -> std::result::Result<(), EstimationError> {
    match channels.iter().find(|&&c| c >= CHANNELS) {
        Some(&channel) => Err(EstimationError::UnknownChannel {
            channel,
            channels: CHANNELS,
        }),
        None => Ok(()),
    }
}

/// Channel with the largest amplitude (lowest index on ties).
#[must_use]
pub fn peak_channel(estimates: &[ChannelEstimate]) -> usize {
    argmax(estimates, |e| e.amplitude)
}

/// Channel with the largest charge (lowest index on ties).
#[must_use]
pub fn max_charge_channel(estimates: &[ChannelEstimate]) -> usize {
    argmax(estimates, |e| e.charge)
}

fn argmax(estimates: &[ChannelEstimate], key: impl Fn(&ChannelEstimate) -> f64) -> usize {
    estimates
        .iter()
        .fold((0, f64::NEG_INFINITY), |best, e| {
            let value = key(e);
            if value > best.1 {
                (e.channel, value)
            } else {
                best
            }
        })
        .0
}

/// Earliest valid time of any triggered channel.
pub fn earliest_time(
    estimates: &[ChannelEstimate],
    fraction: usize,
) -> std::result::Result<f64, EstimationError> {
    estimates
        .iter()
        .filter(|e| e.triggered)
        .filter_map(|e| e.time(fraction))
        .min_by(f64::total_cmp)
        .ok_or(EstimationError::EmptySelection("triggered channels"))
}

/// Unweighted mean time over the triggered channels of `cluster`.
pub fn cluster_mean_time(
    estimates: &[ChannelEstimate],
    cluster: &[usize],
    fraction: usize,
) -> std::result::Result<f64, EstimationError> {
    let times: Vec<f64> = cluster_times(estimates, cluster, fraction)
        .map(|(t, _)| t)
        .collect();
    if times.is_empty() {
        return Err(EstimationError::EmptySelection("triggered cluster channels"));
    }
    Ok(times.iter().sum::<f64>() / times.len() as f64)
}

/// Amplitude-weighted mean time over the triggered channels of `cluster`.
pub fn cluster_weighted_mean_time(
    estimates: &[ChannelEstimate],
    cluster: &[usize],
    fraction: usize,
) -> std::result::Result<f64, EstimationError> {
    let (sum, weight) = cluster_times(estimates, cluster, fraction)
        .fold((0.0, 0.0), |(sum, weight), (t, a)| (sum + t * a, weight + a));
    if weight > 0.0 {
        Ok(sum / weight)
    } else {
        Err(EstimationError::EmptySelection("triggered cluster channels"))
    }
}

fn cluster_times<'e>(
    estimates: &'e [ChannelEstimate],
    cluster: &'e [usize],
    fraction: usize,
) -> impl Iterator<Item = (f64, f64)> + 'e {
    cluster
        .iter()
        .filter_map(move |&c| estimates.get(c))
        .filter(|e| e.triggered)
        .filter_map(move |e| e.time(fraction).map(|t| (t, e.amplitude)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lyso_core::estimate::is_sentinel;
    use lyso_core::{CHANNELS, PITCH_X, SAMPLINGS};

    const DT: f64 = 0.2;

    /// Zero baseline, linear fall over 16 bins from `start`, recovery over 64.
    fn pulse(depth: f64, start: usize) -> Vec<f64> {
        (0..SAMPLINGS)
            .map(|i| {
                if i <= start || i >= start + 80 {
                    0.0
                } else if i <= start + 16 {
                    -depth * (i - start) as f64 / 16.0
                } else {
                    -depth * (start + 80 - i) as f64 / 64.0
                }
            })
            .collect()
    }

    fn event(pulses: &[(usize, f64, usize)]) -> EventWaveforms {
        let times: Vec<f64> = (0..SAMPLINGS).map(|i| i as f64 * DT).collect();
        let mut face = vec![vec![0.0; SAMPLINGS]; CHANNELS];
        for &(channel, depth, start) in pulses {
            face[channel] = pulse(depth, start);
        }
        EventWaveforms::with_shared_times(7, &times, face.clone(), face).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig::default();
        let geometry = GeometryTable::prototype();
        assert!(EventAggregator::new(&config, &geometry).is_err());
    }

    #[test]
    fn test_charges() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();

        let result = aggregator.process(&event(&[(57, 1.0, 400), (58, 0.5, 400)]));
        // Triangle area: 0.5 * 80 bins * DT * depth.
        assert_relative_eq!(result.charge_front, 12.0, epsilon = 1e-9);
        assert_relative_eq!(result.charge_back, 12.0, epsilon = 1e-9);
        assert_relative_eq!(result.charge_total, 24.0, epsilon = 1e-9);
        assert_eq!(result.front_face.peak_channel, 57);
        assert_eq!(result.front_face.max_charge_channel, 57);
        assert_eq!(result.triggered_channels(), 4);
    }

    #[test]
    fn test_charge_subsets_per_face() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry)
            .unwrap()
            .with_charge_channels(vec![58], vec![57, 58])
            .unwrap();

        let result = aggregator.process(&event(&[(57, 1.0, 400), (58, 0.5, 400)]));
        assert_relative_eq!(result.charge_front, 4.0, epsilon = 1e-9);
        assert_relative_eq!(result.charge_back, 12.0, epsilon = 1e-9);
        assert_relative_eq!(result.charge_total, 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_charge_subset_rejects_unknown_channel() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let err = EventAggregator::new(&config, &geometry)
            .unwrap()
            .with_charge_channels(vec![58], vec![CHANNELS])
            .unwrap_err();
        assert!(matches!(
            err,
            lyso_core::Error::Estimation(EstimationError::UnknownChannel { channel, .. })
                if channel == CHANNELS
        ));
    }

    #[test]
    fn test_centroid_of_two_equal_channels() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();

        let result = aggregator.process(&event(&[(57, 1.0, 400), (58, 1.0, 400)]));
        let centroid = result.back_face.centroid;
        assert_relative_eq!(centroid.x, PITCH_X / 2.0, epsilon = 1e-9);
        assert_relative_eq!(centroid.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(centroid.sigma_x, PITCH_X / 2.0, epsilon = 1e-9);
        assert_relative_eq!(centroid.sigma_y, 0.0, epsilon = 1e-9);
        assert_eq!(centroid.n_channels, 9);
    }

    #[test]
    fn test_mean_radius_origins() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let input = event(&[(57, 1.0, 400), (58, 0.5, 400)]);

        let peak = EventAggregator::new(&config, &geometry).unwrap().process(&input);
        assert_relative_eq!(peak.front_face.mean_radius, 4.0 * PITCH_X / 12.0, epsilon = 1e-9);

        let mean = EventAggregator::new(&config, &geometry)
            .unwrap()
            .with_radius_origin(RadiusOrigin::ChargeMean)
            .process(&input);
        let x_bar = 4.0 * PITCH_X / 12.0;
        let expected = (8.0 * x_bar + 4.0 * (PITCH_X - x_bar)) / 12.0;
        assert_relative_eq!(mean.front_face.mean_radius, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_timing_estimators() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();

        // Half-amplitude crossings land exactly on bins 408 and 410.
        let result = aggregator.process(&event(&[(57, 1.0, 400), (58, 0.5, 402)]));
        let timing = result.front_face.timing[2];
        assert_relative_eq!(timing.fraction, 0.5);
        assert_relative_eq!(timing.earliest, 408.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(timing.peak, 408.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(timing.cluster_mean, 409.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(
            timing.cluster_weighted_mean,
            (408.0 + 0.5 * 410.0) / 1.5 * DT,
            epsilon = 1e-9
        );
        // Sum edge is -(1.5k - 1)/16, its minimum -1.46875 at bin 418.
        assert_relative_eq!(timing.sum_waveform, 408.5 * DT, epsilon = 1e-9);
        assert_eq!(result.front_face.timing.len(), 3);
    }

    #[test]
    fn test_untriggered_neighbor_stays_out_of_sum() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();

        // Channel 58 carries a shallow step under the pulse, below the 0.02 trigger.
        let times: Vec<f64> = (0..SAMPLINGS).map(|i| i as f64 * DT).collect();
        let mut face = vec![vec![0.0; SAMPLINGS]; CHANNELS];
        face[57] = pulse(1.0, 400);
        face[58] = (0..SAMPLINGS)
            .map(|i| if (380..=460).contains(&i) { -0.015 } else { 0.0 })
            .collect();
        let input = EventWaveforms::with_shared_times(8, &times, face.clone(), face).unwrap();

        let result = aggregator.process(&input);
        assert!(!result.front[58].triggered);
        let timing = result.front_face.timing[2];
        assert_relative_eq!(timing.sum_waveform, 408.0 * DT, epsilon = 1e-9);
        assert_relative_eq!(timing.sum_waveform, timing.peak, epsilon = 1e-9);
    }

    #[test]
    fn test_detector_sum_spans_both_faces() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();
        let input = event(&[(57, 1.0, 400), (58, 0.5, 400)]);
        let result = aggregator.process(&input);

        let sum = aggregator.detector_sum(&input, &result, &[57], &[57, 58]).unwrap();
        assert_eq!(sum.waveform.source(), &lyso_core::WaveformSource::Sum { inputs: 3 });
        assert_relative_eq!(sum.baseline, 0.0, epsilon = 1e-12);
        // Pulse bottoms at bin 416: 1.0 + 1.0 + 0.5.
        assert_relative_eq!(sum.waveform.samples()[416], -2.5, epsilon = 1e-12);

        let err = aggregator
            .detector_sum(&input, &result, &[CHANNELS + 3], &[])
            .unwrap_err();
        assert_eq!(
            err,
            EstimationError::UnknownChannel {
                channel: CHANNELS + 3,
                channels: CHANNELS
            }
        );
    }

    #[test]
    fn test_quiet_event_gives_sentinels() {
        let config = AnalysisConfig::prototype_defaults();
        let geometry = GeometryTable::prototype();
        let aggregator = EventAggregator::new(&config, &geometry).unwrap();

        let result = aggregator.process(&event(&[]));
        assert_eq!(result.triggered_channels(), 0);
        assert!(!result.front_face.centroid.is_defined());
        assert!(result.front_face.mean_radius.is_nan());
        for timing in &result.back_face.timing {
            assert!(timing.as_array().iter().all(|&t| is_sentinel(t)));
        }
    }

    #[test]
    fn test_weighted_mean_needs_triggered_channels() {
        let estimates = vec![ChannelEstimate::unusable(Face::Front, 0, 1)];
        assert_eq!(
            cluster_weighted_mean_time(&estimates, &[0], 0),
            Err(EstimationError::EmptySelection("triggered cluster channels"))
        );
        assert!(earliest_time(&estimates, 0).is_err());
    }
}
