//! Per-channel and per-event estimator records.

use crate::waveform::Face;
use crate::TIME_SENTINEL;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Estimators extracted from one channel waveform.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelEstimate {
    /// Face the channel belongs to.
    pub face: Face,
    /// Channel index.
    pub channel: usize,
    /// Mean level in the baseline window.
    pub baseline: f64,
    /// Sample standard deviation in the baseline window.
    pub noise_sigma: f64,
    /// Peak deviation below baseline.
    pub amplitude: f64,
    /// Bin of the peak deviation.
    pub peak_bin: usize,
    /// Baseline-relative integral over the integration window.
    pub charge: f64,
    /// Constant-fraction times, one per configured fraction
    /// ([`TIME_SENTINEL`] when not computed).
    pub cf_times: Vec<f64>,
    /// Amplitude above trigger level.
    pub triggered: bool,
}

impl ChannelEstimate {
    /// Record for a channel whose waveform could not be analysed at all.
    ///
    /// Charge and amplitude are zero so face sums stay finite.
    #[must_use]
    pub fn unusable(face: Face, channel: usize, fractions: usize) -> Self {
        Self {
            face,
            channel,
            baseline: f64::NAN,
            noise_sigma: f64::NAN,
            amplitude: 0.0,
            peak_bin: 0,
            charge: 0.0,
            cf_times: vec![TIME_SENTINEL; fractions],
            triggered: false,
        }
    }

    /// Constant-fraction time for a fraction index, if it was computed.
    #[must_use]
    pub fn time(&self, fraction: usize) -> Option<f64> {
        self.cf_times
            .get(fraction)
            .copied()
            .filter(|&t| !is_sentinel(t))
    }
}

/// Returns true if `value` is the "not computed" time marker.
#[inline]
#[must_use]
#[allow(clippy::float_cmp)]
pub fn is_sentinel(value: f64) -> bool {
    value == TIME_SENTINEL
}

/// Charge-weighted position of a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Centroid {
    /// Weighted mean x (mm).
    pub x: f64,
    /// Weighted mean y (mm).
    pub y: f64,
    /// Weighted population spread along x (mm).
    pub sigma_x: f64,
    /// Weighted population spread along y (mm).
    pub sigma_y: f64,
    /// Channels in the cluster.
    pub n_channels: usize,
}

impl Centroid {
    /// Centroid of an empty or zero-charge selection.
    #[must_use]
    pub fn undefined(n_channels: usize) -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
            sigma_x: f64::NAN,
            sigma_y: f64::NAN,
            n_channels,
        }
    }

    /// Returns true if the position could be computed.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The five competing face-level time estimators for one fraction.
///
/// Each entry is [`TIME_SENTINEL`] when it could not be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingEstimates {
    /// Fraction used on channels.
    pub fraction: f64,
    /// Earliest time over all triggered channels of the face.
    pub earliest: f64,
    /// Time of the max-amplitude channel.
    pub peak: f64,
    /// Unweighted mean over the triggered channels of the cluster.
    pub cluster_mean: f64,
    /// Amplitude-weighted mean over the triggered channels of the cluster.
    pub cluster_weighted_mean: f64,
    /// Time of the coherent sum of the cluster waveforms.
    pub sum_waveform: f64,
}

impl TimingEstimates {
    /// All estimators unset.
    #[must_use]
    pub fn unset(fraction: f64) -> Self {
        Self {
            fraction,
            earliest: TIME_SENTINEL,
            peak: TIME_SENTINEL,
            cluster_mean: TIME_SENTINEL,
            cluster_weighted_mean: TIME_SENTINEL,
            sum_waveform: TIME_SENTINEL,
        }
    }

    /// Estimators in the order earliest, peak, cluster mean, weighted
    /// cluster mean, sum waveform.
    #[must_use]
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.earliest,
            self.peak,
            self.cluster_mean,
            self.cluster_weighted_mean,
            self.sum_waveform,
        ]
    }
}

/// Aggregates for one face.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaceEstimate {
    /// Face.
    pub face: Face,
    /// Channel with the largest amplitude.
    pub peak_channel: usize,
    /// Channel with the largest charge.
    pub max_charge_channel: usize,
    /// Charge-weighted position around the peak channel.
    pub centroid: Centroid,
    /// Charge-weighted mean distance of all channels from the peak channel.
    pub mean_radius: f64,
    /// Timing estimators, one entry per fraction.
    pub timing: Vec<TimingEstimates>,
}

/// Everything computed for one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventEstimate {
    /// Event identifier.
    pub event_id: u64,
    /// Front channel estimates, indexed by channel.
    pub front: Vec<ChannelEstimate>,
    /// Back channel estimates, indexed by channel.
    pub back: Vec<ChannelEstimate>,
    /// Summed front charge.
    pub charge_front: f64,
    /// Summed back charge.
    pub charge_back: f64,
    /// Front plus back charge.
    pub charge_total: f64,
    /// Front face aggregates.
    pub front_face: FaceEstimate,
    /// Back face aggregates.
    pub back_face: FaceEstimate,
}

impl EventEstimate {
    /// Channel estimates of one face.
    #[must_use]
    pub fn channels(&self, face: Face) -> &[ChannelEstimate] {
        match face {
            Face::Front => &self.front,
            Face::Back => &self.back,
        }
    }

    /// Aggregates of one face.
    #[must_use]
    pub fn face(&self, face: Face) -> &FaceEstimate {
        match face {
            Face::Front => &self.front_face,
            Face::Back => &self.back_face,
        }
    }

    /// Number of triggered channels on both faces.
    #[must_use]
    pub fn triggered_channels(&self) -> usize {
        self.front
            .iter()
            .chain(&self.back)
            .filter(|c| c.triggered)
            .count()
    }
}
