//! Digitized waveform type.

use crate::error::EstimationError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Detector face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Face {
    /// Front array of photosensors.
    Front,
    /// Back array of photosensors.
    Back,
}

impl Face {
    /// Both faces, front first.
    pub const ALL: [Face; 2] = [Face::Front, Face::Back];

    /// Short label used in logs and CSV headers.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Face::Front => "F",
            Face::Back => "B",
        }
    }
}

/// Where a waveform came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveformSource {
    /// Read from one photosensor channel.
    Channel { face: Face, channel: usize },
    /// Built by summing channel waveforms.
    Sum { inputs: usize },
}

/// A sampled waveform: strictly increasing times and one sample per time.
///
/// Raw channel waveforms and synthetic sums share this type, so the channel
/// estimator does not care where the samples came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    times: Vec<f64>,
    samples: Vec<f64>,
    source: WaveformSource,
}

impl Waveform {
    /// Creates a waveform read from a channel.
    ///
    /// # Errors
    /// Returns an error if the sequences are empty or differ in length, or if
    /// the times are not finite and strictly increasing.
    pub fn from_channel(
        face: Face,
        channel: usize,
        times: Vec<f64>,
        samples: Vec<f64>,
    ) -> Result<Self, EstimationError> {
        Self::new(times, samples, WaveformSource::Channel { face, channel })
    }

    /// Creates a synthetic sum of `inputs` waveforms.
    ///
    /// # Errors
    /// Same conditions as [`Waveform::from_channel`].
    pub fn from_sum(
        inputs: usize,
        times: Vec<f64>,
        samples: Vec<f64>,
    ) -> Result<Self, EstimationError> {
        Self::new(times, samples, WaveformSource::Sum { inputs })
    }

    fn new(
        times: Vec<f64>,
        samples: Vec<f64>,
        source: WaveformSource,
    ) -> Result<Self, EstimationError> {
        if times.len() != samples.len() {
            return Err(EstimationError::LengthMismatch {
                left: times.len(),
                right: samples.len(),
            });
        }
        if times.is_empty() {
            return Err(EstimationError::EmptyWaveform);
        }
        if !times[0].is_finite() {
            return Err(EstimationError::NonIncreasingTimes { bin: 0 });
        }
        if let Some(bin) = times
            .windows(2)
            .position(|w| !w[1].is_finite() || w[1] <= w[0])
        {
            return Err(EstimationError::NonIncreasingTimes { bin: bin + 1 });
        }
        Ok(Self {
            times,
            samples,
            source,
        })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: empty waveforms cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample times (read-only view).
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Sample values (read-only view).
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Provenance of the waveform.
    #[must_use]
    pub fn source(&self) -> &WaveformSource {
        &self.source
    }

    /// Index of the last sample.
    #[must_use]
    pub fn last_bin(&self) -> usize {
        self.samples.len() - 1
    }

    /// Sample value at `time`, linearly interpolated between the two bins
    /// around `bin` that bracket it. At the first and last bin the stored
    /// sample is returned unchanged.
    #[must_use]
    pub fn sample_near(&self, bin: usize, time: f64) -> f64 {
        if bin == 0 || bin >= self.last_bin() {
            return self.samples[bin];
        }
        let (lo, hi) = if time >= self.times[bin] {
            (bin, bin + 1)
        } else {
            (bin - 1, bin)
        };
        linear_interpolate(
            self.times[lo],
            self.samples[lo],
            self.times[hi],
            self.samples[hi],
            time,
        )
    }
}

/// Linear interpolation through `(x0, y0)` and `(x1, y1)` evaluated at `x`.
#[inline]
#[must_use]
pub fn linear_interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_length_mismatch() {
        let err = Waveform::from_channel(Face::Front, 0, vec![0.0, 1.0], vec![0.0]).unwrap_err();
        assert_eq!(err, EstimationError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_empty_waveform() {
        let err = Waveform::from_sum(2, Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, EstimationError::EmptyWaveform);
    }

    #[test]
    fn test_times_must_increase() {
        let err = Waveform::from_channel(Face::Front, 0, vec![0.0, 2.0, 1.0, 3.0], vec![0.0; 4])
            .unwrap_err();
        assert_eq!(err, EstimationError::NonIncreasingTimes { bin: 2 });

        let err = Waveform::from_sum(2, vec![0.0, 1.0, 1.0, 2.0], vec![0.0; 4]).unwrap_err();
        assert_eq!(err, EstimationError::NonIncreasingTimes { bin: 2 });

        let err = Waveform::from_sum(1, vec![f64::NAN, 1.0], vec![0.0; 2]).unwrap_err();
        assert_eq!(err, EstimationError::NonIncreasingTimes { bin: 0 });

        let err = Waveform::from_sum(1, vec![0.0, f64::INFINITY], vec![0.0; 2]).unwrap_err();
        assert_eq!(err, EstimationError::NonIncreasingTimes { bin: 1 });
    }

    #[test]
    fn test_source_tag() {
        let wave = Waveform::from_channel(Face::Back, 7, vec![0.0], vec![1.0]).unwrap();
        assert_eq!(
            wave.source(),
            &WaveformSource::Channel {
                face: Face::Back,
                channel: 7
            }
        );
    }

    #[test]
    fn test_sample_near_interpolates() {
        let wave = Waveform::from_sum(
            1,
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 10.0, 20.0, 30.0],
        )
        .unwrap();
        assert_relative_eq!(wave.sample_near(1, 1.5), 15.0);
        assert_relative_eq!(wave.sample_near(2, 1.25), 12.5);
        // Edges are not interpolated.
        assert_relative_eq!(wave.sample_near(0, 0.5), 0.0);
        assert_relative_eq!(wave.sample_near(3, 3.5), 30.0);
    }
}
