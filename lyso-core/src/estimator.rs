//! Single-channel estimators.
//!
//! [`ChannelEstimator`] turns one waveform into a [`ChannelEstimate`]:
//!
//! 1. Baseline and noise: mean and sample standard deviation over the
//!    baseline window
//! 2. Amplitude: largest deviation below baseline, trigger flag
//! 3. Charge: trapezoidal integral of `baseline - sample` over the
//!    integration window, using the real time step of every segment
//! 4. Constant-fraction times: linear interpolation between the two bins
//!    bracketing `baseline - amplitude * fraction`
//!
//! # Precondition
//!
//! Every waveform is assumed to hold exactly one dominant negative-going
//! pulse with monotonic leading and trailing edges. The crossing search
//! relies on this to pick its direction; waveforms with pile-up produce
//! undefined times and are not detected.
#![allow(clippy::cast_precision_loss, clippy::doc_markdown)]

use crate::config::{AnalysisConfig, BinWindow};
use crate::error::EstimationError;
use crate::estimate::ChannelEstimate;
use crate::waveform::{linear_interpolate, Face, Waveform};
use crate::TIME_SENTINEL;

/// Direction of a threshold test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// First sample with `sample >= value`.
    AtOrAbove,
    /// First sample with `sample <= value`.
    AtOrBelow,
}

impl Crossing {
    #[inline]
    fn matches(self, sample: f64, value: f64) -> bool {
        match self {
            Crossing::AtOrAbove => sample >= value,
            Crossing::AtOrBelow => sample <= value,
        }
    }
}

/// Identifies the channel being estimated, for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelContext {
    /// Event identifier.
    pub event_id: u64,
    /// Face.
    pub face: Face,
    /// Channel index.
    pub channel: usize,
}

impl ChannelContext {
    /// Creates a context.
    #[must_use]
    pub fn new(event_id: u64, face: Face, channel: usize) -> Self {
        Self {
            event_id,
            face,
            channel,
        }
    }
}

/// Estimator for one waveform, configured once from [`AnalysisConfig`].
#[derive(Debug, Clone)]
pub struct ChannelEstimator {
    trigger_level: f64,
    baseline_window: BinWindow,
    integration_window: BinWindow,
    amplitude_window: Option<BinWindow>,
    zero_time_bin: usize,
    fractions: Vec<f64>,
}

impl ChannelEstimator {
    /// Estimator for photosensor channels.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self::with_fractions(config, config.timing.channel_fractions())
    }

    /// Estimator for synthetic sum waveforms.
    #[must_use]
    pub fn for_sums(config: &AnalysisConfig) -> Self {
        Self::with_fractions(config, config.timing.sum_fractions())
    }

    fn with_fractions(config: &AnalysisConfig, fractions: Vec<f64>) -> Self {
        Self {
            trigger_level: config.trigger_level.abs(),
            baseline_window: config.baseline_window,
            integration_window: config.integration_window,
            amplitude_window: config.amplitude_window,
            zero_time_bin: config.zero_time_bin,
            fractions,
        }
    }

    /// Configured fractions.
    #[must_use]
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// Runs every estimator on `wave`.
    ///
    /// Failures are logged with the channel context and replaced by
    /// sentinels; this never fails.
    #[must_use]
    pub fn estimate(&self, wave: &Waveform, ctx: &ChannelContext) -> ChannelEstimate {
        let (baseline, noise_sigma) = match self.baseline(wave) {
            Ok(value) => value,
            Err(err) => {
                log::warn!(
                    "event {} channel {}{}: baseline unavailable: {err}",
                    ctx.event_id,
                    ctx.face.label(),
                    ctx.channel
                );
                return ChannelEstimate::unusable(ctx.face, ctx.channel, self.fractions.len());
            }
        };

        let (amplitude, peak_bin) = match self.amplitude(wave, baseline) {
            Ok(value) => value,
            Err(err) => {
                log::warn!(
                    "event {} channel {}{}: amplitude unavailable: {err}",
                    ctx.event_id,
                    ctx.face.label(),
                    ctx.channel
                );
                (0.0, 0)
            }
        };

        let charge = self.charge(wave, baseline).unwrap_or_else(|err| {
            log::warn!(
                "event {} channel {}{}: charge unavailable: {err}",
                ctx.event_id,
                ctx.face.label(),
                ctx.channel
            );
            0.0
        });

        let triggered = self.is_triggered(amplitude);
        let cf_times = if triggered {
            self.fractions
                .iter()
                .map(|&fraction| {
                    self.constant_fraction_time(wave, baseline, amplitude, fraction)
                        .unwrap_or_else(|err| {
                            log::warn!(
                                "event {} channel {}{} fraction {fraction}: {err}",
                                ctx.event_id,
                                ctx.face.label(),
                                ctx.channel
                            );
                            TIME_SENTINEL
                        })
                })
                .collect()
        } else {
            vec![TIME_SENTINEL; self.fractions.len()]
        };

        ChannelEstimate {
            face: ctx.face,
            channel: ctx.channel,
            baseline,
            noise_sigma,
            amplitude,
            peak_bin,
            charge,
            cf_times,
            triggered,
        }
    }

    /// Mean and sample standard deviation over the baseline window.
    ///
    /// # Errors
    /// Returns [`EstimationError::WindowOutOfRange`] if the window does not
    /// fit in `wave`.
    pub fn baseline(&self, wave: &Waveform) -> Result<(f64, f64), EstimationError> {
        let window = window_samples(wave.samples(), self.baseline_window)?;
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = if window.len() > 1 {
            window.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        Ok((mean, variance.sqrt()))
    }

    /// Largest `baseline - sample` and the bin where it occurs (first bin on
    /// ties). Searches the amplitude window, or the whole waveform.
    ///
    /// # Errors
    /// Returns [`EstimationError::WindowOutOfRange`] if the window does not
    /// fit in `wave`.
    pub fn amplitude(&self, wave: &Waveform, baseline: f64) -> Result<(f64, usize), EstimationError> {
        let window = self
            .amplitude_window
            .unwrap_or(BinWindow::new(0, wave.last_bin()));
        let samples = window_samples(wave.samples(), window)?;

        let (offset, amplitude) = samples
            .iter()
            .map(|s| baseline - s)
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, deviation)| {
                if deviation > best.1 {
                    (i, deviation)
                } else {
                    best
                }
            });

        Ok((amplitude, window.low + offset))
    }

    /// Trigger decision for an amplitude.
    #[inline]
    #[must_use]
    pub fn is_triggered(&self, amplitude: f64) -> bool {
        amplitude > self.trigger_level
    }

    /// Trapezoidal integral of `baseline - sample` over the integration
    /// window, using the time step of each segment.
    ///
    /// # Errors
    /// Returns [`EstimationError::WindowOutOfRange`] if the window does not
    /// fit in `wave`.
    pub fn charge(&self, wave: &Waveform, baseline: f64) -> Result<f64, EstimationError> {
        let samples = window_samples(wave.samples(), self.integration_window)?;
        let times = &wave.times()[self.integration_window.low..=self.integration_window.high];

        let charge = samples
            .windows(2)
            .zip(times.windows(2))
            .map(|(s, t)| (2.0 * baseline - s[0] - s[1]) * (t[1] - t[0]) * 0.5)
            .sum();
        Ok(charge)
    }

    /// Constant-fraction time for `fraction` of `amplitude`.
    ///
    /// The anchor is the first bin at or after the zero-time bin crossing
    /// the trigger threshold. When the fraction threshold lies below the
    /// trigger threshold the outer bin is searched forward from the anchor
    /// and the inner bin backward from there; otherwise the inner bin is
    /// searched backward from the anchor and the outer bin forward from it.
    /// The result is interpolated linearly between the two.
    ///
    /// # Errors
    /// Returns [`EstimationError::CrossingNotFound`] if any of the three
    /// searches runs out of bins.
    pub fn constant_fraction_time(
        &self,
        wave: &Waveform,
        baseline: f64,
        amplitude: f64,
        fraction: f64,
    ) -> Result<f64, EstimationError> {
        let samples = wave.samples();
        let times = wave.times();
        let last = wave.last_bin();
        let zero = self.zero_time_bin.min(last);

        let trigger_threshold = baseline - self.trigger_level;
        let threshold = baseline - amplitude * fraction;

        let find = |value: f64, crossing: Crossing, start: usize, end: usize| {
            Self::crossing_point(samples, value, crossing, start, end).ok_or(
                EstimationError::CrossingNotFound {
                    threshold: value,
                    start,
                    end,
                },
            )
        };

        let anchor = find(trigger_threshold, Crossing::AtOrBelow, zero, last)?;

        let (inner, outer) = if threshold < trigger_threshold {
            let outer = find(threshold, Crossing::AtOrBelow, anchor, last)?;
            let inner = find(threshold, Crossing::AtOrAbove, outer, zero)?;
            (inner, outer)
        } else {
            let inner = find(threshold, Crossing::AtOrAbove, anchor, zero)?;
            let outer = find(threshold, Crossing::AtOrBelow, inner, last)?;
            (inner, outer)
        };

        let rise = samples[outer] - samples[inner];
        if rise.abs() > 0.0 {
            Ok(linear_interpolate(
                samples[inner],
                times[inner],
                samples[outer],
                times[outer],
                threshold,
            ))
        } else {
            Ok(times[inner])
        }
    }

    /// First bin between `start` and `end` (inclusive, searching backward
    /// when `start > end`) whose sample satisfies `crossing` against `value`.
    #[must_use]
    pub fn crossing_point(
        samples: &[f64],
        value: f64,
        crossing: Crossing,
        start: usize,
        end: usize,
    ) -> Option<usize> {
        if start >= samples.len() {
            return None;
        }
        let end = end.min(samples.len() - 1);
        if start <= end {
            (start..=end).find(|&i| crossing.matches(samples[i], value))
        } else {
            (end..=start)
                .rev()
                .find(|&i| crossing.matches(samples[i], value))
        }
    }
}

fn window_samples(samples: &[f64], window: BinWindow) -> Result<&[f64], EstimationError> {
    if window.low > window.high || window.high >= samples.len() {
        return Err(EstimationError::WindowOutOfRange {
            low: window.low,
            high: window.high,
            len: samples.len(),
        });
    }
    Ok(&samples[window.low..=window.high])
}
