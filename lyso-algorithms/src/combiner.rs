//! Coherent summing of channel waveforms.
#![allow(clippy::cast_precision_loss)]

use lyso_core::{EstimationError, Waveform};

/// Time difference below which two samples are treated as simultaneous.
pub const TIME_TOLERANCE: f64 = 1e-6;

/// A sum waveform and the baseline it was built around.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedWaveform {
    /// Summed samples on the merged time grid.
    pub waveform: Waveform,
    /// Mean of the input baselines.
    pub baseline: f64,
}

/// One waveform to be summed, with its measured baseline.
#[derive(Debug, Clone, Copy)]
pub struct CombinerInput<'w> {
    /// Waveform.
    pub waveform: &'w Waveform,
    /// Its baseline.
    pub baseline: f64,
}

impl<'w> CombinerInput<'w> {
    /// Creates an input.
    #[must_use]
    pub fn new(waveform: &'w Waveform, baseline: f64) -> Self {
        Self { waveform, baseline }
    }
}

/// Folds waveforms pairwise into one sum waveform.
///
/// Each input is shifted to zero baseline before summing and the running
/// mean of the input baselines is added back, so pedestals are not
/// multiplied by the number of inputs. Where the two time grids disagree at
/// an index the midpoint time is used and both inputs are linearly
/// interpolated there.
#[derive(Debug, Clone, Copy)]
pub struct WaveformCombiner {
    tolerance: f64,
}

impl Default for WaveformCombiner {
    fn default() -> Self {
        Self {
            tolerance: TIME_TOLERANCE,
        }
    }
}

impl WaveformCombiner {
    /// Creates a combiner with the default time tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sums all inputs.
    ///
    /// # Errors
    /// Returns [`EstimationError::EmptySelection`] for no inputs and
    /// [`EstimationError::LengthMismatch`] if lengths differ.
    pub fn combine(&self, inputs: &[CombinerInput<'_>]) -> Result<CombinedWaveform, EstimationError> {
        let (first, rest) = inputs
            .split_first()
            .ok_or(EstimationError::EmptySelection("sum waveform"))?;

        let mut times = first.waveform.times().to_vec();
        let mut samples = first.waveform.samples().to_vec();
        let mut baseline = first.baseline;

        for (folded, input) in rest.iter().enumerate() {
            let count = (folded + 1) as f64;
            let target = (baseline * count + input.baseline) / (count + 1.0);
            let acc = Waveform::from_sum(folded + 1, times, samples)?;
            let (t, s) = self.sum_pair(
                &CombinerInput::new(&acc, baseline),
                input,
                target,
            )?;
            times = t;
            samples = s;
            baseline = target;
        }

        Ok(CombinedWaveform {
            waveform: Waveform::from_sum(inputs.len(), times, samples)?,
            baseline,
        })
    }

    /// Sums two waveforms around `target` baseline.
    ///
    /// # Errors
    /// Returns [`EstimationError::LengthMismatch`] if lengths differ.
    pub fn combine_pair(
        &self,
        a: &CombinerInput<'_>,
        b: &CombinerInput<'_>,
    ) -> Result<CombinedWaveform, EstimationError> {
        let target = 0.5 * (a.baseline + b.baseline);
        let (times, samples) = self.sum_pair(a, b, target)?;
        Ok(CombinedWaveform {
            waveform: Waveform::from_sum(2, times, samples)?,
            baseline: target,
        })
    }

    fn sum_pair(
        &self,
        a: &CombinerInput<'_>,
        b: &CombinerInput<'_>,
        target: f64,
    ) -> Result<(Vec<f64>, Vec<f64>), EstimationError> {
        let (wa, wb) = (a.waveform, b.waveform);
        if wa.len() != wb.len() {
            return Err(EstimationError::LengthMismatch {
                left: wa.len(),
                right: wb.len(),
            });
        }

        let mut times = Vec::with_capacity(wa.len());
        let mut samples = Vec::with_capacity(wa.len());

        for (i, (&ta, &tb)) in wa.times().iter().zip(wb.times()).enumerate() {
            let (time, sa, sb) = if (ta - tb).abs() < self.tolerance {
                (ta, wa.samples()[i], wb.samples()[i])
            } else {
                let mid = 0.5 * (ta + tb);
                (mid, wa.sample_near(i, mid), wb.sample_near(i, mid))
            };
            times.push(time);
            samples.push((sa - a.baseline) + (sb - b.baseline) + target);
        }

        Ok((times, samples))
    }
}
