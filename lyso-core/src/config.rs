//! Analysis configuration.
//!
//! One immutable [`AnalysisConfig`] is built at startup, validated once, and
//! passed by reference to every component.

use crate::error::ConfigError;
use crate::SAMPLINGS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Constant fractions evaluated by the canonical timing scheme.
pub const CANONICAL_FRACTIONS: [f64; 3] = [0.15, 0.25, 0.50];

/// Inclusive range of sample bins `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinWindow {
    /// First bin (inclusive).
    pub low: usize,
    /// Last bin (inclusive).
    pub high: usize,
}

impl BinWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// Number of bins in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.high.saturating_sub(self.low) + 1
    }

    /// Never true; a window has at least one bin.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Checks `low < high` and that the window fits in `samplings` bins.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidWindow`] or
    /// [`ConfigError::WindowOutOfBounds`].
    pub fn validate(&self, name: &'static str, samplings: usize) -> Result<(), ConfigError> {
        if self.low >= self.high {
            return Err(ConfigError::InvalidWindow {
                name,
                low: self.low,
                high: self.high,
            });
        }
        if self.high >= samplings {
            return Err(ConfigError::WindowOutOfBounds {
                name,
                low: self.low,
                high: self.high,
                samplings,
            });
        }
        Ok(())
    }
}

/// Constant-fraction timing scheme.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimingScheme {
    /// Fractions 0.15, 0.25 and 0.50 for channels and sum waveforms.
    #[default]
    ConstantFractions,
    /// Deprecated: one fraction for channels (`timeCF`) and one for sum
    /// waveforms (`timeCF_Sum`).
    SingleFraction { channel: f64, sum: f64 },
}

impl TimingScheme {
    /// Fractions used on single-channel waveforms.
    #[must_use]
    pub fn channel_fractions(&self) -> Vec<f64> {
        match self {
            Self::ConstantFractions => CANONICAL_FRACTIONS.to_vec(),
            Self::SingleFraction { channel, .. } => vec![*channel],
        }
    }

    /// Fractions used on sum waveforms, index-aligned with
    /// [`Self::channel_fractions`].
    #[must_use]
    pub fn sum_fractions(&self) -> Vec<f64> {
        match self {
            Self::ConstantFractions => CANONICAL_FRACTIONS.to_vec(),
            Self::SingleFraction { sum, .. } => vec![*sum],
        }
    }

    /// Returns true for the deprecated single-fraction scheme.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Self::SingleFraction { .. })
    }
}

/// How the neighborhood of a reference channel is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeighborScheme {
    /// Concentric rings on the sensor pitch grid (`nCircles_*`).
    #[default]
    Rings,
    /// Deprecated: the `k` nearest channels by Euclidean distance.
    Nearest(usize),
}

/// Configuration for the whole analysis.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisConfig {
    /// Trigger threshold on the amplitude (`trgLevel`, magnitude).
    pub trigger_level: f64,
    /// Baseline window (`lowBase`/`upBase`).
    pub baseline_window: BinWindow,
    /// Charge integration window (`lowInt`/`upInt`).
    pub integration_window: BinWindow,
    /// Amplitude search window; `None` searches the whole waveform.
    pub amplitude_window: Option<BinWindow>,
    /// Nominal zero-time bin where crossing searches start (`zeroTimeBin`).
    pub zero_time_bin: usize,
    /// Ring count for timing clusters (`nCircles_Time`).
    pub rings_time: usize,
    /// Ring count for position clusters (`nCircles_Position`).
    pub rings_position: usize,
    /// Constant-fraction timing scheme.
    pub timing: TimingScheme,
    /// Neighbor selection scheme.
    pub neighbors: NeighborScheme,
}

impl AnalysisConfig {
    /// Creates an all-zero configuration (the state before loading).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings used for the prototype test-beam data.
    #[must_use]
    pub fn prototype_defaults() -> Self {
        Self {
            trigger_level: 0.02,
            baseline_window: BinWindow::new(100, 300),
            integration_window: BinWindow::new(0, SAMPLINGS - 1),
            amplitude_window: None,
            zero_time_bin: 0,
            rings_time: 1,
            rings_position: 1,
            timing: TimingScheme::ConstantFractions,
            neighbors: NeighborScheme::Rings,
        }
    }

    /// Set trigger level. The sign is ignored: pulses are negative-going and
    /// the level is compared against the amplitude magnitude.
    #[must_use]
    pub fn with_trigger_level(mut self, level: f64) -> Self {
        self.trigger_level = level.abs();
        self
    }

    /// Set baseline window.
    #[must_use]
    pub fn with_baseline_window(mut self, low: usize, high: usize) -> Self {
        self.baseline_window = BinWindow::new(low, high);
        self
    }

    /// Set integration window.
    #[must_use]
    pub fn with_integration_window(mut self, low: usize, high: usize) -> Self {
        self.integration_window = BinWindow::new(low, high);
        self
    }

    /// Restrict the amplitude search to a window.
    #[must_use]
    pub fn with_amplitude_window(mut self, low: usize, high: usize) -> Self {
        self.amplitude_window = Some(BinWindow::new(low, high));
        self
    }

    /// Set the nominal zero-time bin.
    #[must_use]
    pub fn with_zero_time_bin(mut self, bin: usize) -> Self {
        self.zero_time_bin = bin;
        self
    }

    /// Set ring counts for timing and position clusters.
    #[must_use]
    pub fn with_rings(mut self, time: usize, position: usize) -> Self {
        self.rings_time = time;
        self.rings_position = position;
        self
    }

    /// Set timing scheme.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingScheme) -> Self {
        self.timing = timing;
        self
    }

    /// Set neighbor scheme.
    #[must_use]
    pub fn with_neighbors(mut self, neighbors: NeighborScheme) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Validates the configuration against full-length waveforms.
    ///
    /// # Errors
    /// Returns the first invalid window or fraction found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(SAMPLINGS)
    }

    /// Validates the configuration against waveforms of `samplings` bins.
    ///
    /// # Errors
    /// Returns the first invalid window or fraction found.
    pub fn validate_for(&self, samplings: usize) -> Result<(), ConfigError> {
        self.baseline_window.validate("baseline", samplings)?;
        self.integration_window.validate("integration", samplings)?;
        if let Some(window) = &self.amplitude_window {
            window.validate("amplitude", samplings)?;
        }
        if self.zero_time_bin >= samplings {
            return Err(ConfigError::WindowOutOfBounds {
                name: "zero time",
                low: self.zero_time_bin,
                high: self.zero_time_bin,
                samplings,
            });
        }
        for fraction in self
            .timing
            .channel_fractions()
            .into_iter()
            .chain(self.timing.sum_fractions())
        {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(ConfigError::InvalidFraction(fraction));
            }
        }
        Ok(())
    }

    /// Number of timing rows per face.
    #[must_use]
    pub fn fraction_count(&self) -> usize {
        self.timing.channel_fractions().len()
    }
}
