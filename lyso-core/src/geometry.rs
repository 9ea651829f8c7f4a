//! Photosensor geometry shared by both faces of the bar.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]

use crate::{Error, Result, CHANNELS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sensor pitch along x (mm).
pub const PITCH_X: f64 = 7.35;

/// Sensor pitch along y (mm).
pub const PITCH_Y: f64 = 6.85;

/// Channels per row of the prototype layout, top row first.
const ROW_WIDTHS: [usize; 11] = [7, 9, 11, 11, 13, 13, 13, 11, 11, 9, 7];

/// Position of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryEntry {
    /// Channel index.
    pub channel: usize,
    /// X position (mm).
    pub x: f64,
    /// Y position (mm).
    pub y: f64,
}

impl GeometryEntry {
    /// Creates a new geometry entry.
    #[inline]
    #[must_use]
    pub fn new(channel: usize, x: f64, y: f64) -> Self {
        Self { channel, x, y }
    }

    /// Squared Euclidean distance to a point.
    #[inline]
    #[must_use]
    pub fn distance_squared_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Immutable channel → (x, y) table.
///
/// Stored as parallel columns; indices are dense `0..CHANNELS`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Default for GeometryTable {
    fn default() -> Self {
        Self::prototype()
    }
}

impl GeometryTable {
    /// The prototype layout: 11 rows on the sensor pitch grid, centred on
    /// the bar axis, channels numbered row by row from the top-left.
    #[must_use]
    pub fn prototype() -> Self {
        let mut x = Vec::with_capacity(CHANNELS);
        let mut y = Vec::with_capacity(CHANNELS);
        let half_rows = (ROW_WIDTHS.len() / 2) as f64;

        for (row, &width) in ROW_WIDTHS.iter().enumerate() {
            let half_width = (width / 2) as f64;
            let row_y = (half_rows - row as f64) * PITCH_Y;
            for column in 0..width {
                x.push((column as f64 - half_width) * PITCH_X);
                y.push(row_y);
            }
        }

        Self { x, y }
    }

    /// Builds a table from explicit entries.
    ///
    /// # Errors
    /// Returns an error unless the entries cover every channel `0..CHANNELS`
    /// exactly once.
    pub fn from_entries(entries: &[GeometryEntry]) -> Result<Self> {
        if entries.len() != CHANNELS {
            return Err(Error::Geometry(format!(
                "expected {CHANNELS} channels, got {}",
                entries.len()
            )));
        }

        let mut x = vec![f64::NAN; CHANNELS];
        let mut y = vec![f64::NAN; CHANNELS];
        let mut seen = [false; CHANNELS];

        for entry in entries {
            if entry.channel >= CHANNELS {
                return Err(Error::Geometry(format!(
                    "channel index {} out of range",
                    entry.channel
                )));
            }
            if seen[entry.channel] {
                return Err(Error::Geometry(format!(
                    "channel {} listed twice",
                    entry.channel
                )));
            }
            if !entry.x.is_finite() || !entry.y.is_finite() {
                return Err(Error::Geometry(format!(
                    "channel {} has a non-finite position",
                    entry.channel
                )));
            }
            seen[entry.channel] = true;
            x[entry.channel] = entry.x;
            y[entry.channel] = entry.y;
        }

        Ok(Self { x, y })
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the table has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// X position of a channel.
    #[inline]
    #[must_use]
    pub fn x(&self, channel: usize) -> f64 {
        self.x[channel]
    }

    /// Y position of a channel.
    #[inline]
    #[must_use]
    pub fn y(&self, channel: usize) -> f64 {
        self.y[channel]
    }

    /// Entry for a channel.
    #[must_use]
    pub fn entry(&self, channel: usize) -> GeometryEntry {
        GeometryEntry::new(channel, self.x[channel], self.y[channel])
    }

    /// Iterates over all entries in channel order.
    pub fn iter(&self) -> impl Iterator<Item = GeometryEntry> + '_ {
        (0..self.len()).map(|channel| self.entry(channel))
    }

    /// Euclidean distance between two channels.
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.entry(a).distance_squared_to(self.x[b], self.y[b]).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prototype_is_dense() {
        let table = GeometryTable::prototype();
        assert_eq!(table.len(), CHANNELS);
        assert_eq!(ROW_WIDTHS.iter().sum::<usize>(), CHANNELS);
        for (i, entry) in table.iter().enumerate() {
            assert_eq!(entry.channel, i);
        }
    }

    #[test]
    fn test_prototype_is_centred() {
        let table = GeometryTable::prototype();
        let mean_x: f64 = table.iter().map(|e| e.x).sum::<f64>() / CHANNELS as f64;
        let mean_y: f64 = table.iter().map(|e| e.y).sum::<f64>() / CHANNELS as f64;
        assert_relative_eq!(mean_x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mean_y, 0.0, epsilon = 1e-9);

        // Top row: 7 channels at y = 5 * pitch_y.
        assert_relative_eq!(table.y(0), 5.0 * PITCH_Y);
        assert_relative_eq!(table.x(0), -3.0 * PITCH_X);
    }

    #[test]
    fn test_distance() {
        let table = GeometryTable::prototype();
        assert_relative_eq!(table.distance(0, 1), PITCH_X, epsilon = 1e-12);
        assert_relative_eq!(table.distance(3, 3), 0.0);
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let mut entries: Vec<GeometryEntry> = GeometryTable::prototype().iter().collect();
        entries[1].channel = 0;
        assert!(GeometryTable::from_entries(&entries).is_err());
    }

    #[test]
    fn test_from_entries_rejects_wrong_count() {
        let entries: Vec<GeometryEntry> = GeometryTable::prototype().iter().take(10).collect();
        assert!(GeometryTable::from_entries(&entries).is_err());
    }

    #[test]
    fn test_from_entries_roundtrip_order() {
        let mut entries: Vec<GeometryEntry> = GeometryTable::prototype().iter().collect();
        entries.reverse();
        let table = GeometryTable::from_entries(&entries).unwrap();
        assert_eq!(table, GeometryTable::prototype());
    }
}
