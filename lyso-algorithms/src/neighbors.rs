//! Neighbor search on the photosensor grid.
#![allow(clippy::cast_precision_loss)]

use lyso_core::{GeometryTable, NeighborScheme, PITCH_X, PITCH_Y};

/// Tolerance (mm) added to ring boundaries so channels sitting exactly on
/// a boundary are not lost to rounding.
pub const RING_TOLERANCE: f64 = 1e-3;

/// Finds channels around a reference channel.
#[derive(Debug, Clone, Copy)]
pub struct NeighborFinder<'a> {
    geometry: &'a GeometryTable,
}

impl<'a> NeighborFinder<'a> {
    /// Creates a finder over a geometry table.
    #[must_use]
    pub fn new(geometry: &'a GeometryTable) -> Self {
        Self { geometry }
    }

    /// Neighborhood of `reference` under `scheme`, where `rings` is the ring
    /// count used by [`NeighborScheme::Rings`].
    ///
    /// Returns sorted channel indices including the reference itself.
    #[must_use]
    pub fn find(&self, reference: usize, scheme: NeighborScheme, rings: usize) -> Vec<usize> {
        match scheme {
            NeighborScheme::Rings => self.rings(reference, rings),
            NeighborScheme::Nearest(k) => self.nearest(reference, k),
        }
    }

    /// Every channel within `rings` sensor pitches of `reference` along
    /// both axes.
    #[must_use]
    pub fn rings(&self, reference: usize, rings: usize) -> Vec<usize> {
        let x0 = self.geometry.x(reference);
        let y0 = self.geometry.y(reference);
        let reach_x = rings as f64 * PITCH_X + RING_TOLERANCE;
        let reach_y = rings as f64 * PITCH_Y + RING_TOLERANCE;

        self.geometry
            .iter()
            .filter(|e| {
                e.channel == reference
                    || ((e.x - x0).abs() < reach_x && (e.y - y0).abs() < reach_y)
            })
            .map(|e| e.channel)
            .collect()
    }

    /// The reference plus its `k` nearest channels (stable: ties keep
    /// channel order).
    #[must_use]
    pub fn nearest(&self, reference: usize, k: usize) -> Vec<usize> {
        let x0 = self.geometry.x(reference);
        let y0 = self.geometry.y(reference);
        let mut channels = self.sorted_by_distance(x0, y0);

        // The reference is at distance zero; keep it first even if another
        // channel shares its position.
        if let Some(pos) = channels.iter().position(|&c| c == reference) {
            channels.remove(pos);
        }
        channels.insert(0, reference);
        channels.truncate(k + 1);
        channels.sort_unstable();
        channels
    }

    /// The `k` channels closest to an arbitrary point, sorted by index.
    ///
    /// `k` below 1 is raised to 1.
    #[must_use]
    pub fn nearest_to_point(&self, x: f64, y: f64, k: usize) -> Vec<usize> {
        let k = if k < 1 {
            log::warn!("invalid neighbor count 0, using 1");
            1
        } else {
            k
        };
        let mut channels = self.sorted_by_distance(x, y);
        channels.truncate(k);
        channels.sort_unstable();
        channels
    }

    fn sorted_by_distance(&self, x: f64, y: f64) -> Vec<usize> {
        let distances: Vec<f64> = self
            .geometry
            .iter()
            .map(|e| e.distance_squared_to(x, y))
            .collect();
        let mut channels: Vec<usize> = (0..self.geometry.len()).collect();
        channels.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyso_core::CHANNELS;

    // Row 5 (widths 7, 9, 11, 11, 13) starts at channel 51; its middle
    // channel 57 sits at the origin.
    const CENTRE: usize = 57;

    #[test]
    fn test_zero_rings_is_reference_only() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        for reference in [0, CENTRE, CHANNELS - 1] {
            assert_eq!(finder.rings(reference, 0), vec![reference]);
        }
    }

    #[test]
    fn test_one_ring_in_the_middle() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        assert!(geometry.x(CENTRE).abs() < 1e-12);
        assert!(geometry.y(CENTRE).abs() < 1e-12);

        let ring = finder.rings(CENTRE, 1);
        // 3x3 block: rows 4, 5 and 6 are all 13 wide and aligned.
        assert_eq!(ring, vec![43, 44, 45, 56, 57, 58, 69, 70, 71]);
    }

    #[test]
    fn test_one_ring_in_a_corner() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        // Channel 0 is the left end of the top row; row 1 is one pitch wider
        // on each side.
        let ring = finder.rings(0, 1);
        assert_eq!(ring, vec![0, 1, 7, 8, 9]);
    }

    #[test]
    fn test_rings_are_sorted_and_grow() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        let mut previous = 0;
        for rings in 0..6 {
            let found = finder.rings(CENTRE, rings);
            assert!(found.windows(2).all(|w| w[0] < w[1]));
            assert!(found.contains(&CENTRE));
            assert!(found.len() > previous);
            previous = found.len();
        }
        assert_eq!(finder.rings(CENTRE, 10).len(), CHANNELS);
    }

    #[test]
    fn test_nearest_zero_is_reference_only() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        assert_eq!(finder.nearest(CENTRE, 0), vec![CENTRE]);
        assert_eq!(finder.find(12, NeighborScheme::Nearest(0), 3), vec![12]);
    }

    #[test]
    fn test_nearest_four() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        // Pitch y < pitch x: the two vertical neighbors come first, then the
        // two horizontal ones.
        assert_eq!(finder.nearest(CENTRE, 2), vec![44, 57, 70]);
        assert_eq!(finder.nearest(CENTRE, 4), vec![44, 56, 57, 58, 70]);
    }

    #[test]
    fn test_nearest_to_point() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        assert_eq!(finder.nearest_to_point(0.0, 0.0, 1), vec![CENTRE]);
        assert_eq!(finder.nearest_to_point(0.0, 0.0, 0), vec![CENTRE]);
        assert_eq!(finder.nearest_to_point(0.1, 0.0, 3), vec![44, 57, 70]);
    }

    #[test]
    fn test_find_dispatches_on_scheme() {
        let geometry = GeometryTable::prototype();
        let finder = NeighborFinder::new(&geometry);
        assert_eq!(
            finder.find(CENTRE, NeighborScheme::Rings, 1),
            finder.rings(CENTRE, 1)
        );
    }
}
