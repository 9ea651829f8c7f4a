//! Raw waveforms of one event.

use crate::error::EstimationError;
use crate::waveform::{Face, Waveform};
use crate::CHANNELS;

/// All channel waveforms of one event, indexed by channel on each face.
#[derive(Debug, Clone)]
pub struct EventWaveforms {
    /// Event identifier.
    pub event_id: u64,
    front: Vec<Waveform>,
    back: Vec<Waveform>,
}

impl EventWaveforms {
    /// Builds an event from already-constructed waveforms.
    ///
    /// # Errors
    /// Returns [`EstimationError::ChannelCount`] unless each face has
    /// exactly [`CHANNELS`] waveforms.
    pub fn new(
        event_id: u64,
        front: Vec<Waveform>,
        back: Vec<Waveform>,
    ) -> Result<Self, EstimationError> {
        for face in [&front, &back] {
            if face.len() != CHANNELS {
                return Err(EstimationError::ChannelCount {
                    expected: CHANNELS,
                    found: face.len(),
                });
            }
        }
        Ok(Self {
            event_id,
            front,
            back,
        })
    }

    /// Builds an event whose channels all share one time axis.
    ///
    /// # Errors
    /// Returns an error on a wrong channel count or if any channel's
    /// samples do not match the time axis length.
    pub fn with_shared_times(
        event_id: u64,
        times: &[f64],
        front: Vec<Vec<f64>>,
        back: Vec<Vec<f64>>,
    ) -> Result<Self, EstimationError> {
        let build = |face: Face, samples: Vec<Vec<f64>>| {
            samples
                .into_iter()
                .enumerate()
                .map(|(channel, s)| Waveform::from_channel(face, channel, times.to_vec(), s))
                .collect::<Result<Vec<_>, _>>()
        };
        Self::new(event_id, build(Face::Front, front)?, build(Face::Back, back)?)
    }

    /// Builds an event with a separate time axis per channel.
    ///
    /// # Errors
    /// Returns an error on a wrong channel count or mismatched lengths.
    pub fn with_channel_times(
        event_id: u64,
        front: Vec<(Vec<f64>, Vec<f64>)>,
        back: Vec<(Vec<f64>, Vec<f64>)>,
    ) -> Result<Self, EstimationError> {
        let build = |face: Face, pairs: Vec<(Vec<f64>, Vec<f64>)>| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(channel, (t, s))| Waveform::from_channel(face, channel, t, s))
                .collect::<Result<Vec<_>, _>>()
        };
        Self::new(event_id, build(Face::Front, front)?, build(Face::Back, back)?)
    }

    /// Waveforms of one face.
    #[must_use]
    pub fn face(&self, face: Face) -> &[Waveform] {
        match face {
            Face::Front => &self.front,
            Face::Back => &self.back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_times() {
        let times = vec![0.0, 1.0, 2.0];
        let front = vec![vec![0.0; 3]; CHANNELS];
        let back = vec![vec![1.0; 3]; CHANNELS];
        let event = EventWaveforms::with_shared_times(3, &times, front, back).unwrap();
        assert_eq!(event.event_id, 3);
        assert_eq!(event.face(Face::Front).len(), CHANNELS);
        assert_eq!(event.face(Face::Back)[10].samples(), &[1.0, 1.0, 1.0]);
        assert_eq!(event.face(Face::Back)[10].times(), times.as_slice());
    }

    #[test]
    fn test_wrong_channel_count() {
        let times = vec![0.0, 1.0];
        let err = EventWaveforms::with_shared_times(
            0,
            &times,
            vec![vec![0.0; 2]; CHANNELS - 1],
            vec![vec![0.0; 2]; CHANNELS],
        )
        .unwrap_err();
        assert_eq!(
            err,
            EstimationError::ChannelCount {
                expected: CHANNELS,
                found: CHANNELS - 1
            }
        );
    }

    #[test]
    fn test_unordered_time_axis_is_rejected() {
        let times = vec![0.0, 2.0, 1.0];
        let face = vec![vec![0.0; 3]; CHANNELS];
        let err = EventWaveforms::with_shared_times(0, &times, face.clone(), face).unwrap_err();
        assert_eq!(err, EstimationError::NonIncreasingTimes { bin: 2 });
    }

    #[test]
    fn test_mismatched_channel_samples() {
        let times = vec![0.0, 1.0];
        let mut front = vec![vec![0.0; 2]; CHANNELS];
        front[5] = vec![0.0; 3];
        let result = EventWaveforms::with_shared_times(0, &times, front, vec![vec![0.0; 2]; CHANNELS]);
        assert!(matches!(result, Err(EstimationError::LengthMismatch { .. })));
    }
}
