//! JSON-lines event source.
//!
//! One event per line. Channels either share one time axis (`time`) or
//! carry their own (`front_times` and `back_times`):
//!
//! ```json
//! {"event": 1, "time": [..], "front": [[..], ...], "back": [[..], ...]}
//! ```

use crate::{Error, Result};
use lyso_core::EventWaveforms;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One event as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub event: u64,
    /// Time axis shared by every channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Vec<f64>>,
    /// Front samples, one row per channel.
    pub front: Vec<Vec<f64>>,
    /// Back samples, one row per channel.
    pub back: Vec<Vec<f64>>,
    /// Per-channel front time axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_times: Option<Vec<Vec<f64>>>,
    /// Per-channel back time axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_times: Option<Vec<Vec<f64>>>,
}

impl EventRecord {
    /// Converts the record into validated waveforms.
    pub fn into_waveforms(self) -> Result<EventWaveforms> {
        if let Some(time) = self.time {
            return Ok(EventWaveforms::with_shared_times(
                self.event, &time, self.front, self.back,
            )?);
        }

        let (Some(front_times), Some(back_times)) = (self.front_times, self.back_times) else {
            return Err(Error::InvalidFormat(format!(
                "event {} has neither a shared time axis nor per-channel times",
                self.event
            )));
        };
        if front_times.len() != self.front.len() || back_times.len() != self.back.len() {
            return Err(Error::InvalidFormat(format!(
                "event {}: time axes do not match channel count",
                self.event
            )));
        }

        Ok(EventWaveforms::with_channel_times(
            self.event,
            front_times.into_iter().zip(self.front).collect(),
            back_times.into_iter().zip(self.back).collect(),
        )?)
    }
}

/// Reads [`EventWaveforms`] from a JSON-lines stream.
///
/// Blank lines are skipped. Each item is one event or the error for its
/// line; iteration may continue after an error.
pub struct EventReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl EventReader<BufReader<File>> {
    /// Opens a JSON-lines file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps a buffered reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<EventWaveforms> {
        let record: EventRecord = serde_json::from_str(line).map_err(|err| {
            Error::InvalidFormat(format!("line {}: {err}", self.line_no))
        })?;
        record.into_waveforms()
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventWaveforms>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}
