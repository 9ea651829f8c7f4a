//! Writers for event estimates.

use crate::Result;
use lyso_core::{EventEstimate, FaceEstimate, TimingEstimates};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Destination for processed events.
pub trait EstimateWriter {
    /// Writes one event.
    fn write_event(&mut self, estimate: &EventEstimate) -> Result<()>;

    /// Flushes buffered output.
    fn finish(&mut self) -> Result<()>;
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One summary row per event, first fraction only.
    Csv,
    /// Full estimate per event as JSON lines.
    JsonLines,
}

impl OutputFormat {
    /// Picks the format from a file extension (`.csv`, anything else is
    /// JSON lines).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::JsonLines,
        }
    }

    /// Creates a writer of this format.
    pub fn create<P: AsRef<Path>>(self, path: P) -> Result<Box<dyn EstimateWriter>> {
        Ok(match self {
            Self::Csv => Box::new(CsvSummaryWriter::create(path)?),
            Self::JsonLines => Box::new(JsonLinesWriter::create(path)?),
        })
    }
}

const FACE_COLUMNS: [&str; 14] = [
    "peak_channel",
    "max_charge_channel",
    "x",
    "y",
    "sigma_x",
    "sigma_y",
    "n_cluster",
    "mean_radius",
    "fraction",
    "t_earliest",
    "t_peak",
    "t_cluster_mean",
    "t_cluster_weighted",
    "t_sum",
];

/// CSV summary, one row per event.
///
/// Columns: event, the three charges, the triggered channel count, then
/// the same block of face columns for the front (`F_`) and back (`B_`)
/// faces. Timing columns use the first configured fraction.
pub struct CsvSummaryWriter {
    writer: BufWriter<File>,
}

impl CsvSummaryWriter {
    /// Creates the file and writes the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        let mut header = vec![
            "event".to_string(),
            "charge_front".to_string(),
            "charge_back".to_string(),
            "charge_total".to_string(),
            "n_triggered".to_string(),
        ];
        for prefix in ["F", "B"] {
            header.extend(FACE_COLUMNS.iter().map(|c| format!("{prefix}_{c}")));
        }
        writeln!(writer, "{}", header.join(","))?;
        Ok(Self { writer })
    }

    fn face_fields(face: &FaceEstimate) -> Vec<String> {
        let timing = face
            .timing
            .first()
            .copied()
            .unwrap_or_else(|| TimingEstimates::unset(f64::NAN));
        let c = &face.centroid;
        let mut fields = vec![
            face.peak_channel.to_string(),
            face.max_charge_channel.to_string(),
            c.x.to_string(),
            c.y.to_string(),
            c.sigma_x.to_string(),
            c.sigma_y.to_string(),
            c.n_channels.to_string(),
            face.mean_radius.to_string(),
            timing.fraction.to_string(),
        ];
        fields.extend(timing.as_array().iter().map(ToString::to_string));
        fields
    }
}

impl EstimateWriter for CsvSummaryWriter {
    fn write_event(&mut self, estimate: &EventEstimate) -> Result<()> {
        let mut fields = vec![
            estimate.event_id.to_string(),
            estimate.charge_front.to_string(),
            estimate.charge_back.to_string(),
            estimate.charge_total.to_string(),
            estimate.triggered_channels().to_string(),
        ];
        fields.extend(Self::face_fields(&estimate.front_face));
        fields.extend(Self::face_fields(&estimate.back_face));
        writeln!(self.writer, "{}", fields.join(","))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Full estimates as JSON lines.
///
/// NaN values are written as `null`.
pub struct JsonLinesWriter {
    writer: BufWriter<File>,
}

impl JsonLinesWriter {
    /// Creates the file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl EstimateWriter for JsonLinesWriter {
    fn write_event(&mut self, estimate: &EventEstimate) -> Result<()> {
        serde_json::to_writer(&mut self.writer, estimate)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
