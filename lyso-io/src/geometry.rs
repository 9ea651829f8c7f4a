//! Geometry tables stored as JSON.
//!
//! ```json
//! { "channels": [ { "channel": 0, "x": -22.05, "y": 34.25 }, ... ] }
//! ```

use crate::Result;
use lyso_core::{GeometryEntry, GeometryTable};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct GeometryFile {
    channels: Vec<GeometryEntry>,
}

/// Loads and validates a geometry file.
pub fn load_geometry<P: AsRef<Path>>(path: P) -> Result<GeometryTable> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let file: GeometryFile = serde_json::from_reader(reader)?;
    log::info!(
        "loaded geometry for {} channels from {}",
        file.channels.len(),
        path.display()
    );
    Ok(GeometryTable::from_entries(&file.channels)?)
}

/// Parses and validates geometry JSON.
pub fn parse_geometry(json: &str) -> Result<GeometryTable> {
    let file: GeometryFile = serde_json::from_str(json)?;
    Ok(GeometryTable::from_entries(&file.channels)?)
}

/// Writes a geometry table in the format read by [`load_geometry`].
pub fn write_geometry<P: AsRef<Path>>(path: P, geometry: &GeometryTable) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let file = GeometryFile {
        channels: geometry.iter().collect(),
    };
    serde_json::to_writer_pretty(&mut writer, &file)?;
    writer.flush()?;
    Ok(())
}
