//! lyso-io: file I/O for the LYSO bar analysis.
//!
//! This crate provides:
//! - `key = value` analysis configuration files
//! - JSON geometry tables
//! - a JSON-lines event source
//! - CSV and JSON-lines writers for event estimates
//!

pub mod config;
mod error;
pub mod geometry;
pub mod source;
mod writer;

pub use config::{format_config, load_config, parse_config};
pub use error::{Error, Result};
pub use geometry::{load_geometry, parse_geometry, write_geometry};
pub use source::{EventReader, EventRecord};
pub use writer::{CsvSummaryWriter, EstimateWriter, JsonLinesWriter, OutputFormat};
