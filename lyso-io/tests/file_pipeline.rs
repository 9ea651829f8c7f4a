#![allow(clippy::cast_precision_loss)]

use lyso_algorithms::process_stream;
use lyso_core::{AnalysisConfig, ConfigError, CHANNELS, SAMPLINGS};
use lyso_io::{
    load_config, load_geometry, write_geometry, EstimateWriter, EventReader, EventRecord,
    JsonLinesWriter, OutputFormat,
};
use std::io::Write;
use tempfile::TempDir;

fn record(event: u64, depth: f64) -> EventRecord {
    let mut front = vec![vec![0.0; SAMPLINGS]; CHANNELS];
    for (i, sample) in front[57].iter_mut().enumerate().skip(401).take(16) {
        *sample = -depth * (i - 400) as f64 / 16.0;
    }
    EventRecord {
        event,
        time: Some((0..SAMPLINGS).map(|i| i as f64 * 0.2).collect()),
        back: front.clone(),
        front,
        front_times: None,
        back_times: None,
    }
}

#[test]
fn missing_config_file_fails_validation() {
    let dir = TempDir::new().unwrap();
    let config = load_config(dir.path().join("absent.cfg")).unwrap();
    assert_eq!(config, AnalysisConfig::default());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidWindow { .. })
    ));
}

#[test]
fn config_file_with_legacy_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("analysis.cfg");
    std::fs::write(
        &path,
        "trgLevel = 0.05\nlowBase = 10\nupBase = 90\nlowInt = 100\nupInt = 900\n\
         nNeighbors = 4\nunknownKey = 1\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.integration_window.high, 900);
    assert_eq!(config.neighbors, lyso_core::NeighborScheme::Nearest(4));
}

#[test]
fn events_flow_from_file_to_json_lines() {
    let dir = TempDir::new().unwrap();

    let geometry_path = dir.path().join("geometry.json");
    write_geometry(&geometry_path, &lyso_core::GeometryTable::prototype()).unwrap();
    let geometry = load_geometry(&geometry_path).unwrap();

    let input = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&input).unwrap();
    for (id, depth) in [(10, 1.0), (11, 0.5)] {
        writeln!(file, "{}", serde_json::to_string(&record(id, depth)).unwrap()).unwrap();
    }
    drop(file);

    let output = dir.path().join("estimates.jsonl");
    let mut writer = JsonLinesWriter::create(&output).unwrap();
    let config = AnalysisConfig::prototype_defaults();
    let count = process_stream(
        EventReader::open(&input).unwrap(),
        &config,
        &geometry,
        |estimate| writer.write_event(&estimate),
    )
    .unwrap();
    writer.finish().unwrap();
    assert_eq!(count, 2);

    let content = std::fs::read_to_string(&output).unwrap();
    let rows: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows[0]["event_id"], 10);
    assert_eq!(rows[1]["event_id"], 11);
    assert_eq!(rows[0]["front_face"]["peak_channel"], 57);
    assert!(rows[0]["charge_total"].as_f64().unwrap() > rows[1]["charge_total"].as_f64().unwrap());
}

#[test]
fn csv_format_is_chosen_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("summary.csv");
    let mut writer = OutputFormat::from_path(&path).create(&path).unwrap();
    writer.finish().unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("event,"));
}
