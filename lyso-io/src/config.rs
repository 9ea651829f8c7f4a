//! Flat `key = value` analysis configuration files.
//!
//! Recognised keys:
//!
//! | key                              | meaning                                  |
//! |----------------------------------|------------------------------------------|
//! | `trgLevel`                       | trigger level (sign ignored)             |
//! | `lowBase`, `upBase`              | baseline window                          |
//! | `lowInt`, `upInt`                | integration window                       |
//! | `lowAmp`, `upAmp`                | optional amplitude window                |
//! | `zeroTimeBin`                    | first bin of crossing searches           |
//! | `nCircles_Time`, `nCircles_Position` | ring counts                          |
//! | `timeCF`, `timeCF_Sum`           | deprecated single-fraction timing        |
//! | `nNeighbors`                     | deprecated k-nearest neighborhoods       |
//!
//! Blank lines, `#` comments and lines without `=` are skipped. Unknown keys
//! are logged and ignored.

use crate::Result;
use lyso_core::{
    AnalysisConfig, BinWindow, ConfigError, NeighborScheme, TimingScheme, SAMPLINGS,
};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Loads a configuration file.
///
/// A missing file is logged and yields the all-zero configuration, which
/// fails [`AnalysisConfig::validate`]. The result is not validated here.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            log::info!("loading configuration from {}", path.display());
            Ok(parse_config(&text)?)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::warn!(
                "configuration file {} not found, parameters left unset",
                path.display()
            );
            Ok(AnalysisConfig::default())
        }
        Err(err) => Err(err.into()),
    }
}

/// Parses configuration text.
///
/// # Errors
/// Returns [`ConfigError::InvalidValue`] for a value that does not parse
/// as the key's type.
pub fn parse_config(text: &str) -> std::result::Result<AnalysisConfig, ConfigError> {
    let mut config = AnalysisConfig::default();
    let mut low_amp: Option<usize> = None;
    let mut up_amp: Option<usize> = None;
    let mut time_cf: Option<f64> = None;
    let mut time_cf_sum: Option<f64> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "trgLevel" => config = config.with_trigger_level(parse_value(key, value)?),
            "lowBase" => config.baseline_window.low = parse_value(key, value)?,
            "upBase" => config.baseline_window.high = parse_value(key, value)?,
            "lowInt" => config.integration_window.low = parse_value(key, value)?,
            "upInt" => config.integration_window.high = parse_value(key, value)?,
            "lowAmp" => low_amp = Some(parse_value(key, value)?),
            "upAmp" => up_amp = Some(parse_value(key, value)?),
            "zeroTimeBin" => config.zero_time_bin = parse_value(key, value)?,
            "nCircles_Time" => config.rings_time = parse_value(key, value)?,
            "nCircles_Position" => config.rings_position = parse_value(key, value)?,
            "timeCF" => time_cf = Some(parse_value(key, value)?),
            "timeCF_Sum" => time_cf_sum = Some(parse_value(key, value)?),
            "nNeighbors" => config.neighbors = NeighborScheme::Nearest(parse_value(key, value)?),
            _ => log::warn!("unknown configuration parameter: {key}"),
        }
    }

    // A single amplitude edge extends to the waveform boundary.
    if low_amp.is_some() || up_amp.is_some() {
        config.amplitude_window = Some(BinWindow::new(
            low_amp.unwrap_or(0),
            up_amp.unwrap_or(SAMPLINGS - 1),
        ));
    }

    if let Some(channel) = time_cf.or(time_cf_sum) {
        config.timing = TimingScheme::SingleFraction {
            channel,
            sum: time_cf_sum.unwrap_or(channel),
        };
    }

    if config.timing.is_deprecated() {
        log::warn!("timeCF/timeCF_Sum select the deprecated single-fraction timing scheme");
    }
    if let NeighborScheme::Nearest(k) = config.neighbors {
        log::warn!("nNeighbors = {k} selects the deprecated k-nearest neighbor scheme");
    }

    Ok(config)
}

/// Renders a configuration in the file format read by [`parse_config`].
#[must_use]
pub fn format_config(config: &AnalysisConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "trgLevel = {}", config.trigger_level);
    let _ = writeln!(out, "lowBase = {}", config.baseline_window.low);
    let _ = writeln!(out, "upBase = {}", config.baseline_window.high);
    let _ = writeln!(out, "lowInt = {}", config.integration_window.low);
    let _ = writeln!(out, "upInt = {}", config.integration_window.high);
    if let Some(window) = config.amplitude_window {
        let _ = writeln!(out, "lowAmp = {}", window.low);
        let _ = writeln!(out, "upAmp = {}", window.high);
    }
    let _ = writeln!(out, "zeroTimeBin = {}", config.zero_time_bin);
    let _ = writeln!(out, "nCircles_Time = {}", config.rings_time);
    let _ = writeln!(out, "nCircles_Position = {}", config.rings_position);
    if let TimingScheme::SingleFraction { channel, sum } = config.timing {
        let _ = writeln!(out, "timeCF = {channel}");
        let _ = writeln!(out, "timeCF_Sum = {sum}");
    }
    if let NeighborScheme::Nearest(k) = config.neighbors {
        let _ = writeln!(out, "nNeighbors = {k}");
    }
    out
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> std::result::Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PROTOTYPE: &str = "\
# prototype settings
trgLevel = -0.02
lowBase = 100
upBase  = 300

lowInt = 0
upInt = 1023
nCircles_Time = 1
nCircles_Position = 1
";

    #[test]
    fn test_parse_known_keys() {
        let config = parse_config(PROTOTYPE).unwrap();
        assert_eq!(config, AnalysisConfig::prototype_defaults());
        assert_relative_eq!(config.trigger_level, 0.02);
    }

    #[test]
    fn test_skips_noise_lines() {
        let text = "  # comment\nno equals sign here\nmystery = 4\nlowBase=7\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.baseline_window.low, 7);
        assert_eq!(config.baseline_window.high, 0);
    }

    #[test]
    fn test_invalid_value() {
        let err = parse_config("upInt = many").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "upInt".to_string(),
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_legacy_keys() {
        let config = parse_config("timeCF = 0.3\nnNeighbors = 8\n").unwrap();
        assert_eq!(
            config.timing,
            TimingScheme::SingleFraction {
                channel: 0.3,
                sum: 0.3
            }
        );
        assert_eq!(config.neighbors, NeighborScheme::Nearest(8));

        let config = parse_config("timeCF = 0.3\ntimeCF_Sum = 0.2\n").unwrap();
        assert_eq!(
            config.timing,
            TimingScheme::SingleFraction {
                channel: 0.3,
                sum: 0.2
            }
        );
    }

    #[test]
    fn test_amplitude_window() {
        let config = parse_config("upAmp = 600").unwrap();
        assert_eq!(config.amplitude_window, Some(BinWindow::new(0, 600)));
        let config = parse_config("lowAmp = 300").unwrap();
        assert_eq!(config.amplitude_window, Some(BinWindow::new(300, SAMPLINGS - 1)));
    }

    #[test]
    fn test_format_round_trip() {
        let config = AnalysisConfig::prototype_defaults()
            .with_amplitude_window(200, 800)
            .with_zero_time_bin(150)
            .with_timing(TimingScheme::SingleFraction {
                channel: 0.2,
                sum: 0.4,
            })
            .with_neighbors(NeighborScheme::Nearest(6));
        assert_eq!(parse_config(&format_config(&config)).unwrap(), config);
    }
}
