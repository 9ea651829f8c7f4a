//! lyso: command-line front end for the LYSO bar waveform analysis.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand, ValueEnum};

use lyso_algorithms::{EventAggregator, RadiusOrigin};
use lyso_core::{AnalysisConfig, ConfigError, EventWaveforms, GeometryTable};
use lyso_io::{EstimateWriter, EventReader, OutputFormat};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    LysoIo(#[from] lyso_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] lyso_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Origin for the face mean radius.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Origin {
    /// Max-amplitude channel
    Peak,
    /// Charge-weighted mean of the face
    ChargeMean,
}

impl From<Origin> for RadiusOrigin {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Peak => RadiusOrigin::PeakChannel,
            Origin::ChargeMean => RadiusOrigin::ChargeMean,
        }
    }
}

/// Waveform analysis for the two-sided LYSO calorimeter bar prototype.
#[derive(Parser)]
#[command(name = "lyso")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a JSON-lines event file
    Process {
        /// Input event file (JSON lines)
        input: PathBuf,

        /// Output file (.csv for a summary, anything else for JSON lines)
        #[arg(short, long)]
        output: PathBuf,

        /// Analysis configuration file (prototype defaults if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Geometry JSON file (prototype layout if omitted)
        #[arg(short, long)]
        geometry: Option<PathBuf>,

        /// Process events in parallel
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (rayon default if omitted)
        #[arg(long)]
        threads: Option<usize>,

        /// Origin for the mean radius
        #[arg(long, value_enum, default_value = "peak")]
        radius_origin: Origin,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the resolved and validated configuration
    Config {
        /// Configuration file
        file: PathBuf,

        /// Print as JSON instead of key = value
        #[arg(long)]
        json: bool,
    },

    /// Write the prototype geometry as JSON
    Geometry {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn resolve_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => lyso_io::load_config(path)?,
        None => {
            log::info!("no configuration file given, using prototype defaults");
            AnalysisConfig::prototype_defaults()
        }
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            geometry,
            parallel,
            threads,
            radius_origin,
            verbose,
        } => {
            init_logging(verbose);

            let config = resolve_config(config.as_deref())?;
            let geometry = match geometry {
                Some(path) => lyso_io::load_geometry(path)?,
                None => GeometryTable::prototype(),
            };
            let aggregator =
                EventAggregator::new(&config, &geometry)?.with_radius_origin(radius_origin.into());

            if verbose {
                eprintln!("Input: {}", input.display());
                eprintln!("Output: {}", output.display());
                eprintln!("Fractions per face: {}", config.fraction_count());
            }

            let start = Instant::now();
            let mut writer = OutputFormat::from_path(&output).create(&output)?;
            let reader = EventReader::open(&input)?;

            let count = if parallel {
                if let Some(threads) = threads {
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build_global()?;
                }
                let events = reader.collect::<lyso_io::Result<Vec<EventWaveforms>>>()?;
                let estimates = aggregator.process_all_parallel(&events);
                for estimate in &estimates {
                    writer.write_event(estimate)?;
                }
                estimates.len()
            } else {
                aggregator.process_stream(reader, |estimate| writer.write_event(&estimate))?
            };
            writer.finish()?;

            let elapsed = start.elapsed();
            println!("Processed {} events in {:.2}s", count, elapsed.as_secs_f64());
            println!("Output: {}", output.display());
        }

        Commands::Config { file, json } => {
            init_logging(false);
            let config = resolve_config(Some(file.as_path()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", lyso_io::format_config(&config));
            }
        }

        Commands::Geometry { output } => {
            init_logging(false);
            lyso_io::write_geometry(&output, &GeometryTable::prototype())?;
            println!("Wrote prototype geometry to {}", output.display());
        }
    }

    Ok(())
}
